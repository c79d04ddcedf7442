#![allow(dead_code)]

use benchtrack_core::{BenchResult, Commit, Entry, Identity};

pub const REPO: &str = "https://github.com/acme/widget";

pub fn commit(id: &str) -> Commit {
    Commit {
        author: Identity::new("Jane Doe", "jane@example.com").with_username("jdoe"),
        committer: Identity::new("GitHub", "noreply@github.com").with_username("web-flow"),
        distinct: true,
        id: id.to_string(),
        message: format!("change {id}"),
        timestamp: "2024-03-01T10:00:00+01:00".to_string(),
        tree_id: format!("tree-{id}"),
        url: format!("{REPO}/commit/{id}"),
    }
}

pub fn entry(id: &str, date: i64, tool: &str, benches: Vec<BenchResult>) -> Entry {
    Entry {
        commit: commit(id),
        date,
        tool: tool.to_string(),
        benches,
    }
}

pub fn bench(name: &str, value: f64, unit: &str) -> BenchResult {
    BenchResult::new(name, value, unit)
}
