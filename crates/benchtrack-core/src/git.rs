//! Commit metadata capture from a local git checkout.

use std::path::Path;
use std::process::Command;

use crate::domain::{BenchError, Commit, Identity, Result};

/// Field layout requested from `git log`, NUL-separated; the message comes
/// last because it may contain anything but NUL.
const FORMAT: &str = "--format=%H%x00%T%x00%an%x00%ae%x00%cn%x00%ce%x00%cI%x00%B";

/// Build a [`Commit`] for `HEAD` of the repository at `repo_dir`.
///
/// `url` is `<repo_url>/commit/<id>`, or empty when `repo_url` is empty.
pub fn capture_commit(repo_dir: &Path, repo_url: &str) -> Result<Commit> {
    let output = Command::new("git")
        .args(["log", "-1", FORMAT])
        .current_dir(repo_dir)
        .output()
        .map_err(|e| BenchError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BenchError::Git(format!("git log -1 failed: {}", stderr.trim())));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let fields: Vec<&str> = stdout.splitn(8, '\0').collect();
    let &[id, tree_id, author_name, author_email, committer_name, committer_email, timestamp, message] =
        fields.as_slice()
    else {
        return Err(BenchError::Git(format!(
            "unexpected git log output: {}",
            stdout.trim()
        )));
    };

    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(BenchError::Git("git log returned an empty commit id".to_string()));
    }
    let repo_url = repo_url.trim_end_matches('/');
    let url = if repo_url.is_empty() {
        String::new()
    } else {
        format!("{repo_url}/commit/{id}")
    };

    Ok(Commit {
        author: Identity::new(author_name, author_email),
        committer: Identity::new(committer_name, committer_email),
        distinct: true,
        id,
        message: message.trim_end().to_string(),
        timestamp: timestamp.to_string(),
        tree_id: tree_id.to_string(),
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn run_git(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(
            dir.path(),
            &["commit", "--allow-empty", "-m", "speed up parser", "-m", "second paragraph"],
        );
        dir
    }

    #[test]
    fn capture_commit_reads_head() {
        let repo = make_git_repo();
        let commit = capture_commit(repo.path(), "https://github.com/acme/widget/").unwrap();

        assert_eq!(commit.id.len(), 40);
        assert!(commit.id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(commit.tree_id.len(), 40);
        assert_eq!(commit.author, Identity::new("test-user", "test@example.com"));
        assert_eq!(commit.committer, commit.author);
        assert_eq!(commit.message, "speed up parser\n\nsecond paragraph");
        assert!(commit.timestamp_parsed().is_some());
        assert!(commit.distinct);
        assert_eq!(
            commit.url,
            format!("https://github.com/acme/widget/commit/{}", commit.id)
        );
    }

    #[test]
    fn empty_repo_url_leaves_url_empty() {
        let repo = make_git_repo();
        let commit = capture_commit(repo.path(), "").unwrap();
        assert!(commit.url.is_empty());
    }

    #[test]
    fn capture_commit_fails_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            capture_commit(dir.path(), "r"),
            Err(BenchError::Git(_))
        ));
    }
}
