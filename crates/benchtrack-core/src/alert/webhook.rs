use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{AlertContext, AlertEmitter, AlertError};
use crate::detect::RegressionReport;

const USER_AGENT: &str = concat!("benchtrack/", env!("CARGO_PKG_VERSION"));

/// JSON body posted to the webhook.
#[derive(Debug, Serialize)]
pub struct AlertPayload<'a> {
    pub repo_url: &'a str,
    pub suite: &'a str,
    pub commit: &'a str,
    pub commit_url: &'a str,
    pub threshold: f64,
    pub findings: &'a [RegressionReport],
}

impl<'a> AlertPayload<'a> {
    pub fn new(context: &'a AlertContext, findings: &'a [RegressionReport]) -> Self {
        Self {
            repo_url: &context.repo_url,
            suite: &context.suite,
            commit: &context.commit.id,
            commit_url: &context.commit.url,
            threshold: context.threshold,
            findings,
        }
    }
}

/// POSTs findings as JSON to an HTTP endpoint (chat hook, alert router).
#[derive(Debug, Clone)]
pub struct WebhookAlertEmitter {
    url: String,
    client: reqwest::Client,
}

impl WebhookAlertEmitter {
    pub fn new(url: impl Into<String>) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AlertEmitter for WebhookAlertEmitter {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn report(
        &self,
        context: &AlertContext,
        findings: &[RegressionReport],
    ) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.url)
            .json(&AlertPayload::new(context, findings))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::Rejected {
                status: status.as_u16(),
            });
        }
        tracing::debug!(url = %self.url, findings = findings.len(), "webhook alert delivered");
        Ok(())
    }
}
