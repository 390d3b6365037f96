//! Judge reporting: decide whether to report, then post the result out of band.
//!
//! Best-effort. The send runs on a detached task after the reply is built; failures are
//! logged and never reach the caller. No retry.

use crate::config::ReportConfig;
use crate::intel::Intelligence;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("collector rejected report: {0}")]
    Rejected(String),
}

/// Final-result payload for the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeReport {
    pub session_id: String,
    pub scam_detected: bool,
    pub total_messages_exchanged: usize,
    pub extracted_intelligence: Intelligence,
    pub agent_notes: String,
}

impl JudgeReport {
    pub fn new(
        session_id: impl Into<String>,
        total_messages_exchanged: usize,
        extracted_intelligence: Intelligence,
        agent_notes: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            scam_detected: true,
            total_messages_exchanged,
            extracted_intelligence,
            agent_notes: agent_notes.into(),
        }
    }
}

/// Where reports go.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn send(&self, report: &JudgeReport) -> Result<(), ReportError>;
}

/// Report when anything was extracted, or once the conversation is longer than `threshold`.
pub fn should_report(intel: &Intelligence, total_messages: usize, threshold: usize) -> bool {
    !intel.is_empty() || total_messages > threshold
}

/// Spawn the send on its own task. The returned handle may be dropped.
pub fn schedule(reporter: Arc<dyn Reporter>, report: JudgeReport) -> JoinHandle<()> {
    tokio::spawn(async move {
        match reporter.send(&report).await {
            Ok(()) => log::info!("report sent for session {}", report.session_id),
            Err(e) => log::warn!("report failed for session {}: {}", report.session_id, e),
        }
    })
}

/// Posts reports as JSON to a fixed collector URL.
#[derive(Clone)]
pub struct JudgeClient {
    url: String,
    client: reqwest::Client,
}

impl JudgeClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn from_config(config: &ReportConfig) -> Result<Self, ReportError> {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_secs.max(1)))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Reporter for JudgeClient {
    async fn send(&self, report: &JudgeReport) -> Result<(), ReportError> {
        let res = self.client.post(&self.url).json(report).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ReportError::Rejected(format!("{} {}", status, body)));
        }
        Ok(())
    }
}
