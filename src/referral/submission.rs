//! Submission seam between a complete referral draft and whatever persists it

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::form::ReferralDraft;

/// Receives complete drafts, enabling mocking in tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionSink: Send {
    /// Persist or forward the draft, returning the identifier it was stored under
    async fn submit(&mut self, draft: &ReferralDraft) -> Result<String>;
}

/// Writes each draft as one line of JSON
#[derive(Debug)]
pub struct JsonSink<W> {
    writer: W,
}

impl<W> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> SubmissionSink for JsonSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn submit(&mut self, draft: &ReferralDraft) -> Result<String> {
        let mut line = serde_json::to_vec(draft)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(draft.id.to_string())
    }
}
