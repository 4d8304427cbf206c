use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Verdict
///
/// Outcome of screening one image for the food platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected { reason: String },
}

/// ImageModerator
///
/// Screens uploaded images before they are stored. An `Err` means the classifier
/// could not be consulted; the upload handler logs it and stores the image anyway.
#[async_trait]
pub trait ImageModerator: Send + Sync {
    async fn review(&self, bytes: &[u8], content_type: &str) -> Result<Verdict, BoxError>;
}

pub type ModeratorState = Arc<dyn ImageModerator>;

/// Approves everything. Used when no classifier endpoint is configured.
#[derive(Debug, Clone, Default)]
pub struct AllowAllModerator;

#[async_trait]
impl ImageModerator for AllowAllModerator {
    async fn review(&self, _bytes: &[u8], _content_type: &str) -> Result<Verdict, BoxError> {
        Ok(Verdict::Approved)
    }
}

#[derive(Debug, Deserialize)]
struct ModerationReply {
    approved: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// HttpModerator
///
/// Posts the raw image to an external classifier and expects
/// `{"approved": bool, "reason": string?}` back.
#[derive(Clone)]
pub struct HttpModerator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpModerator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ImageModerator for HttpModerator {
    async fn review(&self, bytes: &[u8], content_type: &str) -> Result<Verdict, BoxError> {
        let reply: ModerationReply = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if reply.approved {
            Ok(Verdict::Approved)
        } else {
            Ok(Verdict::Rejected {
                reason: reply
                    .reason
                    .unwrap_or_else(|| "Image is not suitable for a food platform".to_string()),
            })
        }
    }
}

/// MockModerator
///
/// Test double returning a fixed verdict, or failing when `verdict` is `None`.
#[derive(Debug, Clone)]
pub struct MockModerator {
    pub verdict: Option<Verdict>,
}

impl MockModerator {
    pub fn approving() -> Self {
        Self {
            verdict: Some(Verdict::Approved),
        }
    }

    pub fn rejecting(reason: &str) -> Self {
        Self {
            verdict: Some(Verdict::Rejected {
                reason: reason.to_string(),
            }),
        }
    }

    pub fn unavailable() -> Self {
        Self { verdict: None }
    }
}

#[async_trait]
impl ImageModerator for MockModerator {
    async fn review(&self, _bytes: &[u8], _content_type: &str) -> Result<Verdict, BoxError> {
        self.verdict
            .clone()
            .ok_or_else(|| "Mock Moderation Error: classifier unavailable".into())
    }
}
