//! Collaborator traits.
//!
//! The scheduler only ever sees `PostClient` — it has no idea whether the
//! other side is the real platform API or a test stub.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the platform hands back for an accepted post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostReceipt {
    /// Platform-assigned post id.
    pub id: String,
    /// Public URL of the published post.
    pub url: String,
}

/// Submits a finished post body to the platform's write API.
#[async_trait]
pub trait PostClient: Send + Sync {
    /// Publish `text`. Any failure carries a human-readable message and,
    /// when the platform provided one, its error code.
    async fn submit_post(&self, text: &str) -> Result<PostReceipt>;
}
