use async_trait::async_trait;

use crate::error::Result;
use crate::types::Collection;

/// Authoritative store for the full collection.
///
/// Implementations map transport failures to [`crate::SyncError::Transport`],
/// non-success answers to [`crate::SyncError::Status`] and unparsable bodies
/// to [`crate::SyncError::MalformedPayload`]. A push the authority answers
/// with `success: false` is [`crate::SyncError::Rejected`].
#[async_trait]
pub trait RemoteCollectionService: Send + Sync {
    async fn fetch(&self) -> Result<Collection>;

    /// Replace the remote collection with `collection`.
    async fn push(&self, collection: &Collection) -> Result<()>;

    /// Short label used in log lines.
    fn describe(&self) -> String {
        "remote".to_string()
    }
}
