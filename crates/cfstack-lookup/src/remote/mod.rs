//! Access to the remote stack API
//!
//! [StackApi] is the seam between lookups and CloudFormation. The production implementation is
//! [CloudFormationApi] (feature `aws`), tests provide their own.
#[cfg(feature = "aws")]
mod cloudformation;

#[cfg(feature = "aws")]
pub use cloudformation::{AwsSettings, CloudFormationApi};

use serde::{Deserialize, Serialize};

/// A single exported stack output
///
/// Plain projection of the SDK record so it can be cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct StackOutput {
    pub description: Option<String>,
    pub key: String,
    pub value: String,
}

/// Remote calls needed to answer lookups
///
/// Calls block until the remote answered or failed. A stack or resource that does not exist
/// must be reported as [RemoteError::NotFound].
pub trait StackApi: Send + Sync {
    fn stack_outputs(&self, stack: &str) -> Result<Vec<StackOutput>, RemoteError>;

    /// Raw metadata attached to a resource, `None` if the resource has no metadata
    fn resource_metadata(&self, stack: &str, resource: &str)
        -> Result<Option<String>, RemoteError>;
}

#[derive(thiserror::Error, Debug)]
pub enum RemoteError {
    #[error("Stack or resource does not exist: {0}")]
    NotFound(String),
    #[error("Remote API request failed: {message}")]
    Request {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RemoteError {
    pub fn request(message: impl Into<String>) -> Self {
        RemoteError::Request {
            message: message.into(),
            source: None,
        }
    }
}
