//! Top-level error type for a single invocation.
//!
//! Each pipeline stage defines its own error enum next to its
//! implementation; [`HandlerError`] aggregates them transparently so the
//! invoking framework observes the original stage fault, not a wrapper.

use crate::config::ConfigError;
use crate::db::DatabaseError;
use crate::secrets::SecretError;
use crate::ssm::DispatchError;

/// Boxed error used to preserve a collaborator's original fault as a
/// `source` without naming its concrete SDK type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Any fault that aborts the invocation.
///
/// The invocation is all-or-nothing: there is no local recovery and no
/// retryable/fatal classification. Every variant is `transparent` so
/// `Display` and `source()` pass straight through to the stage error.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
