//! Error types for the host runtime

use thiserror::Error;

use crate::host::AppId;

/// Failures on the cross-frame messaging path.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The target origin is not in the sender's allow-list.
    #[error("origin '{0}' is not allowed")]
    OriginDenied(String),

    /// The peer endpoint is gone.
    #[error("frame channel closed")]
    ChannelClosed,

    /// A known envelope type carried a payload that does not decode.
    #[error("envelope codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Failures while loading a remote application module.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no remote module registered for '{0}'")]
    NotRegistered(AppId),

    #[error("remote module '{app}' did not load within {timeout_ms} ms")]
    Timeout { app: AppId, timeout_ms: u64 },

    #[error("remote module '{app}' failed to load: {reason}")]
    Failed { app: AppId, reason: String },
}

/// Top-level failures surfaced by the host.
#[derive(Debug, Error)]
pub enum HostError {
    /// `window.open` returned no handle; the close poller must not start.
    #[error("popup blocked while opening '{0}'")]
    PopupBlocked(AppId),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error("no open session for '{0}'")]
    SessionNotFound(AppId),
}
