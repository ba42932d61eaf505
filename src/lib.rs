//! hostbus - Host/embedded application messaging runtime
//!
//! Cross-application glue for a host that opens independently deployed
//! applications: an in-process publish/subscribe [`EventBus`], a typed
//! cross-frame [`Envelope`] channel with origin validation, a window-close
//! [`ClosePoller`] and a transient [`NotificationCenter`].

pub mod bus;
pub mod config;
pub mod envelope;
pub mod error;
pub mod host;
pub mod messenger;
pub mod notifications;
pub mod origin;
pub mod poller;
pub mod remote;

// 公開API
pub use bus::{EventBus, Subscription};
pub use config::HostConfig;
pub use envelope::{Envelope, WireEnvelope};
pub use error::{HostError, LoadError, MessagingError};
pub use host::{AppId, Host};
pub use messenger::{frame_channel, EmbeddedEndpoint, HostMessenger, LogEntry};
pub use notifications::{AppStatus, Notification, NotificationCenter, Severity};
pub use origin::OriginPolicy;
pub use poller::{ClosePoller, WindowHandle, WindowOpener};
pub use remote::{RemoteLoader, RemoteModule, RemoteRegistry, StaticRemote};
