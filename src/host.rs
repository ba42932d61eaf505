//! Host application context
//!
//! Composes the event bus, notification center, remote registry, frame
//! messengers and close pollers into one explicitly constructed context.
//! Nothing here is global; tests build as many hosts as they need.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};

use crate::bus::{EventBus, Subscription};
use crate::config::HostConfig;
use crate::error::HostError;
use crate::messenger::{frame_channel, EmbeddedEndpoint, HostMessenger, LogEntry};
use crate::notifications::{AppStatus, NotificationCenter};
use crate::origin::OriginPolicy;
use crate::poller::{ClosePoller, WindowHandle, WindowOpener};
use crate::remote::RemoteRegistry;

/// The applications this host knows how to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppId {
    Chat,
    Email,
}

impl AppId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppId::Chat => "chat",
            AppId::Email => "email",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AppId::Chat => "Chat",
            AppId::Email => "Email",
        }
    }

    /// Bus event emitted when this app opens. Internal contract between
    /// host components, not a wire format.
    pub fn opened_event(&self) -> String {
        format!("{}:opened", self.as_str())
    }

    /// Bus event emitted when this app closes.
    pub fn closed_event(&self) -> String {
        format!("{}:closed", self.as_str())
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level application context owning the messaging runtime.
pub struct Host {
    bus: Arc<EventBus>,
    notifications: Arc<NotificationCenter>,
    registry: RemoteRegistry,
    config: HostConfig,
    sessions: HashMap<AppId, HostMessenger>,
    pollers: Vec<ClosePoller>,
    _subscriptions: Vec<Subscription>,
}

impl Host {
    pub fn new(config: HostConfig) -> Self {
        let bus = Arc::new(EventBus::new());
        let notifications = Arc::new(NotificationCenter::new(config.notification_ttl_ms));
        let subscriptions = notifications.attach(&bus);

        Self {
            bus,
            notifications,
            registry: RemoteRegistry::new(),
            config,
            sessions: HashMap::new(),
            pollers: Vec::new(),
            _subscriptions: subscriptions,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn notifications(&self) -> &Arc<NotificationCenter> {
        &self.notifications
    }

    pub fn registry(&self) -> &RemoteRegistry {
        &self.registry
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Open an application embedded in the host.
    ///
    /// Loads the remote module (bounded by the configured timeout), builds
    /// the frame channel, starts the handshake and emits `<app>:opened`.
    /// Returns the embedded side of the channel; in the demo the caller
    /// drives it in place of a real remote bundle.
    ///
    /// A load failure degrades gracefully: the user sees an error
    /// notification and the host keeps running.
    pub async fn open_embedded(&mut self, app: AppId) -> Result<EmbeddedEndpoint, HostError> {
        let timeout = Duration::from_millis(self.config.load_timeout_ms);
        let module = match self.registry.load(app, timeout).await {
            Ok(module) => module,
            Err(e) => {
                log::error!("failed to load {} module: {}", app, e);
                self.report_error(format!("Failed to load {} application", app.title()));
                return Err(e.into());
            }
        };
        log::info!("loaded remote module '{}' for {}", module.entry, app);

        let host_policy = OriginPolicy::allow_list(self.config.allowed_origins.clone());
        let app_policy = OriginPolicy::allow_list([self.config.host_origin.clone()]);
        let (host_ep, app_ep) = frame_channel(
            self.config.host_origin.clone(),
            self.config.app_url(app).to_string(),
            host_policy,
            app_policy,
        );

        let messenger = HostMessenger::new(
            host_ep,
            app,
            self.config.host_app.clone(),
            self.config.message_log_cap,
        );
        let embed = EmbeddedEndpoint::new(app_ep, app.as_str());

        // The embed just finished loading, so the handshake fires now.
        messenger.connect()?;
        self.sessions.insert(app, messenger);
        self.bus.emit(&app.opened_event(), Value::Null);

        Ok(embed)
    }

    /// Close an embedded application and emit `<app>:closed`.
    pub fn close_embedded(&mut self, app: AppId) -> Result<(), HostError> {
        self.sessions
            .remove(&app)
            .ok_or(HostError::SessionNotFound(app))?;
        self.bus.emit(&app.closed_event(), Value::Null);
        Ok(())
    }

    /// Open an application in a separate window and start the close poller.
    ///
    /// A blocked popup (no handle) is an explicit failure with an error
    /// notification; nothing is emitted and no poller starts.
    pub fn open_window<W, O>(&mut self, app: AppId, opener: &O) -> Result<(), HostError>
    where
        W: WindowHandle,
        O: WindowOpener<W>,
    {
        let handle = opener.open(app, self.config.app_url(app));
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let poller = match ClosePoller::spawn(Arc::clone(&self.bus), app, handle, interval) {
            Ok(poller) => poller,
            Err(e) => {
                log::warn!("could not open {} window: {}", app, e);
                self.report_error(format!("Popup blocked while opening {}", app.title()));
                return Err(e);
            }
        };

        self.bus.emit(&app.opened_event(), Value::Null);
        self.pollers.push(poller);
        Ok(())
    }

    /// One tick of housekeeping: drain messenger inboxes, drop finished
    /// pollers and sweep expired notifications.
    pub fn pump(&mut self) {
        for messenger in self.sessions.values_mut() {
            messenger.pump();
        }
        self.pollers.retain(|p| !p.is_finished());
        self.notifications.expire_due(Utc::now());
    }

    pub fn session(&self, app: AppId) -> Option<&HostMessenger> {
        self.sessions.get(&app)
    }

    /// Communication log for one open session, oldest entry first.
    pub fn message_log(&self, app: AppId) -> Vec<LogEntry> {
        self.sessions
            .get(&app)
            .map(|s| s.message_log().cloned().collect())
            .unwrap_or_default()
    }

    pub fn status(&self, app: AppId) -> AppStatus {
        self.notifications.status(app)
    }

    fn report_error(&self, message: String) {
        self.bus
            .emit("notification", json!({ "message": message, "type": "error" }));
    }
}
