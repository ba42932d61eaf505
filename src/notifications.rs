//! Transient notification center
//!
//! Subscribes to the host bus and keeps the list of currently visible
//! notifications plus per-application status counters. Entries expire
//! after a fixed TTL unless dismissed earlier; dismissal is idempotent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::bus::{EventBus, Subscription};
use crate::host::AppId;

/// Severity of one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Unknown strings fall back to `Info`, matching the original's
    /// `data.type || 'info'`.
    pub fn parse(value: &str) -> Self {
        match value {
            "success" => Severity::Success,
            "warning" => Severity::Warning,
            "error" => Severity::Error,
            _ => Severity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// One visible notification.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Millisecond-clock id. Two notifications created within the same
    /// millisecond collide; acceptable for a toast list, not for anything
    /// needing strict uniqueness.
    pub id: i64,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Open/active counters for one tracked application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppStatus {
    pub opened: u32,
    pub active: bool,
}

#[derive(Default)]
struct CenterState {
    notifications: Vec<Notification>,
    status: HashMap<AppId, AppStatus>,
}

/// Notification list plus app status, fed by bus subscriptions.
pub struct NotificationCenter {
    state: Mutex<CenterState>,
    ttl: Duration,
}

impl NotificationCenter {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            state: Mutex::new(CenterState::default()),
            ttl: Duration::milliseconds(ttl_ms as i64),
        }
    }

    /// Subscribe to the host event contract: `<app>:opened` /
    /// `<app>:closed` for every tracked app, plus the generic
    /// `notification` event.
    ///
    /// The returned subscriptions are the teardown handles; the caller
    /// keeps them alive for as long as the center should stay attached.
    pub fn attach(self: &Arc<Self>, bus: &Arc<EventBus>) -> Vec<Subscription> {
        let mut subscriptions = Vec::new();

        for app in [AppId::Chat, AppId::Email] {
            let center = Arc::clone(self);
            subscriptions.push(bus.on(&app.opened_event(), move |_| {
                center.push(format!("{} application opened", app.title()), Severity::Info);
                center.mark_opened(app);
            }));

            let center = Arc::clone(self);
            subscriptions.push(bus.on(&app.closed_event(), move |_| {
                center.push(
                    format!("{} application closed", app.title()),
                    Severity::Success,
                );
                center.mark_closed(app);
            }));
        }

        let center = Arc::clone(self);
        subscriptions.push(bus.on("notification", move |data: &Value| {
            let message = data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let severity = data
                .get("type")
                .and_then(Value::as_str)
                .map_or(Severity::Info, Severity::parse);
            center.push(message, severity);
        }));

        subscriptions
    }

    /// Append one notification with a time-derived id.
    pub fn push(&self, message: String, severity: Severity) -> i64 {
        let now = Utc::now();
        let id = now.timestamp_millis();
        let notification = Notification {
            id,
            message,
            severity,
            created_at: now,
            expires_at: now + self.ttl,
        };
        log::debug!("notification #{}: [{}] {}", id, severity.as_str(), notification.message);
        self.state.lock().unwrap().notifications.push(notification);
        id
    }

    /// Remove one notification. A no-op when the id is already gone.
    pub fn dismiss(&self, id: i64) {
        self.state
            .lock()
            .unwrap()
            .notifications
            .retain(|n| n.id != id);
    }

    /// Drop every notification whose TTL elapsed at `now`. Returns how many
    /// were removed. Dismissed ids are already gone, so their timers have
    /// no further effect here.
    pub fn expire_due(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.state.lock().unwrap();
        let before = state.notifications.len();
        state.notifications.retain(|n| n.expires_at > now);
        before - state.notifications.len()
    }

    pub fn clear_all(&self) {
        self.state.lock().unwrap().notifications.clear();
    }

    /// Snapshot of the currently visible notifications, oldest first.
    pub fn visible(&self) -> Vec<Notification> {
        self.state.lock().unwrap().notifications.clone()
    }

    pub fn status(&self, app: AppId) -> AppStatus {
        self.state
            .lock()
            .unwrap()
            .status
            .get(&app)
            .copied()
            .unwrap_or_default()
    }

    fn mark_opened(&self, app: AppId) {
        let mut state = self.state.lock().unwrap();
        let status = state.status.entry(app).or_default();
        status.opened += 1;
        status.active = true;
    }

    fn mark_closed(&self, app: AppId) {
        let mut state = self.state.lock().unwrap();
        state.status.entry(app).or_default().active = false;
    }
}
