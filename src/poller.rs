//! Window-close poller
//!
//! A window opened in a new tab delivers no close event across origins, so
//! the host polls the handle's closed flag at a fixed interval. On the
//! first observed close the poller emits `<app>:closed` exactly once and
//! stops ticking.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::bus::EventBus;
use crate::error::HostError;
use crate::host::AppId;

/// Minimal view of an externally opened window. Cross-origin handles only
/// expose whether the window is gone.
#[cfg_attr(test, mockall::automock)]
pub trait WindowHandle: Send + 'static {
    fn is_closed(&self) -> bool;
}

/// Opens application windows. `None` means the popup was blocked.
pub trait WindowOpener<W: WindowHandle> {
    fn open(&self, app: AppId, url: &str) -> Option<W>;
}

/// Guard for one running close poller. Dropping the guard stops the timer;
/// whoever starts a poller owns clearing it on teardown.
pub struct ClosePoller {
    task: JoinHandle<()>,
}

impl ClosePoller {
    /// Start polling the handle.
    ///
    /// `window` is `None` when the popup was blocked; in that case the
    /// poller must not start and the failure is surfaced explicitly.
    pub fn spawn<W: WindowHandle>(
        bus: Arc<EventBus>,
        app: AppId,
        window: Option<W>,
        interval: Duration,
    ) -> Result<Self, HostError> {
        let window = window.ok_or(HostError::PopupBlocked(app))?;

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if window.is_closed() {
                    log::debug!("{} window observed closed, stopping poller", app);
                    bus.emit(&app.closed_event(), Value::Null);
                    break;
                }
            }
        });

        Ok(Self { task })
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ClosePoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_popup_blocked_surfaces_error_and_never_starts() {
        let bus = Arc::new(EventBus::new());
        let result = ClosePoller::spawn::<MockWindowHandle>(
            Arc::clone(&bus),
            AppId::Chat,
            None,
            Duration::from_millis(5),
        );
        assert!(matches!(result, Err(HostError::PopupBlocked(AppId::Chat))));
    }

    #[tokio::test]
    async fn test_emits_closed_exactly_once_after_flag_flips() {
        let bus = Arc::new(EventBus::new());
        let closed_events = Arc::new(AtomicUsize::new(0));
        let closed_clone = Arc::clone(&closed_events);
        bus.on("chat:closed", move |_| {
            closed_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Closed flag flips to true on the third poll.
        let mut window = MockWindowHandle::new();
        let mut ticks = 0;
        window.expect_is_closed().returning(move || {
            ticks += 1;
            ticks >= 3
        });

        let poller = ClosePoller::spawn(
            Arc::clone(&bus),
            AppId::Chat,
            Some(window),
            Duration::from_millis(5),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(closed_events.load(Ordering::SeqCst), 1);
        assert!(poller.is_finished(), "poller must stop after the close");
    }

    #[tokio::test]
    async fn test_drop_aborts_the_timer() {
        let bus = Arc::new(EventBus::new());
        let closed_events = Arc::new(AtomicUsize::new(0));
        let closed_clone = Arc::clone(&closed_events);
        bus.on("email:closed", move |_| {
            closed_clone.fetch_add(1, Ordering::SeqCst);
        });

        let mut window = MockWindowHandle::new();
        window.expect_is_closed().returning(|| false);

        let poller = ClosePoller::spawn(
            Arc::clone(&bus),
            AppId::Email,
            Some(window),
            Duration::from_millis(5),
        )
        .unwrap();
        drop(poller);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(closed_events.load(Ordering::SeqCst), 0);
    }
}
