//! Cross-frame messenger
//!
//! In-process analogue of `postMessage` between a host document and an
//! embedded application. [`frame_channel`] builds a connected endpoint pair;
//! every delivery carries the sender's origin, and each endpoint validates
//! origins on both send and receive against its [`OriginPolicy`].
//!
//! Handshake: once the embed reports loaded, the host sends
//! `HOST_CONNECTED`; the embedded endpoint replies with exactly one
//! `APP_LOADED` carrying its own identifier. Later user activity flows
//! upward as `USER_ACTION` envelopes.

use std::collections::VecDeque;
use std::fmt;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::envelope::{wire_timestamp, Envelope};
use crate::error::MessagingError;
use crate::host::AppId;
use crate::origin::OriginPolicy;

/// One message in flight, tagged with the origin that posted it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub origin: String,
    pub message: Value,
}

/// One side of a frame channel.
#[derive(Debug)]
pub struct FrameEndpoint {
    origin: String,
    peer_origin: String,
    policy: OriginPolicy,
    tx: mpsc::UnboundedSender<Delivery>,
    rx: mpsc::UnboundedReceiver<Delivery>,
    rejected: u64,
}

/// Build a connected host/app endpoint pair.
///
/// Origins are plain strings (`scheme://host:port`); each endpoint keeps its
/// own policy so the two sides can disagree about whom they trust.
pub fn frame_channel(
    host_origin: impl Into<String>,
    app_origin: impl Into<String>,
    host_policy: OriginPolicy,
    app_policy: OriginPolicy,
) -> (FrameEndpoint, FrameEndpoint) {
    let host_origin = host_origin.into();
    let app_origin = app_origin.into();
    let (to_app_tx, to_app_rx) = mpsc::unbounded_channel();
    let (to_host_tx, to_host_rx) = mpsc::unbounded_channel();

    let host = FrameEndpoint {
        origin: host_origin.clone(),
        peer_origin: app_origin.clone(),
        policy: host_policy,
        tx: to_app_tx,
        rx: to_host_rx,
        rejected: 0,
    };
    let app = FrameEndpoint {
        origin: app_origin,
        peer_origin: host_origin,
        policy: app_policy,
        tx: to_host_tx,
        rx: to_app_rx,
        rejected: 0,
    };
    (host, app)
}

impl FrameEndpoint {
    /// Post an envelope to the given target origin.
    ///
    /// Unlike the browser original (which posted to `*`), the target must
    /// be in this endpoint's allow-list.
    pub fn post(&self, envelope: &Envelope, target_origin: &str) -> Result<(), MessagingError> {
        if !self.policy.allows(target_origin) {
            return Err(MessagingError::OriginDenied(target_origin.to_string()));
        }
        let message = envelope.to_value()?;
        self.tx
            .send(Delivery {
                origin: self.origin.clone(),
                message,
            })
            .map_err(|_| MessagingError::ChannelClosed)
    }

    /// Post to the peer this endpoint was paired with.
    pub fn post_to_peer(&self, envelope: &Envelope) -> Result<(), MessagingError> {
        let target = self.peer_origin.clone();
        self.post(envelope, &target)
    }

    /// Next accepted inbound envelope, if any.
    ///
    /// Messages from origins outside the allow-list are counted and
    /// dropped, mirroring a rejected browser message that simply never
    /// reaches the handler. Malformed messages are logged and skipped.
    pub fn try_recv(&mut self) -> Option<(String, Envelope)> {
        loop {
            let delivery = self.rx.try_recv().ok()?;
            if !self.policy.allows(&delivery.origin) {
                log::warn!(
                    "dropping message from untrusted origin '{}'",
                    delivery.origin
                );
                self.rejected += 1;
                continue;
            }
            match Envelope::from_value(delivery.message) {
                Ok(envelope) => return Some((delivery.origin, envelope)),
                Err(e) => {
                    log::warn!("malformed message from '{}': {}", delivery.origin, e);
                    continue;
                }
            }
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn peer_origin(&self) -> &str {
        &self.peer_origin
    }

    /// Number of inbound messages dropped by origin policy.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

/// One line of the host's communication log.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub received_at: String,
    pub origin: String,
    pub envelope: Envelope,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = self
            .envelope
            .to_wire()
            .ok()
            .and_then(|w| w.payload)
            .unwrap_or(Value::Null);
        write!(
            f,
            "[{}] {}: {}",
            self.received_at,
            self.envelope.kind(),
            payload
        )
    }
}

/// Host side of one embedded-application session.
///
/// Keeps an ordered, capped log of every accepted inbound envelope (the
/// original kept it unbounded; a cap replaces that).
pub struct HostMessenger {
    endpoint: FrameEndpoint,
    app: AppId,
    host_app: String,
    log: VecDeque<LogEntry>,
    log_cap: usize,
    connected_app: Option<String>,
    ignored: u64,
}

impl HostMessenger {
    pub fn new(
        endpoint: FrameEndpoint,
        app: AppId,
        host_app: impl Into<String>,
        log_cap: usize,
    ) -> Self {
        Self {
            endpoint,
            app,
            host_app: host_app.into(),
            log: VecDeque::new(),
            log_cap,
            connected_app: None,
            ignored: 0,
        }
    }

    /// Kick off the handshake. Called once the embed has finished loading.
    pub fn connect(&self) -> Result<(), MessagingError> {
        log::debug!("sending HOST_CONNECTED to {}", self.app);
        self.endpoint
            .post_to_peer(&Envelope::host_connected(self.host_app.clone()))
    }

    /// Drain all pending inbound envelopes. Returns how many were accepted.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        while let Some((origin, envelope)) = self.endpoint.try_recv() {
            processed += 1;
            self.push_log(origin, envelope.clone());
            match envelope {
                Envelope::AppLoaded(p) => {
                    log::info!("{} app loaded successfully ({})", self.app, p.timestamp);
                    self.connected_app = Some(p.app);
                }
                Envelope::UserAction(p) => {
                    log::info!("user performed action in {}: {} {}", self.app, p.action, p.data);
                }
                Envelope::TestMessage(p) => {
                    log::info!("test message from {}: {}", self.app, p.message);
                }
                Envelope::Unknown { ref kind, .. } => {
                    log::warn!("unknown message type '{}' from {}, ignoring", kind, self.app);
                    self.ignored += 1;
                }
                Envelope::HostConnected(_) => {
                    log::debug!("unexpected HOST_CONNECTED echoed back from {}", self.app);
                }
            }
        }
        processed
    }

    fn push_log(&mut self, origin: String, envelope: Envelope) {
        if self.log.len() == self.log_cap {
            self.log.pop_front();
        }
        self.log.push_back(LogEntry {
            received_at: wire_timestamp(),
            origin,
            envelope,
        });
    }

    /// True once `APP_LOADED` has been received.
    pub fn is_connected(&self) -> bool {
        self.connected_app.is_some()
    }

    /// Identifier the embedded app reported in its handshake reply.
    pub fn connected_app(&self) -> Option<&str> {
        self.connected_app.as_deref()
    }

    pub fn message_log(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.iter()
    }

    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Number of envelopes with an unrecognized type.
    pub fn ignored(&self) -> u64 {
        self.ignored
    }

    /// Number of inbound messages rejected by origin policy.
    pub fn rejected(&self) -> u64 {
        self.endpoint.rejected()
    }

    pub fn app(&self) -> AppId {
        self.app
    }

    pub fn endpoint(&self) -> &FrameEndpoint {
        &self.endpoint
    }
}

/// Simulated embedded application context.
///
/// Replies to the first `HOST_CONNECTED` with exactly one `APP_LOADED`
/// carrying its own identifier, then reports user activity upward.
#[derive(Debug)]
pub struct EmbeddedEndpoint {
    endpoint: FrameEndpoint,
    app_id: String,
    announced: bool,
}

impl EmbeddedEndpoint {
    pub fn new(endpoint: FrameEndpoint, app_id: impl Into<String>) -> Self {
        Self {
            endpoint,
            app_id: app_id.into(),
            announced: false,
        }
    }

    /// Drain pending messages from the host. Returns how many were accepted.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        while let Some((_, envelope)) = self.endpoint.try_recv() {
            processed += 1;
            match envelope {
                Envelope::HostConnected(p) => {
                    log::info!("{}: host '{}' connected", self.app_id, p.host_app);
                    if !self.announced {
                        // Repeated HOST_CONNECTED must not produce a second reply.
                        if let Err(e) = self
                            .endpoint
                            .post_to_peer(&Envelope::app_loaded(self.app_id.clone()))
                        {
                            log::error!("{}: failed to announce APP_LOADED: {}", self.app_id, e);
                        } else {
                            self.announced = true;
                        }
                    }
                }
                Envelope::Unknown { kind, .. } => {
                    log::warn!("{}: unknown message type '{}', ignoring", self.app_id, kind);
                }
                other => {
                    log::debug!("{}: unhandled message {:?}", self.app_id, other.kind());
                }
            }
        }
        processed
    }

    pub fn send_user_action(&self, action: &str, data: Value) -> Result<(), MessagingError> {
        self.endpoint
            .post_to_peer(&Envelope::user_action(action, data))
    }

    pub fn send_test_message(&self, message: &str) -> Result<(), MessagingError> {
        self.endpoint.post_to_peer(&Envelope::test_message(message))
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn endpoint(&self) -> &FrameEndpoint {
        &self.endpoint
    }

    pub fn endpoint_mut(&mut self) -> &mut FrameEndpoint {
        &mut self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HOST: &str = "http://localhost:5174";
    const CHAT: &str = "http://localhost:5175";

    fn pair() -> (FrameEndpoint, FrameEndpoint) {
        frame_channel(
            HOST,
            CHAT,
            OriginPolicy::allow_list([CHAT]),
            OriginPolicy::allow_list([HOST]),
        )
    }

    #[tokio::test]
    async fn test_handshake_yields_exactly_one_app_loaded() {
        let (host_ep, app_ep) = pair();
        let mut host = HostMessenger::new(host_ep, AppId::Chat, "Demo Host", 16);
        let mut app = EmbeddedEndpoint::new(app_ep, "chat");

        host.connect().unwrap();
        // Duplicate HOST_CONNECTED must not trigger a second reply.
        host.connect().unwrap();
        assert_eq!(app.pump(), 2);

        assert_eq!(host.pump(), 1);
        assert!(host.is_connected());
        assert_eq!(host.connected_app(), Some("chat"));
    }

    #[tokio::test]
    async fn test_user_action_is_logged_in_order() {
        let (host_ep, app_ep) = pair();
        let mut host = HostMessenger::new(host_ep, AppId::Chat, "Demo Host", 16);
        let mut app = EmbeddedEndpoint::new(app_ep, "chat");

        host.connect().unwrap();
        app.pump();
        app.send_user_action("sendMessage", json!({"conversation": 1}))
            .unwrap();
        app.send_user_action("markRead", json!({"id": 3})).unwrap();
        host.pump();

        let kinds: Vec<&str> = host.message_log().map(|e| e.envelope.kind()).collect();
        assert_eq!(kinds, vec!["APP_LOADED", "USER_ACTION", "USER_ACTION"]);
    }

    #[tokio::test]
    async fn test_message_log_is_capped() {
        let (host_ep, app_ep) = pair();
        let mut host = HostMessenger::new(host_ep, AppId::Chat, "Demo Host", 3);
        let mut app = EmbeddedEndpoint::new(app_ep, "chat");

        host.connect().unwrap();
        app.pump();
        for i in 0..5 {
            app.send_user_action("tick", json!(i)).unwrap();
        }
        host.pump();

        assert_eq!(host.log_len(), 3);
        // Oldest entries (APP_LOADED, tick 0, tick 1) were dropped.
        let last: Vec<Value> = host
            .message_log()
            .map(|e| match &e.envelope {
                Envelope::UserAction(p) => p.data.clone(),
                other => panic!("unexpected {:?}", other.kind()),
            })
            .collect();
        assert_eq!(last, vec![json!(2), json!(3), json!(4)]);
    }

    #[tokio::test]
    async fn test_unknown_type_is_counted_and_ignored() {
        let (host_ep, app_ep) = pair();
        let mut host = HostMessenger::new(host_ep, AppId::Chat, "Demo Host", 16);

        app_ep
            .post_to_peer(&Envelope::Unknown {
                kind: "MYSTERY".to_string(),
                payload: Some(json!({"a": 1})),
            })
            .unwrap();
        host.pump();

        assert_eq!(host.ignored(), 1);
        assert_eq!(host.log_len(), 1, "unknown envelopes still reach the log");
    }

    #[tokio::test]
    async fn test_send_to_disallowed_origin_fails() {
        let (host_ep, _app_ep) = pair();
        let err = host_ep
            .post(&Envelope::test_message("hi"), "http://evil.example")
            .unwrap_err();
        assert!(matches!(err, MessagingError::OriginDenied(_)));
    }

    #[tokio::test]
    async fn test_receive_from_untrusted_origin_is_dropped() {
        // Host only trusts CHAT, but the app endpoint claims another origin.
        let (host_ep, app_ep) = frame_channel(
            HOST,
            "http://evil.example",
            OriginPolicy::allow_list([CHAT]),
            OriginPolicy::any(),
        );
        let mut host = HostMessenger::new(host_ep, AppId::Chat, "Demo Host", 16);

        app_ep
            .post_to_peer(&Envelope::test_message("spoofed"))
            .unwrap();
        host.pump();

        assert_eq!(host.log_len(), 0);
        assert_eq!(host.rejected(), 1);
    }

    #[tokio::test]
    async fn test_malformed_message_is_skipped() {
        let (host_ep, app_ep) = pair();
        let mut host = HostMessenger::new(host_ep, AppId::Chat, "Demo Host", 16);

        // Known type, payload of the wrong shape.
        app_ep
            .post(
                &Envelope::Unknown {
                    kind: "APP_LOADED".to_string(),
                    payload: Some(json!({"app": 42})),
                },
                HOST,
            )
            .unwrap();
        app_ep.post_to_peer(&Envelope::test_message("ok")).unwrap();
        host.pump();

        let kinds: Vec<&str> = host.message_log().map(|e| e.envelope.kind()).collect();
        assert_eq!(kinds, vec!["TEST_MESSAGE"]);
    }
}
