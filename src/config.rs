//! Host configuration

use serde::Deserialize;

/// Configuration for one [`Host`](crate::host::Host) instance.
///
/// Defaults mirror the demo deployment: the host on port 5174 with chat and
/// email on 5175/5176, a 5 second notification TTL and a 1 second close
/// poll.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Name announced in `HOST_CONNECTED`.
    pub host_app: String,
    pub host_origin: String,
    pub chat_url: String,
    pub email_url: String,
    /// Origins the host exchanges messages with. Validated on both send
    /// and receive; there is no wildcard default.
    pub allowed_origins: Vec<String>,
    pub notification_ttl_ms: u64,
    pub poll_interval_ms: u64,
    pub message_log_cap: usize,
    pub load_timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        let chat_url = "http://localhost:5175".to_string();
        let email_url = "http://localhost:5176".to_string();
        Self {
            host_app: "Demo Host".to_string(),
            host_origin: "http://localhost:5174".to_string(),
            allowed_origins: vec![chat_url.clone(), email_url.clone()],
            chat_url,
            email_url,
            notification_ttl_ms: 5000,
            poll_interval_ms: 1000,
            message_log_cap: 100,
            load_timeout_ms: 3000,
        }
    }
}

impl HostConfig {
    pub fn app_url(&self, app: crate::host::AppId) -> &str {
        match app {
            crate::host::AppId::Chat => &self.chat_url,
            crate::host::AppId::Email => &self.email_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::AppId;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.notification_ttl_ms, 5000);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.app_url(AppId::Chat), "http://localhost:5175");
        assert_eq!(config.app_url(AppId::Email), "http://localhost:5176");
        assert!(!config.allowed_origins.is_empty());
    }

    #[test]
    fn test_partial_deserialization_keeps_defaults() {
        let config: HostConfig =
            serde_json::from_str(r#"{ "host_app": "My Host", "notification_ttl_ms": 1000 }"#)
                .unwrap();
        assert_eq!(config.host_app, "My Host");
        assert_eq!(config.notification_ttl_ms, 1000);
        assert_eq!(config.poll_interval_ms, 1000);
    }
}
