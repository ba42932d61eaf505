//! End-to-end host flow: embed, handshake, user actions, teardown.

use serde_json::json;

use hostbus::{AppId, AppStatus, Envelope, Host, HostConfig, StaticRemote};

fn demo_host() -> Host {
    let host = Host::new(HostConfig::default());
    host.registry()
        .register(AppId::Chat, Box::new(StaticRemote::new("chatApp/App")));
    host.registry()
        .register(AppId::Email, Box::new(StaticRemote::new("emailApp/App")));
    host
}

#[tokio::test]
async fn test_full_embedded_session() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut host = demo_host();

    let mut chat = host.open_embedded(AppId::Chat).await.unwrap();
    let mut email = host.open_embedded(AppId::Email).await.unwrap();

    // Embeds receive HOST_CONNECTED and announce themselves.
    chat.pump();
    email.pump();
    host.pump();

    for (app, id) in [(AppId::Chat, "chat"), (AppId::Email, "email")] {
        let session = host.session(app).unwrap();
        assert!(session.is_connected());
        assert_eq!(session.connected_app(), Some(id));
    }

    // User activity flows upward and lands in the host log in send order.
    chat.send_user_action("sendMessage", json!({ "conversation": 1 }))
        .unwrap();
    chat.send_user_action("markRead", json!({ "conversation": 3 }))
        .unwrap();
    host.pump();

    let actions: Vec<String> = host
        .message_log(AppId::Chat)
        .iter()
        .filter_map(|entry| match &entry.envelope {
            Envelope::UserAction(p) => Some(p.action.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(actions, vec!["sendMessage", "markRead"]);

    // Both opens were counted and notified.
    assert_eq!(
        host.status(AppId::Chat),
        AppStatus {
            opened: 1,
            active: true
        }
    );
    let messages: Vec<String> = host
        .notifications()
        .visible()
        .iter()
        .map(|n| n.message.clone())
        .collect();
    assert!(messages.contains(&"Chat application opened".to_string()));
    assert!(messages.contains(&"Email application opened".to_string()));

    // Teardown emits the close event and flips the status.
    host.close_embedded(AppId::Chat).unwrap();
    assert_eq!(
        host.status(AppId::Chat),
        AppStatus {
            opened: 1,
            active: false
        }
    );
    assert!(host
        .notifications()
        .visible()
        .iter()
        .any(|n| n.message == "Chat application closed"));
}

#[tokio::test]
async fn test_reopening_increments_open_count() {
    let mut host = demo_host();

    let _first = host.open_embedded(AppId::Chat).await.unwrap();
    host.close_embedded(AppId::Chat).unwrap();
    let _second = host.open_embedded(AppId::Chat).await.unwrap();

    assert_eq!(
        host.status(AppId::Chat),
        AppStatus {
            opened: 2,
            active: true
        }
    );
}

#[tokio::test]
async fn test_handshake_reply_carries_embedded_identifier() {
    let mut host = demo_host();
    let mut chat = host.open_embedded(AppId::Chat).await.unwrap();

    chat.pump();
    host.pump();

    let loaded: Vec<String> = host
        .message_log(AppId::Chat)
        .iter()
        .filter_map(|entry| match &entry.envelope {
            Envelope::AppLoaded(p) => Some(p.app.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(loaded, vec!["chat"], "exactly one APP_LOADED with own id");
}
