//! hostbus demo - scripted host/embedded messaging session
//!
//! Opens the chat and email applications embedded in the host, replays a
//! few user actions through the frame channel, fires a test notification
//! on the bus and prints the communication log and final status.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use serde_json::json;

use hostbus::{AppId, Host, HostConfig, StaticRemote};

#[derive(Parser, Debug)]
#[command(name = "hostbus", about = "Host/embedded messaging runtime demo")]
struct Args {
    /// Name the host announces in HOST_CONNECTED
    #[arg(long, default_value = "Demo Host")]
    host_app: String,

    /// Notification time-to-live in milliseconds
    #[arg(long, default_value_t = 5000)]
    ttl_ms: u64,

    /// Message log cap per session
    #[arg(long, default_value_t = 100)]
    log_cap: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = HostConfig {
        host_app: args.host_app,
        notification_ttl_ms: args.ttl_ms,
        message_log_cap: args.log_cap,
        ..HostConfig::default()
    };
    let mut host = Host::new(config);

    host.registry()
        .register(AppId::Chat, Box::new(StaticRemote::new("chatApp/App")));
    host.registry()
        .register(AppId::Email, Box::new(StaticRemote::new("emailApp/App")));

    // Open both applications embedded and run the handshake.
    let mut chat = host.open_embedded(AppId::Chat).await?;
    let mut email = host.open_embedded(AppId::Email).await?;
    chat.pump();
    email.pump();
    host.pump();

    // Replay the kind of activity the embedded apps report upward.
    chat.send_user_action("sendMessage", json!({ "conversation": 1 }))?;
    chat.send_user_action("markRead", json!({ "conversation": 3 }))?;
    email.send_user_action("composeEmail", json!({ "to": "jane@example.com" }))?;
    email.send_test_message("Hello from the email app")?;
    host.pump();

    // A custom notification straight over the bus.
    host.bus().emit(
        "notification",
        json!({ "message": "Test notification from EventBus!", "type": "success" }),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    host.pump();

    for app in [AppId::Chat, AppId::Email] {
        println!("--- {} message log ---", app.title());
        for entry in host.message_log(app) {
            println!("{}", entry);
        }
        let status = host.status(app);
        println!(
            "{}: {} opens, {}",
            app.title(),
            status.opened,
            if status.active { "active" } else { "inactive" }
        );
    }

    host.close_embedded(AppId::Email)?;

    println!("--- notifications ---");
    for notification in host.notifications().visible() {
        println!("[{}] {}", notification.severity.as_str(), notification.message);
    }

    Ok(())
}
