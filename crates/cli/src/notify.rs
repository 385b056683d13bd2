//! `oficina notify-status`: report an operator's status change to the gateway.

use oficina_gateway::notify::{StatusChangeNotice, StatusNotifier};
use oficina_gateway::{GatewayConfig, WEBHOOK_PATH};
use oficina_storage::OrderStatus;

pub async fn run(
    config: &GatewayConfig,
    number: i64,
    from: &str,
    to: &str,
    url: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let notice = StatusChangeNotice {
        number,
        previous: from.parse::<OrderStatus>()?,
        current: to.parse::<OrderStatus>()?,
    };
    let url = url.unwrap_or_else(|| default_url(config.port));

    let notifier = StatusNotifier::new(url, config.webhook_secret.clone());
    let report = notifier.notify(&notice).await?;

    println!("{}", serde_json::to_string_pretty(&report.body)?);
    if !report.is_success() {
        return Err(format!("gateway responded with status {}", report.status).into());
    }
    Ok(())
}

fn default_url(port: u16) -> String {
    format!("http://localhost:{}{}", port, WEBHOOK_PATH)
}
