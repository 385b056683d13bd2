//! `oficina logs`: dump recent webhook audit records.

use oficina_gateway::GatewayConfig;
use oficina_storage::{RestStorage, WorkshopStorage};

pub async fn run(config: &GatewayConfig, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(url), Some(key)) = (&config.storage.url, &config.storage.service_key) else {
        return Err(
            "audit records live in hosted storage; set SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY"
                .into(),
        );
    };
    let storage = RestStorage::new(url, key);
    let records = storage.list_webhook_logs(limit).await?;
    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    tracing::debug!(count = records.len(), "listed webhook logs");
    Ok(())
}
