use std::sync::Arc;
use tracing::info;

use crate::adapters::KiteClient;
use crate::config::AppConfig;
use crate::error::Result;
use crate::session::SessionManager;

use super::BrokerApi;

/// Create the runtime broker client from `AppConfig` and authenticate it.
///
/// `dry_run` only suppresses order placement; reads still go to the live API.
pub async fn build_broker_client(
    app_config: &AppConfig,
    dry_run: bool,
) -> Result<Arc<dyn BrokerApi>> {
    let mut client = KiteClient::from_config(
        &app_config.broker,
        &app_config.execution.variety,
        dry_run,
    )?;

    let session = SessionManager::new(&app_config.broker);
    let profile = session.establish(&mut client).await?;
    info!(
        "Broker session ready for {} ({}){}",
        profile.user_name,
        profile.user_id,
        if client.is_dry_run() { " [dry run]" } else { "" }
    );

    Ok(Arc::new(client))
}
