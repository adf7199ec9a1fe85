mod batcher;
mod connector;
mod hubspot;

use crmsync_config::{init_tracing, AppConfig};
use crmsync_db::accounts::pg_repository::PgAccountRepository;
use crmsync_db::events::pg_repository::PgEventRepository;

use crate::connector::Connector;
use crate::hubspot::client::{HubSpotClient, HubSpotClientConfig};
use crate::hubspot::sync::{HubSpotSyncer, SyncConfig};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing("info");

    tracing::info!(service = "crmsync-ingest", "starting");

    let config = AppConfig::from_env().expect("invalid configuration");
    let pool = crmsync_db::create_pool(&config.database_url)
        .await
        .expect("failed to connect to database");

    // HubSpot connector only runs when app credentials are present
    let Some(client_config) = HubSpotClientConfig::from_env() else {
        tracing::info!("HUBSPOT_CID/HUBSPOT_CS not set, skipping hubspot sync");
        return;
    };

    let sync_config = SyncConfig::from_env().expect("invalid hubspot sync configuration");
    tracing::info!(
        base_url = %client_config.base_url,
        object_types = ?sync_config.object_types,
        batch_threshold = sync_config.batch_threshold,
        "hubspot connector configured, starting sync"
    );

    let client = HubSpotClient::new(client_config).expect("failed to create hubspot client");
    let syncer = HubSpotSyncer::new(
        client,
        PgAccountRepository::new(pool.clone()),
        PgEventRepository::new(pool),
        sync_config,
    );

    match syncer.sync().await {
        Ok(result) => {
            tracing::info!(
                source = result.source,
                accounts = result.accounts,
                events = result.events,
                errors = result.errors,
                "hubspot sync completed"
            );
        }
        Err(e) => {
            tracing::error!(source = syncer.source_name(), error = %e, "hubspot sync failed");
        }
    }

    tracing::info!(service = "crmsync-ingest", "finished");
}
