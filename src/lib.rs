pub mod adapters;
pub mod app;
pub mod config;
pub mod ports;
pub mod push;
pub mod service;
pub mod state;
pub mod types;

#[cfg(test)]
mod test_support;

use crate::adapters::{
    DesktopHost, DesktopNotifier, LoopbackPushService, TokioTimeProvider, TomlFileStore,
};
use crate::push::{KeyError, NotificationClient, ReminderScheduler};
use crate::service::ReminderService;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

pub use crate::push::generate_application_server_key;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Builds the desktop service and starts the reminders it already had armed.
pub async fn build_service(
    config: &config::AppConfig,
) -> Result<Arc<ReminderService<DesktopHost>>, KeyError> {
    let application_server_key =
        push::decode_application_server_key(&config.application_server_key)?;
    let store = TomlFileStore::open(&config.store_path);
    let client = NotificationClient::new(
        DesktopNotifier::new(&config.app_name, config.permission_policy, store.clone()),
        LoopbackPushService::new(store.clone()),
        application_server_key,
        config.notification_defaults.clone(),
    );
    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let scheduler =
        ReminderScheduler::new(TokioTimeProvider, client.clone(), config.schedule_policy)
            .with_fired_channel(fired_tx);
    let service = Arc::new(ReminderService::new(
        client,
        scheduler,
        store,
        config.app_name.clone(),
    ));
    service.start().await;
    service.spawn_rearm_loop(fired_rx);
    Ok(service)
}

pub async fn serve(addr: SocketAddr, config: config::AppConfig) -> Result<(), ServeError> {
    info!(
        store = %config.store_path.display(),
        policy = ?config.schedule_policy,
        "starting reminder service"
    );
    let service = build_service(&config).await?;
    let state = state::AppState { config, service };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    info!(%addr, "listening");
    axum::serve(listener, app::app(state)).await?;
    Ok(())
}
