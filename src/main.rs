use std::sync::Arc;

use scenario_studio::adapters::{FileStateStorage, WebSocketTransport};
use scenario_studio::application::{ChatStore, RealtimeClient};
use scenario_studio::config::AppConfig;
use scenario_studio::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    telemetry::init(&config.telemetry)?;

    tracing::info!(url = %config.realtime.url, "starting scenario studio client");

    let storage = Arc::new(FileStateStorage::new(&config.storage.data_dir));
    let store = ChatStore::load(
        storage,
        config.storage.state_key.clone(),
        config.storage.session_deletion_policy,
    );
    let state = store.get_state();
    tracing::info!(
        messages = state.messages.len(),
        sessions = state.chat_sessions.len(),
        bookmarks = state.bookmarked_messages.len(),
        "chat state loaded"
    );

    let client = RealtimeClient::from_config(&config.realtime, Arc::new(WebSocketTransport::new()));

    let mut status = client.status();
    let status_task = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let state = *status.borrow_and_update();
            tracing::info!(state = %state, "realtime connection state");
        }
    });

    let subscriptions: Vec<_> = config
        .realtime
        .topic_list()
        .into_iter()
        .map(|topic| {
            let label = topic.clone();
            client.subscribe_fn(topic, move |payload| {
                tracing::info!(topic = %label, %payload, "realtime payload");
            })
        })
        .collect();

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    for subscription in subscriptions {
        subscription.unsubscribe();
    }
    client.disconnect();
    status_task.abort();

    if !store.is_persisted() {
        tracing::warn!("chat state has unsaved changes at shutdown");
    }
    Ok(())
}
