use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use fly8_api::NotificationFilters;
use fly8_cache::{QueryKey, StoreEvent, Subscription};
use fly8_channel::ChannelStatus;
use fly8_core::models::NotificationStatus;
use fly8_core::session::FileSessionStore;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fly8_sync::views::{ConversationList, NotificationView};
use fly8_sync::{keys, LiveDashboard, SyncConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fly8_live=info,fly8_sync=info,fly8_channel=info,fly8_cache=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = SyncConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        api_url = %config.api_url,
        socket_url = %config.socket_url,
        session_path = %config.session_path.display(),
        "Loaded sync configuration",
    );

    // --- Dashboard ---
    let session = Arc::new(FileSessionStore::new(&config.session_path));
    let dashboard = LiveDashboard::new(config, session).context("failed to build dashboard")?;
    let _router = dashboard.start().context("failed to start live dashboard")?;

    let unread_notifications = keys::notifications(&NotificationFilters {
        status: Some(NotificationStatus::Unread),
        ..NotificationFilters::default()
    });
    let watched = [
        keys::student_stats(),
        keys::message_stats(),
        keys::appointment_stats(),
        keys::today_appointments(),
        keys::conversations(),
        unread_notifications.clone(),
    ];
    let subscriptions: HashMap<QueryKey, Subscription> = watched
        .into_iter()
        .map(|key| {
            let poll = dashboard.poll_for(key.kind());
            (key.clone(), dashboard.watch(key, poll))
        })
        .collect();
    tracing::info!(queries = subscriptions.len(), "Watching dashboard queries");

    let mut status = dashboard.channel().status_updates();
    let mut updates = dashboard.store().events();
    let mut conversations = ConversationList::new();
    let mut notifications = NotificationView::unread_only();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            changed = status.recv() => match changed {
                Ok(ChannelStatus::Connected { transport }) => {
                    tracing::info!(transport = ?transport, "Event channel connected");
                }
                Ok(ChannelStatus::Disconnected) => {
                    tracing::warn!("Event channel disconnected, polling continues");
                }
                Ok(ChannelStatus::ReconnectFailed { attempts }) => {
                    tracing::warn!(attempts, "Event channel gave up, relying on polling");
                }
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            event = updates.recv() => match event {
                Ok(StoreEvent::Updated(key)) => {
                    let Some(subscription) = subscriptions.get(&key) else {
                        continue;
                    };
                    let entry = subscription.entry();
                    if entry.is_fetching {
                        continue;
                    }
                    if let Some(error) = &entry.error {
                        tracing::warn!(key = %key, error = %error, "Query refresh failed");
                        continue;
                    }
                    let Some(data) = entry.data.as_ref() else {
                        continue;
                    };

                    if key.kind() == keys::CONVERSATIONS {
                        match conversations.apply(data) {
                            Ok(_) => tracing::info!(
                                conversations = conversations.conversations().len(),
                                unread = conversations.total_unread(),
                                "Conversations refreshed",
                            ),
                            Err(e) => tracing::warn!(error = %e, "Malformed conversations payload"),
                        }
                    } else if key == unread_notifications {
                        match notifications.apply(data) {
                            Ok(()) => tracing::info!(
                                unread = notifications.unread_total(),
                                "Notifications refreshed",
                            ),
                            Err(e) => tracing::warn!(error = %e, "Malformed notifications payload"),
                        }
                    } else {
                        tracing::info!(key = %key, data = %data, "Query refreshed");
                    }
                }
                Ok(StoreEvent::Released(_)) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    drop(subscriptions);
    dashboard.shutdown().await;
    Ok(())
}
