//! Realtime notification stream.
//!
//! One task per connection. Authentication happens before the upgrade; the
//! connected loop then joins the user's group, pushes the unread count and
//! the recent-list snapshot, and afterwards multiplexes inbound commands and
//! group events over one `select!`. Processing both sides in the same loop
//! keeps command handling strictly in receipt order and lets acknowledgements
//! share the socket with broadcast events.
//!
//! Command failures at this boundary are logged and dropped, never fatal to
//! the connection; only a dead socket ends the loop.

use crate::extractors::SessionUser;
use crate::state::AppState;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use marketplace_core::{ClientCommand, NotificationPayload, UserEvent, UserId};
use metrics::{counter, gauge};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// `GET /ws/notifications`
///
/// Rejects with 401 before upgrading when the token is missing or invalid.
pub async fn websocket(
    ws: WebSocketUpgrade,
    SessionUser(user): SessionUser,
    State(state): State<AppState>,
) -> Response {
    let user_id = user.id;
    ws.on_upgrade(move |socket| async move {
        gauge!("ws_connections").increment(1.0);
        connection(socket, user_id, state).await;
        gauge!("ws_connections").decrement(1.0);
    })
}

/// Connected-phase loop. Returns when the socket closes.
async fn connection(mut socket: WebSocket, user: UserId, state: AppState) {
    let mut events = state.registry.subscribe(user).await;
    info!(%user, "notification stream connected");

    // Initial snapshot: current unread count, then the recent list. A client
    // reconnecting after missed events reconciles through these two.
    if send_snapshot(&mut socket, &state, user).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if handle_command(&mut socket, &state, user, &text).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Ping/pong are answered by the transport; binary has no
                    // meaning in this protocol.
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        debug!(%user, %error, "socket error");
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if send_event(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Too slow for the group buffer; resynchronize from
                        // the store instead of replaying.
                        warn!(%user, skipped, "connection lagged, resynchronizing");
                        if send_snapshot(&mut socket, &state, user).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!(%user, "notification stream closed");
}

/// Dispatch one inbound command. `Err` only for a dead socket.
async fn handle_command(
    socket: &mut WebSocket,
    state: &AppState,
    user: UserId,
    text: &str,
) -> Result<(), axum::Error> {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(error) => {
            debug!(%user, %error, "ignoring malformed command");
            return Ok(());
        }
    };
    counter!("ws_commands_total").increment(1);

    match command {
        ClientCommand::MarkRead { notification_id } => {
            match state.notifications.mark_read(user, notification_id).await {
                Ok(_) => {
                    send_event(socket, &UserEvent::NotificationRead { notification_id }).await?;
                }
                Err(error) => warn!(%user, %error, "mark_read failed"),
            }
        }
        ClientCommand::MarkAllRead => match state.notifications.mark_all_read(user).await {
            Ok(_) => send_event(socket, &UserEvent::AllNotificationsRead).await?,
            Err(error) => warn!(%user, %error, "mark_all_read failed"),
        },
        ClientCommand::GetNotifications => match state.notifications.recent(user).await {
            Ok(notifications) => {
                send_event(socket, &list_event(&notifications)).await?;
            }
            Err(error) => warn!(%user, %error, "recent list load failed"),
        },
        ClientCommand::ArchiveNotification { notification_id } => {
            match state.notifications.archive(user, notification_id).await {
                Ok(_) => {
                    send_event(socket, &UserEvent::NotificationArchived { notification_id })
                        .await?;
                }
                Err(error) => warn!(%user, %error, "archive failed"),
            }
        }
    }
    Ok(())
}

/// Push the unread count and the recent list directly on this socket.
async fn send_snapshot(
    socket: &mut WebSocket,
    state: &AppState,
    user: UserId,
) -> Result<(), axum::Error> {
    match state.notifications.unread_count(user).await {
        Ok(unread_count) => {
            send_event(socket, &UserEvent::NotificationCount { unread_count }).await?;
        }
        Err(error) => warn!(%user, %error, "unread count load failed"),
    }
    match state.notifications.recent(user).await {
        Ok(notifications) => send_event(socket, &list_event(&notifications)).await?,
        Err(error) => warn!(%user, %error, "recent list load failed"),
    }
    Ok(())
}

/// Serialize and send one event. `Err` only for a dead socket.
async fn send_event(socket: &mut WebSocket, event: &UserEvent) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json)).await,
        Err(error) => {
            warn!(%error, "failed to serialize event");
            Ok(())
        }
    }
}

/// Snapshot event from store rows.
fn list_event(notifications: &[marketplace_core::Notification]) -> UserEvent {
    UserEvent::NotificationList {
        notifications: notifications.iter().map(NotificationPayload::from).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code
mod tests {
    use super::*;
    use chrono::Utc;
    use marketplace_core::{NewNotification, NotificationKind};
    use uuid::Uuid;

    #[test]
    fn list_event_preserves_store_order() {
        let owner = UserId(Uuid::new_v4());
        let rows: Vec<_> = ["Second", "First"]
            .into_iter()
            .map(|title| {
                NewNotification::new(owner, NotificationKind::System, title, "body")
                    .into_notification(Utc::now())
            })
            .collect();

        match list_event(&rows) {
            UserEvent::NotificationList { notifications } => {
                let titles: Vec<_> = notifications.iter().map(|n| n.title.as_str()).collect();
                assert_eq!(titles, vec!["Second", "First"]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn list_event_serializes_under_the_wire_tag() {
        let value = serde_json::to_value(list_event(&[])).unwrap();
        assert_eq!(value["type"], "notification_list");
        assert_eq!(value["notifications"], serde_json::json!([]));
    }
}
