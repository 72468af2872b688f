//! WebSocket subscription endpoint.
//!
//! `GET /api/orders/execute?orderId=<uuid>` upgrades to a socket that
//! receives one JSON frame per status change of that order. The order is
//! resolved before the upgrade; a missing or unknown ID gets an error frame
//! and an immediate close.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::ports::{EventSink, OrderStore};
use crate::application::services::NotificationHub;
use crate::domain::order::OrderId;
use crate::infrastructure::sink::{ChannelSink, SinkMessage};

use super::controller::AppState;
use super::request::SubscribeQuery;
use super::response::{SocketErrorMessage, SubscribedMessage};

/// Upgrade handler.
pub(super) async fn subscribe_order<S>(
    State(state): State<AppState<S>>,
    Query(query): Query<SubscribeQuery>,
    ws: WebSocketUpgrade,
) -> Response
where
    S: OrderStore + 'static,
{
    let resolved = resolve_order(state.store.as_ref(), query.order_id.as_deref()).await;
    let hub = Arc::clone(&state.hub);

    ws.on_upgrade(move |socket| async move {
        match resolved {
            Ok(order_id) => serve(socket, hub, order_id).await,
            Err(reason) => reject(socket, reason).await,
        }
    })
}

/// Map the query parameter to a known order.
async fn resolve_order<S>(store: &S, raw: Option<&str>) -> Result<OrderId, String>
where
    S: OrderStore,
{
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err("orderId query parameter is required".to_string());
    };
    let order_id: OrderId = raw
        .parse()
        .map_err(|_| format!("orderId {raw} is not a valid UUID"))?;

    match store.find_by_id(&order_id).await {
        Ok(Some(_)) => Ok(order_id),
        Ok(None) => Err(format!("Order {order_id} not found")),
        Err(e) => Err(format!("Order lookup failed: {e}")),
    }
}

fn text_frame<T: Serialize>(value: &T) -> Option<Message> {
    serde_json::to_string(value)
        .ok()
        .map(|text| Message::Text(text.into()))
}

async fn reject(mut socket: WebSocket, reason: String) {
    debug!(reason = %reason, "Rejecting subscription");
    if let Some(frame) = text_frame(&SocketErrorMessage { error: reason }) {
        let _ = socket.send(frame).await;
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn serve(socket: WebSocket, hub: Arc<NotificationHub>, order_id: OrderId) {
    let (mut sender, mut receiver) = socket.split();
    let (sink, mut rx) = ChannelSink::channel();

    // Register before the ack so no transition falls in between.
    let sink_id = match hub.subscribe(order_id, sink.clone()) {
        Ok(id) => id,
        Err(e) => {
            if let Some(frame) = text_frame(&SocketErrorMessage {
                error: e.to_string(),
            }) {
                let _ = sender.send(frame).await;
            }
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };
    info!(%order_id, "Subscriber attached");

    let ack_sent = match text_frame(&SubscribedMessage::new(order_id)) {
        Some(frame) => sender.send(frame).await.is_ok(),
        None => false,
    };

    if ack_sent {
        let mut writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    SinkMessage::Event(text) => {
                        if sender.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    SinkMessage::Close => {
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        let mut reader = tokio::spawn(async move {
            while let Some(frame) = receiver.next().await {
                match frame {
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        });

        tokio::select! {
            _ = &mut writer => reader.abort(),
            _ = &mut reader => writer.abort(),
        }
    } else {
        warn!(%order_id, "Subscriber went away before acknowledgement");
    }

    hub.unsubscribe(order_id, sink_id);
    sink.close();
    info!(%order_id, "Subscriber detached");
}
