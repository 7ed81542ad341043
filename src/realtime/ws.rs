use axum::{
    debug_handler,
    extract::{ws::{Message, WebSocket}, Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast::error::RecvError;

use crate::{auth::{self, gate, Identity, Tokens}, AppError, AppResult, AppState};

use super::{events::{ClientEvent, ServerEvent}, Hub, LiveConnection};

#[derive(Deserialize)]
pub(crate) struct WsQuery {
    token: Option<String>,
}

/// Credential check happens here, before the upgrade: a refused client never
/// touches the registry.
#[debug_handler(state = AppState)]
pub(crate) async fn connect_ws(
    Query(WsQuery { token }): Query<WsQuery>,
    headers: HeaderMap,
    State(db_pool): State<SqlitePool>,
    State(tokens): State<Tokens>,
    State(hub): State<Hub>,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let token = token.as_deref().or_else(|| gate::bearer(&headers));
    let identity = auth::authenticate(&db_pool, &tokens, token).await?;

    Ok(ws
        .on_upgrade(move |socket| serve(socket, hub, identity))
        .into_response())
}

async fn serve(socket: WebSocket, hub: Hub, identity: Identity) {
    let LiveConnection { handle, mut outbound, mut presence } = hub.connect(&identity).await;
    let (mut sender, mut receiver) = socket.split();
    let me = identity.user_id;

    let mut write_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                event = outbound.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                notice = presence.recv() => match notice {
                    Ok(notice) if notice.subject == me => continue,
                    Ok(notice) => notice.event,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(user_id = %me, "presence lagged, {missed} notices missed");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!("unserializable event: {err}");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let read_loop = async {
        while let Some(Ok(frame)) = receiver.next().await {
            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let event = match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => event,
                Err(err) => {
                    handle.send(ServerEvent::error(format!("Malformed event: {err}")));
                    continue;
                }
            };

            if let Err(err) = hub.dispatch(&identity, &handle, event).await {
                if let AppError::Internal(cause) = &err {
                    tracing::error!(user_id = %me, "event failed: {cause:#}");
                }
                handle.send(ServerEvent::error(err.public_message()));
            }
        }
    };

    tokio::select! {
        _ = &mut write_task => {},
        _ = read_loop => {},
    };
    write_task.abort();

    hub.disconnect(&identity, handle.id()).await;
}
