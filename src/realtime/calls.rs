//! WebRTC signaling pass-through.
//!
//! The server keeps no call state. Each side runs its own little machine
//! (idle, calling/ringing, connected, ended/rejected) off the events below;
//! all this module does is address them. Offers, answers and candidates are
//! forwarded as the exact JSON the peer sent.
//!
//! A signal for a user who is not connected is dropped and the originator is
//! not told. A caller can therefore wait on an unreachable callee forever.

use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::Identity, store::social, AppError, AppResult};

use super::{events::{CallKind, ServerEvent}, registry::SessionRegistry};

/// Returns whether the offer reached a live connection.
pub async fn call_user(
    db_pool: &SqlitePool,
    registry: &SessionRegistry,
    caller: &Identity,
    to: Uuid,
    offer: Value,
    call_type: CallKind,
) -> AppResult<bool> {
    if !social::is_mutual(db_pool, caller.user_id, to).await? {
        return Err(AppError::Forbidden("Can only call mutual followers".into()));
    }

    Ok(relay(registry, to, ServerEvent::IncomingCall {
        from: caller.user_id,
        offer,
        call_type,
        caller: caller.summary(),
    }))
}

pub fn answer(registry: &SessionRegistry, from: Uuid, to: Uuid, answer: Value) -> bool {
    relay(registry, to, ServerEvent::CallAnswered { from, answer })
}

pub fn ice_candidate(registry: &SessionRegistry, from: Uuid, to: Uuid, candidate: Value) -> bool {
    relay(registry, to, ServerEvent::IceCandidate { from, candidate })
}

pub fn reject(registry: &SessionRegistry, from: Uuid, to: Uuid) -> bool {
    relay(registry, to, ServerEvent::CallRejected { from })
}

pub fn end(registry: &SessionRegistry, from: Uuid, to: Uuid) -> bool {
    relay(registry, to, ServerEvent::CallEnded { from })
}

fn relay(registry: &SessionRegistry, to: Uuid, event: ServerEvent) -> bool {
    match registry.resolve(to) {
        Some(peer) => peer.send(event),
        None => {
            tracing::debug!(target_user = %to, "call signal dropped, target not connected");
            false
        }
    }
}
