//! Live queries over server-sent events.
//!
//! A subscriber first receives a `snapshot` event with its whole collection
//! ordered by name, then a fresh snapshot after every committed change to
//! documents it owns in that collection.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::state::AppState;
use crate::store::{Record, Repository};

pub async fn subscribe<T: Record + 'static>(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(%user_id, collection = %T::COLLECTION, "live subscription opened");
    let events = snapshots::<T>(state.repo.clone(), user_id).map(Ok::<_, Infallible>);
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// The event sequence of one subscription. The feed receiver is taken before
/// the first snapshot, so no change can slip in between.
fn snapshots<T: Record + 'static>(repo: Repository, user_id: Uuid) -> impl Stream<Item = Event> {
    let mut changes = repo.subscribe();

    async_stream::stream! {
        yield snapshot::<T>(&repo, user_id).await;

        loop {
            match changes.recv().await {
                Ok(change) if change.collection == T::COLLECTION && change.creator == user_id => {
                    yield snapshot::<T>(&repo, user_id).await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%user_id, skipped, "live subscriber lagged; resyncing");
                    yield snapshot::<T>(&repo, user_id).await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

async fn snapshot<T: Record>(repo: &Repository, user_id: Uuid) -> Event {
    let result = repo
        .list::<T>(user_id)
        .await
        .map_err(|e| e.to_string())
        .and_then(|items| {
            Event::default()
                .event("snapshot")
                .json_data(&items)
                .map_err(|e| e.to_string())
        });
    match result {
        Ok(event) => event,
        Err(message) => {
            warn!(%user_id, error = %message, "snapshot failed");
            Event::default().event("error").data(message)
        }
    }
}
