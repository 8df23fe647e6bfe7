//! `GET /api/realtime`: the per-user server-sent event stream.
//!
//! Browsers' `EventSource` cannot set headers, so the session token may
//! travel as `?token=`; a bearer header works too. Each event is sent
//! with its `type` as the SSE event name and the JSON body as data.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use sumbong_auth::AuthError;
use sumbong_realtime::with_heartbeat;
use tracing::info;

use crate::error::ApiResult;
use crate::extract::{ApiQuery, bearer_token};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamQuery {
    #[serde(default)]
    token: Option<String>,
}

pub async fn stream(
    State(state): State<SharedState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<StreamQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let token = query
        .token
        .or_else(|| bearer_token(&headers).map(String::from))
        .ok_or_else(|| AuthError::SessionInvalid("missing session token".into()))?;
    let principal = state.auth.authenticate(&token).await?;

    let user_id = principal.user_id();
    info!(user_id = %user_id, admin = principal.is_admin(), "realtime stream opened");

    let events = with_heartbeat(state.registry.connect(user_id), state.heartbeat_interval)
        .map(|event| Event::default().event(event.kind()).json_data(&event));
    Ok(Sse::new(events))
}
