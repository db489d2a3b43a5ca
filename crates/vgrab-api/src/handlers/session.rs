//! Session cookie handling and session/format endpoints.

use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vgrab_models::FormatChoice;

use crate::session::{SessionView, SESSION_COOKIE};
use crate::state::AppState;

/// Resolve the caller's session, issuing a cookie when a new one was created.
pub async fn resolve_session(state: &AppState, jar: CookieJar) -> (CookieJar, Uuid) {
    let existing = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

    let id = state.sessions.get_or_create(existing).await;
    if existing == Some(id) {
        return (jar, id);
    }

    let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.is_production())
        .build();

    (jar.add(cookie), id)
}

/// One entry of the format selector.
#[derive(Debug, Serialize)]
pub struct FormatOption {
    pub label: &'static str,
    pub default: bool,
}

/// List the format labels in display order.
pub async fn list_formats() -> Json<Vec<FormatOption>> {
    let default = FormatChoice::default();
    Json(
        FormatChoice::ALL
            .iter()
            .map(|choice| FormatOption {
                label: choice.label(),
                default: *choice == default,
            })
            .collect(),
    )
}

/// Current session view-model.
pub async fn get_session(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<SessionView>) {
    let (jar, session) = resolve_session(&state, jar).await;
    let view = state.sessions.view(session).await;
    (jar, Json(view))
}

#[derive(Debug, Deserialize)]
pub struct TimeRangeRequest {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

/// Remember the time fields as typed. Validation happens at download time.
pub async fn set_time_range(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<TimeRangeRequest>,
) -> (CookieJar, Json<SessionView>) {
    let (jar, session) = resolve_session(&state, jar).await;
    state
        .sessions
        .set_time_range(session, &request.start, &request.end)
        .await;
    let view = state.sessions.view(session).await;
    (jar, Json(view))
}
