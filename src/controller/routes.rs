//! HTTP surface: axum router, session binding and response mapping

use std::sync::Arc;
use axum::{
    extract::{Form, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::auth::Authenticator;
use crate::model::RemoteLibrary;
use crate::session::{
    create_session_cookie, ensure_authenticated, AuthResult, Session, SessionHandle, SessionStore,
};
use crate::view::{HomeView, Rendered};

use super::resources::{KindDescriptor, ResourceHandler, KINDS, SHOWS};
use super::visibility::{library_view, parse_bool_param, set_visibility};
use super::{Outcome, ROOT_PATH};

const LOGIN_PATH: &str = "/login";
const AUTH_FAILURE_PATH: &str = "/auth/failure";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<dyn RemoteLibrary>,
    pub auth: Arc<dyn Authenticator>,
    pub sessions: SessionStore,
}

#[derive(Deserialize)]
struct PageParams {
    page: Option<String>,
}

#[derive(Deserialize)]
struct SearchParams {
    query: Option<String>,
    page: Option<String>,
}

#[derive(Deserialize)]
struct IdParams {
    id: Option<String>,
}

#[derive(Deserialize)]
struct LibraryParams {
    refresh_playlists: Option<String>,
}

#[derive(Deserialize)]
struct VisibilityParams {
    public: Option<String>,
    owner_id: Option<String>,
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Create the router for the application
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route(ROOT_PATH, get(home))
        .route("/up", get(health))
        .route(LOGIN_PATH, get(login))
        .route("/auth/spotify/callback", get(callback).post(callback))
        .route(AUTH_FAILURE_PATH, get(auth_failure))
        .route("/logout", post(logout).delete(logout))
        .route("/library", get(library))
        .route("/playlists/{id}/visibility", patch(update_visibility));

    KINDS
        .iter()
        .fold(router, |router, &descriptor| router.merge(resource_routes(descriptor)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// List, search, save and remove routes for one resource kind
fn resource_routes(descriptor: &'static KindDescriptor) -> Router<AppState> {
    Router::new()
        .route(
            descriptor.path,
            get(
                move |State(state): State<AppState>, headers: HeaderMap, Query(params): Query<PageParams>| async move {
                    let mut handle = state.sessions.resolve(&headers).await;
                    let outcome = ResourceHandler::new(state.library.as_ref(), descriptor)
                        .list(&mut handle.session, params.page.as_deref())
                        .await;
                    respond(&state, handle, outcome).await
                },
            )
            .post(
                move |State(state): State<AppState>, headers: HeaderMap, Form(params): Form<IdParams>| async move {
                    let mut handle = state.sessions.resolve(&headers).await;
                    let outcome: Outcome<()> = ResourceHandler::new(state.library.as_ref(), descriptor)
                        .create(&mut handle.session, params.id.as_deref())
                        .await;
                    respond(&state, handle, outcome).await
                },
            ),
        )
        .route(
            descriptor.search_path,
            get(
                move |State(state): State<AppState>, headers: HeaderMap, Query(params): Query<SearchParams>| async move {
                    let mut handle = state.sessions.resolve(&headers).await;
                    let outcome = ResourceHandler::new(state.library.as_ref(), descriptor)
                        .search(&mut handle.session, params.query.as_deref(), params.page.as_deref())
                        .await;
                    respond(&state, handle, outcome).await
                },
            ),
        )
        .route(
            descriptor.member_path,
            delete(
                move |State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>| async move {
                    let mut handle = state.sessions.resolve(&headers).await;
                    let outcome: Outcome<()> = ResourceHandler::new(state.library.as_ref(), descriptor)
                        .destroy(&mut handle.session, &id)
                        .await;
                    respond(&state, handle, outcome).await
                },
            ),
        )
}

/// Turn an outcome into a response and persist the session.
///
/// Rendering consumes the pending flash; redirecting stores a new one.
async fn respond<V: Serialize>(state: &AppState, mut handle: SessionHandle, outcome: Outcome<V>) -> Response {
    let mut response = match outcome {
        Outcome::Render(view) => {
            let flash = handle.session.take_flash();
            Json(Rendered::new(view, flash)).into_response()
        }
        Outcome::Redirect { location, flash } => {
            if flash.is_some() {
                handle.session.flash = flash;
            }
            Redirect::to(&location).into_response()
        }
    };

    commit(state, handle, &mut response).await;
    response
}

async fn commit(state: &AppState, handle: SessionHandle, response: &mut Response) {
    // Anonymous visitors with nothing to remember don't get a session
    if handle.is_new && handle.session == Session::default() {
        return;
    }

    if !handle.is_new {
        // A logout that finished while this request ran must stay in effect
        if !state.sessions.update(&handle.token, handle.session).await {
            tracing::debug!("Session ended during request, not storing it");
        }
        return;
    }

    match HeaderValue::from_str(&create_session_cookie(&handle.token)) {
        Ok(cookie) => {
            response.headers_mut().append(header::SET_COOKIE, cookie);
            state.sessions.create(&handle.token, handle.session).await;
        }
        Err(e) => tracing::error!(error = %e, "Could not build session cookie"),
    }
}

async fn home(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers).await;
    let user_id = match ensure_authenticated(&handle.session, Utc::now()) {
        AuthResult::Authenticated(credential) => Some(credential.user_id),
        AuthResult::Unauthenticated => None,
    };

    let view = HomeView {
        signed_in: user_id.is_some(),
        user_id,
        login_path: LOGIN_PATH,
    };
    respond(&state, handle, Outcome::Render(view)).await
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn login(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut handle = state.sessions.resolve(&headers).await;
    let oauth_state = uuid::Uuid::new_v4().simple().to_string();

    let outcome: Outcome<()> = match state.auth.authorize_url(&oauth_state) {
        Ok(url) => {
            handle.session.oauth_state = Some(oauth_state);
            Outcome::redirect(url)
        }
        Err(e) => {
            tracing::error!(error = %e, "Could not start Spotify sign-in");
            Outcome::redirect(AUTH_FAILURE_PATH)
        }
    };
    respond(&state, handle, outcome).await
}

async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let mut handle = state.sessions.resolve(&headers).await;
    let expected_state = handle.session.oauth_state.take();

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Spotify sign-in was declined");
        return respond(&state, handle, Outcome::<()>::redirect(AUTH_FAILURE_PATH)).await;
    }

    if expected_state.is_none() || params.state != expected_state {
        tracing::warn!("OAuth state mismatch on callback");
        return respond(&state, handle, Outcome::<()>::redirect(AUTH_FAILURE_PATH)).await;
    }

    let Some(code) = params.code else {
        tracing::warn!("Callback without authorization code");
        return respond(&state, handle, Outcome::<()>::redirect(AUTH_FAILURE_PATH)).await;
    };

    match state.auth.exchange(&code).await {
        Ok(credential) => {
            // New token on sign-in, the pre-login one is discarded
            state.sessions.destroy(&handle.token).await;
            let handle = SessionHandle::fresh(Session::authenticated(credential));
            let outcome: Outcome<()> = Outcome::redirect_with_notice(SHOWS.path, "Signed in successfully.");
            respond(&state, handle, outcome).await
        }
        Err(e) => {
            tracing::error!(error = %e, "Spotify sign-in failed");
            respond(&state, handle, Outcome::<()>::redirect(AUTH_FAILURE_PATH)).await
        }
    }
}

async fn auth_failure(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers).await;
    let outcome: Outcome<()> = Outcome::redirect_with_alert(ROOT_PATH, "Authentication failed.");
    respond(&state, handle, outcome).await
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers).await;
    if let Some(user_id) = handle.session.user_id() {
        tracing::info!(user_id, "Signing out");
    }
    state.sessions.destroy(&handle.token).await;

    let outcome: Outcome<()> = Outcome::redirect_with_notice(ROOT_PATH, "Signed out.");
    respond(&state, SessionHandle::fresh(Session::default()), outcome).await
}

async fn library(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<LibraryParams>,
) -> Response {
    let mut handle = state.sessions.resolve(&headers).await;
    let refresh = parse_bool_param(params.refresh_playlists.as_deref());
    let outcome = library_view(state.library.as_ref(), &mut handle.session, refresh).await;
    respond(&state, handle, outcome).await
}

async fn update_visibility(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(playlist_id): Path<String>,
    Form(params): Form<VisibilityParams>,
) -> Response {
    let mut handle = state.sessions.resolve(&headers).await;
    let outcome: Outcome<()> = set_visibility(
        state.library.as_ref(),
        &mut handle.session,
        &playlist_id,
        parse_bool_param(params.public.as_deref()),
        params.owner_id.as_deref(),
    )
    .await;
    respond(&state, handle, outcome).await
}
