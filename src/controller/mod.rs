//! Controller module - Request handling for the saved library
//!
//! Handlers take the session explicitly and return an [`Outcome`], so they can
//! be driven without an HTTP stack. It is organized into submodules by
//! responsibility:
//!
//! - `resources`: List/search/save/remove, table-driven over resource kinds
//! - `visibility`: Library view and owner-only playlist visibility changes
//! - `routes`: axum router, session binding and response mapping

mod resources;
mod visibility;
mod routes;

use chrono::Utc;

use crate::model::{Credential, RemoteLibrary};
use crate::session::{ensure_authenticated, AuthResult, Flash, Session, SESSION_EXPIRED};

pub use routes::{create_router, AppState};

pub const ROOT_PATH: &str = "/";

/// What a handler wants done with the request
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<V> {
    Render(V),
    Redirect { location: String, flash: Option<Flash> },
}

impl<V> Outcome<V> {
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
            flash: None,
        }
    }

    pub fn redirect_with_notice(location: impl Into<String>, notice: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
            flash: Some(Flash::Notice(notice.into())),
        }
    }

    pub fn redirect_with_alert(location: impl Into<String>, alert: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
            flash: Some(Flash::Alert(alert.into())),
        }
    }

    pub(crate) fn session_expired() -> Self {
        Self::redirect_with_alert(ROOT_PATH, SESSION_EXPIRED)
    }
}

/// Run the session guard. An unauthenticated session loses any stale
/// credential and the caller gets the redirect to return.
pub(crate) fn require_credential<V>(session: &mut Session) -> Result<Credential, Outcome<V>> {
    match ensure_authenticated(session, Utc::now()) {
        AuthResult::Authenticated(credential) => Ok(credential),
        AuthResult::Unauthenticated => {
            session.sign_out();
            Err(Outcome::session_expired())
        }
    }
}

/// Purge the user's cached library after a mutation went through.
pub(crate) async fn invalidate_cache(library: &dyn RemoteLibrary, credential: &Credential, operation: &str) {
    library.invalidate_cache(credential).await;
    tracing::debug!(operation, user_id = %credential.user_id, "Cache invalidated after mutation");
}
