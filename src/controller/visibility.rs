//! Library view and owner-only playlist visibility changes

use crate::model::{LibraryError, RemoteLibrary};
use crate::session::Session;
use crate::view::{LibraryView, PlaylistRow, VisibilityControl};

use super::{invalidate_cache, require_credential, Outcome};

pub const LIBRARY_PATH: &str = "/library";

pub const NOT_OWNER: &str = "You can only change visibility for playlists you own.";

const LOAD_FAILED: &str = "Could not load playlists.";
const UPDATE_FAILED: &str = "Could not update playlist visibility.";

/// Library location that tells the next read to skip cached playlists
pub fn refreshed_library_path() -> String {
    format!("{}?refresh_playlists=1", LIBRARY_PATH)
}

/// Every playlist in the library, with visibility controls on the ones the
/// user owns. Owners seen here are remembered in the session for
/// [`set_visibility`].
pub async fn library_view(library: &dyn RemoteLibrary, session: &mut Session, refresh: bool) -> Outcome<LibraryView> {
    let credential = match require_credential(session) {
        Ok(credential) => credential,
        Err(outcome) => return outcome,
    };

    match library.list_all_playlists(&credential, refresh).await {
        Ok(playlists) => {
            session.playlist_owners = playlists
                .iter()
                .map(|p| (p.id.clone(), p.owner_id.clone()))
                .collect();

            let playlists = playlists
                .into_iter()
                .map(|playlist| PlaylistRow {
                    visibility_control: (playlist.owner_id == credential.user_id)
                        .then(|| VisibilityControl::for_playlist(&playlist)),
                    playlist,
                })
                .collect();

            Outcome::Render(LibraryView {
                playlists,
                refreshed: refresh,
                error: None,
            })
        }
        Err(LibraryError::Unauthorized) => {
            tracing::warn!(user_id = %credential.user_id, "Token rejected while loading library");
            session.sign_out();
            Outcome::session_expired()
        }
        Err(e) => {
            tracing::error!(error = %e, "Spotify error");
            Outcome::Render(LibraryView {
                playlists: Vec::new(),
                refreshed: refresh,
                error: Some(LOAD_FAILED.to_string()),
            })
        }
    }
}

/// Make a playlist public or private.
///
/// The caller's ownership claim must name the signed-in user and, when the
/// library view has recorded the playlist's owner, that owner as well.
/// Ownership is not re-fetched from Spotify.
pub async fn set_visibility<V>(
    library: &dyn RemoteLibrary,
    session: &mut Session,
    playlist_id: &str,
    requested_public: bool,
    claimed_owner_id: Option<&str>,
) -> Outcome<V> {
    let credential = match require_credential(session) {
        Ok(credential) => credential,
        Err(outcome) => return outcome,
    };

    if !claim_matches(session, &credential.user_id, playlist_id, claimed_owner_id) {
        tracing::warn!(
            playlist_id,
            user_id = %credential.user_id,
            claimed_owner_id,
            "Visibility change rejected for non-owner"
        );
        return Outcome::redirect_with_alert(LIBRARY_PATH, NOT_OWNER);
    }

    match library
        .update_visibility(&credential, playlist_id, requested_public)
        .await
    {
        Ok(()) => {
            invalidate_cache(library, &credential, "update_visibility").await;
            let notice = if requested_public {
                "Playlist added to profile."
            } else {
                "Playlist removed from profile."
            };
            Outcome::redirect_with_notice(refreshed_library_path(), notice)
        }
        Err(e) => {
            tracing::error!(playlist_id, error = %e, "Spotify error");
            Outcome::redirect_with_alert(LIBRARY_PATH, UPDATE_FAILED)
        }
    }
}

fn claim_matches(session: &Session, user_id: &str, playlist_id: &str, claimed_owner_id: Option<&str>) -> bool {
    let Some(claimed) = claimed_owner_id else {
        return false;
    };
    if claimed != user_id {
        return false;
    }
    session
        .playlist_owners
        .get(playlist_id)
        .is_none_or(|known| known == claimed)
}

/// Read a form boolean: empty, "0", "f", "false" and "off" are false,
/// anything else is true.
pub fn parse_bool_param(raw: Option<&str>) -> bool {
    match raw.map(|s| s.trim().to_ascii_lowercase()) {
        None => false,
        Some(value) => !matches!(value.as_str(), "" | "0" | "f" | "false" | "off"),
    }
}
