//! View module - JSON documents rendered for each page
//!
//! Handlers produce one of the view structs below; the router wraps it in a
//! [`Rendered`] together with whatever flash message the session was holding.

use serde::Serialize;

use crate::model::{pagination::to_page_count, PageResult, Playlist, Resource, ResourceKind};
use crate::session::Flash;

/// A saved-items listing
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListView {
    pub kind: ResourceKind,
    pub page: i64,
    pub items: Vec<Resource>,
    pub total: u32,
    pub total_pages: u32,
    pub error: Option<String>,
}

/// Search results for one resource kind
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchView {
    pub kind: ResourceKind,
    pub query: Option<String>,
    pub page: i64,
    pub items: Vec<Resource>,
    pub total: u32,
    pub total_pages: u32,
    pub error: Option<String>,
}

/// Form the library page shows next to a playlist the user owns
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VisibilityControl {
    pub action: String,
    /// Current visibility, "Public" or "Private"
    pub label: &'static str,
    pub owner_id: String,
    /// Value submitted to flip the current visibility
    pub public: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlaylistRow {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub visibility_control: Option<VisibilityControl>,
}

/// All playlists in the user's library
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LibraryView {
    pub playlists: Vec<PlaylistRow>,
    pub refreshed: bool,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HomeView {
    pub signed_in: bool,
    pub user_id: Option<String>,
    pub login_path: &'static str,
}

/// A view plus the flash consumed while rendering it
#[derive(Debug, Serialize)]
pub struct Rendered<V: Serialize> {
    #[serde(flatten)]
    pub view: V,
    pub notice: Option<String>,
    pub alert: Option<String>,
}

impl<V: Serialize> Rendered<V> {
    pub fn new(view: V, flash: Option<Flash>) -> Self {
        let (notice, alert) = match flash {
            Some(Flash::Notice(message)) => (Some(message), None),
            Some(Flash::Alert(message)) => (None, Some(message)),
            None => (None, None),
        };
        Self { view, notice, alert }
    }
}

impl ListView {
    pub fn from_page(kind: ResourceKind, page: i64, result: PageResult, page_size: u32) -> Self {
        Self {
            kind,
            page,
            total_pages: to_page_count(result.total, page_size),
            total: result.total,
            items: result.items,
            error: None,
        }
    }

    /// Empty listing shown when the remote call failed
    pub fn failed(kind: ResourceKind, page: i64, error: String) -> Self {
        Self {
            kind,
            page,
            items: Vec::new(),
            total: 0,
            total_pages: 0,
            error: Some(error),
        }
    }
}

impl SearchView {
    pub fn empty(kind: ResourceKind, query: Option<String>, page: i64) -> Self {
        Self {
            kind,
            query,
            page,
            items: Vec::new(),
            total: 0,
            total_pages: 0,
            error: None,
        }
    }
}

impl VisibilityControl {
    pub fn for_playlist(playlist: &Playlist) -> Self {
        Self {
            action: visibility_path(&playlist.id),
            label: if playlist.public { "Public" } else { "Private" },
            owner_id: playlist.owner_id.clone(),
            public: !playlist.public,
        }
    }
}

pub fn visibility_path(playlist_id: &str) -> String {
    format!("/playlists/{}/visibility", playlist_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(public: bool) -> Playlist {
        Playlist {
            id: "pl1".to_string(),
            name: "My Playlist".to_string(),
            owner: "Me".to_string(),
            owner_id: "spotify-uid-123".to_string(),
            public,
            tracks_total: 3,
            image_url: None,
            spotify_url: None,
        }
    }

    #[test]
    fn test_visibility_label_follows_current_state() {
        let private = VisibilityControl::for_playlist(&playlist(false));
        assert_eq!(private.label, "Private");
        assert_eq!(private.action, "/playlists/pl1/visibility");
        assert!(private.public);

        let public = VisibilityControl::for_playlist(&playlist(true));
        assert_eq!(public.label, "Public");
        assert!(!public.public);
    }

    #[test]
    fn test_rendered_flattens_view_and_flash() {
        let rendered = Rendered::new(
            ListView::failed(ResourceKind::Episode, 1, "Could not load saved episodes.".to_string()),
            Some(Flash::Notice("Episode saved to your library.".to_string())),
        );
        let json = serde_json::to_value(&rendered).unwrap();

        assert_eq!(json["kind"], "episode");
        assert_eq!(json["total_pages"], 0);
        assert_eq!(json["notice"], "Episode saved to your library.");
        assert!(json["alert"].is_null());
    }

    #[test]
    fn test_last_page_holds_remainder() {
        let items: Vec<Resource> = (0..2)
            .map(|i| {
                Resource::Playlist(Playlist {
                    id: format!("pl{}", i),
                    ..playlist(false)
                })
            })
            .collect();
        let view = ListView::from_page(ResourceKind::Playlist, 3, PageResult { items, total: 12 }, 5);

        assert_eq!(view.total_pages, 3);
        assert_eq!(view.items.len(), 2);
    }
}
