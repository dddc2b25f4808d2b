//! Core type definitions for the saved library

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kinds of resource a user can keep in their library
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Episode,
    Show,
    Playlist,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Episode => "episode",
            Self::Show => "show",
            Self::Playlist => "playlist",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access token for the Spotify Web API, scoped to one signed-in user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    /// Spotify user id of the account the token was issued for
    pub user_id: String,
}

impl Credential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A podcast episode
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Episode {
    pub id: String,
    pub name: String,
    pub show_name: String,
    pub release_date: String,
    pub duration_ms: u32,
}

/// A podcast show
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Show {
    pub id: String,
    pub name: String,
    pub publisher: String,
    pub description: String,
}

/// A playlist, owned by exactly one Spotify user
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    /// Display name of the owner
    pub owner: String,
    pub owner_id: String,
    pub public: bool,
    pub tracks_total: u32,
    pub image_url: Option<String>,
    pub spotify_url: Option<String>,
}

/// Any item that can appear in a library page
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Episode(Episode),
    Show(Show),
    Playlist(Playlist),
}

/// One page of results as returned by the remote API
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PageResult {
    pub items: Vec<Resource>,
    pub total: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_credential_expiry() {
        let now = Utc::now();
        let credential = Credential {
            access_token: "token".to_string(),
            expires_at: now + Duration::hours(1),
            user_id: "user".to_string(),
        };

        assert!(!credential.is_expired(now));
        assert!(credential.is_expired(now + Duration::hours(1)));
    }

    #[test]
    fn test_resource_serializes_with_kind_tag() {
        let resource = Resource::Show(Show {
            id: "1".to_string(),
            name: "Show 1".to_string(),
            publisher: "Publisher".to_string(),
            description: String::new(),
        });

        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["kind"], "show");
        assert_eq!(json["name"], "Show 1");
        assert_eq!(json["id"], "1");
    }
}
