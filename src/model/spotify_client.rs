//! Spotify Web API backed implementation of the remote library

use std::collections::{HashMap, HashSet};
use async_trait::async_trait;
use futures::TryStreamExt;
use rspotify::{
    model::{
        EpisodeId, FullEpisode, PlaylistId, SearchResult, SearchType, ShowId,
        SimplifiedEpisode, SimplifiedPlaylist, SimplifiedShow,
    },
    prelude::*,
    AuthCodeSpotify, Config, Token,
};
use serde::Deserialize;
use serde_json::json;

use super::cache::{LibraryCache, Snapshot, SnapshotKey};
use super::error::{LibraryError, LibraryResult};
use super::library::RemoteLibrary;
use super::types::{Credential, Episode, PageResult, Playlist, Resource, ResourceKind, Show};

/// Saved episodes are not wrapped by rspotify, so the raw page is decoded here
#[derive(Deserialize)]
struct SavedEpisodePage {
    items: Vec<SavedEpisodeItem>,
    total: u32,
}

#[derive(Deserialize)]
struct SavedEpisodeItem {
    episode: FullEpisode,
}

/// Remote library talking to Spotify, with a per-user snapshot cache
#[derive(Clone)]
pub struct SpotifyLibrary {
    cache: LibraryCache,
}

impl SpotifyLibrary {
    pub fn new(cache: LibraryCache) -> Self {
        Self { cache }
    }

    /// Build a client that uses the session's token as-is. Refreshing is
    /// left to the sign-in flow, so an expired token surfaces as a 401.
    async fn client_for(&self, credential: &Credential) -> LibraryResult<AuthCodeSpotify> {
        let spotify = AuthCodeSpotify::with_config(
            Default::default(),
            Default::default(),
            Config {
                token_cached: false,
                token_refreshing: false,
                ..Default::default()
            },
        );

        let token = Token {
            access_token: credential.access_token.clone(),
            expires_in: credential.expires_at - chrono::Utc::now(),
            expires_at: Some(credential.expires_at),
            scopes: HashSet::new(),
            refresh_token: None,
        };

        *spotify
            .token
            .lock()
            .await
            .map_err(|_| LibraryError::api("Spotify token lock unavailable"))? = Some(token);
        Ok(spotify)
    }

    async fn fetch_saved(
        &self,
        client: &AuthCodeSpotify,
        kind: ResourceKind,
        limit: u32,
        offset: u32,
    ) -> LibraryResult<PageResult> {
        match kind {
            ResourceKind::Episode => {
                let limit = limit.to_string();
                let offset = offset.to_string();
                let query = HashMap::from([("limit", limit.as_str()), ("offset", offset.as_str())]);
                let body = client.api_get("me/episodes", &query).await?;
                let page: SavedEpisodePage = serde_json::from_str(&body)?;

                Ok(PageResult {
                    items: page
                        .items
                        .into_iter()
                        .map(|saved| Resource::Episode(full_episode(saved.episode)))
                        .collect(),
                    total: page.total,
                })
            }
            ResourceKind::Show => {
                let page = client.get_saved_show_manual(Some(limit), Some(offset)).await?;
                Ok(PageResult {
                    items: page
                        .items
                        .into_iter()
                        .map(|saved| Resource::Show(simplified_show(saved.show)))
                        .collect(),
                    total: page.total,
                })
            }
            ResourceKind::Playlist => {
                let page = client
                    .current_user_playlists_manual(Some(limit), Some(offset))
                    .await?;
                Ok(PageResult {
                    items: page
                        .items
                        .into_iter()
                        .map(|p| Resource::Playlist(simplified_playlist(p)))
                        .collect(),
                    total: page.total,
                })
            }
        }
    }
}

#[async_trait]
impl RemoteLibrary for SpotifyLibrary {
    async fn list_saved(
        &self,
        credential: &Credential,
        kind: ResourceKind,
        limit: u32,
        offset: i64,
    ) -> LibraryResult<PageResult> {
        let key = SnapshotKey::SavedPage { kind, limit, offset };
        if let Some(Snapshot::Page(page)) = self.cache.get(&credential.user_id, &key).await {
            tracing::debug!(%kind, offset, "Serving saved page from cache");
            return Ok(page);
        }

        let offset_param = api_offset(offset)?;
        crate::log_api_request!("list_saved", kind = %kind, limit, offset);
        let client = self.client_for(credential).await?;
        let result = self.fetch_saved(&client, kind, limit, offset_param).await;
        crate::log_api_result!("list_saved", result);

        let page = result?;
        self.cache
            .put(&credential.user_id, key, Snapshot::Page(page.clone()))
            .await;
        Ok(page)
    }

    async fn search(
        &self,
        credential: &Credential,
        kind: ResourceKind,
        query: &str,
        limit: u32,
        offset: i64,
    ) -> LibraryResult<PageResult> {
        let offset = api_offset(offset)?;
        let search_type = match kind {
            ResourceKind::Episode => SearchType::Episode,
            ResourceKind::Show => SearchType::Show,
            ResourceKind::Playlist => SearchType::Playlist,
        };

        crate::log_api_request!("search", kind = %kind, query, limit, offset);
        let client = self.client_for(credential).await?;
        // Market is left unset so Spotify uses the account's country
        let result = client
            .search(query, search_type, None, None, Some(limit), Some(offset))
            .await;
        crate::log_api_result!("search", result);

        let page = match result? {
            SearchResult::Episodes(page) => PageResult {
                total: page.total,
                items: page
                    .items
                    .into_iter()
                    .map(|e| Resource::Episode(simplified_episode(e)))
                    .collect(),
            },
            SearchResult::Shows(page) => PageResult {
                total: page.total,
                items: page
                    .items
                    .into_iter()
                    .map(|s| Resource::Show(simplified_show(s)))
                    .collect(),
            },
            SearchResult::Playlists(page) => PageResult {
                total: page.total,
                items: page
                    .items
                    .into_iter()
                    .map(|p| Resource::Playlist(simplified_playlist(p)))
                    .collect(),
            },
            _ => return Err(LibraryError::api("unexpected search result type")),
        };
        Ok(page)
    }

    async fn save(&self, credential: &Credential, kind: ResourceKind, ids: &[String]) -> LibraryResult<()> {
        tracing::debug!(%kind, ?ids, "API: save");
        let client = self.client_for(credential).await?;

        match kind {
            ResourceKind::Episode => {
                let ids = ids
                    .iter()
                    .map(|id| EpisodeId::from_id(id.as_str()).map(|id| id.id().to_string()))
                    .collect::<Result<Vec<_>, _>>()?;
                client.api_put("me/episodes", &json!({ "ids": ids })).await?;
            }
            ResourceKind::Show => {
                let ids = ids
                    .iter()
                    .map(|id| ShowId::from_id(id.as_str()))
                    .collect::<Result<Vec<_>, _>>()?;
                client.save_shows(ids).await?;
            }
            ResourceKind::Playlist => {
                for id in ids {
                    client.playlist_follow(PlaylistId::from_id(id.as_str())?, None).await?;
                }
            }
        }

        tracing::info!(%kind, count = ids.len(), "Saved to library");
        Ok(())
    }

    async fn remove(&self, credential: &Credential, kind: ResourceKind, ids: &[String]) -> LibraryResult<()> {
        tracing::debug!(%kind, ?ids, "API: remove");
        let client = self.client_for(credential).await?;

        match kind {
            ResourceKind::Episode => {
                let ids = ids
                    .iter()
                    .map(|id| EpisodeId::from_id(id.as_str()).map(|id| id.id().to_string()))
                    .collect::<Result<Vec<_>, _>>()?;
                client.api_delete("me/episodes", &json!({ "ids": ids })).await?;
            }
            ResourceKind::Show => {
                let ids = ids
                    .iter()
                    .map(|id| ShowId::from_id(id.as_str()))
                    .collect::<Result<Vec<_>, _>>()?;
                client.remove_users_saved_shows(ids, None).await?;
            }
            ResourceKind::Playlist => {
                for id in ids {
                    client.playlist_unfollow(PlaylistId::from_id(id.as_str())?).await?;
                }
            }
        }

        tracing::info!(%kind, count = ids.len(), "Removed from library");
        Ok(())
    }

    async fn update_visibility(&self, credential: &Credential, playlist_id: &str, public: bool) -> LibraryResult<()> {
        tracing::debug!(playlist_id, public, "API: playlist_change_detail");
        let client = self.client_for(credential).await?;
        let id = PlaylistId::from_id(playlist_id)?;
        let result = client
            .playlist_change_detail(id, None, Some(public), None, None)
            .await;
        crate::log_api_result!("update_visibility", result);
        result?;
        Ok(())
    }

    async fn list_all_playlists(&self, credential: &Credential, skip_cache: bool) -> LibraryResult<Vec<Playlist>> {
        if !skip_cache {
            if let Some(Snapshot::Playlists(playlists)) =
                self.cache.get(&credential.user_id, &SnapshotKey::AllPlaylists).await
            {
                tracing::debug!(count = playlists.len(), "Serving playlists from cache");
                return Ok(playlists);
            }
        }

        crate::log_api_request!("list_all_playlists", skip_cache);
        let client = self.client_for(credential).await?;
        let result: Result<Vec<_>, _> = client.current_user_playlists().try_collect().await;
        crate::log_api_result!("list_all_playlists", result);

        let playlists: Vec<Playlist> = result?.into_iter().map(simplified_playlist).collect();
        self.cache
            .put(
                &credential.user_id,
                SnapshotKey::AllPlaylists,
                Snapshot::Playlists(playlists.clone()),
            )
            .await;
        Ok(playlists)
    }

    async fn invalidate_cache(&self, credential: &Credential) {
        let purged = self.cache.clear_user(&credential.user_id).await;
        tracing::debug!(user_id = %credential.user_id, purged, "Library cache invalidated");
    }
}

/// Spotify rejects negative offsets, so they are reported like any other API failure
fn api_offset(offset: i64) -> LibraryResult<u32> {
    u32::try_from(offset).map_err(|_| LibraryError::Api(format!("invalid offset: {}", offset)))
}

fn full_episode(episode: FullEpisode) -> Episode {
    Episode {
        id: episode.id.id().to_string(),
        name: episode.name,
        show_name: episode.show.name,
        release_date: episode.release_date,
        duration_ms: episode.duration.num_milliseconds() as u32,
    }
}

fn simplified_episode(episode: SimplifiedEpisode) -> Episode {
    Episode {
        id: episode.id.id().to_string(),
        name: episode.name,
        show_name: String::new(),
        release_date: episode.release_date,
        duration_ms: episode.duration.num_milliseconds() as u32,
    }
}

fn simplified_show(show: SimplifiedShow) -> Show {
    Show {
        id: show.id.id().to_string(),
        name: show.name,
        publisher: show.publisher,
        description: show.description,
    }
}

fn simplified_playlist(playlist: SimplifiedPlaylist) -> Playlist {
    Playlist {
        id: playlist.id.id().to_string(),
        owner: playlist
            .owner
            .display_name
            .clone()
            .unwrap_or_else(|| playlist.owner.id.id().to_string()),
        owner_id: playlist.owner.id.id().to_string(),
        name: playlist.name,
        public: playlist.public.unwrap_or(false),
        tracks_total: playlist.tracks.total,
        image_url: playlist.images.first().map(|image| image.url.clone()),
        spotify_url: playlist.external_urls.get("spotify").cloned(),
    }
}
