//! Contract for the remote library the controllers talk to

use async_trait::async_trait;

use super::error::LibraryResult;
use super::types::{Credential, PageResult, Playlist, ResourceKind};

/// Operations on a user's saved library, keyed by the session's credential.
///
/// Implementations own any response caching; callers only ever purge it
/// through [`RemoteLibrary::invalidate_cache`].
#[async_trait]
pub trait RemoteLibrary: Send + Sync {
    /// Fetch one page of the user's saved items of `kind`.
    async fn list_saved(
        &self,
        credential: &Credential,
        kind: ResourceKind,
        limit: u32,
        offset: i64,
    ) -> LibraryResult<PageResult>;

    async fn search(
        &self,
        credential: &Credential,
        kind: ResourceKind,
        query: &str,
        limit: u32,
        offset: i64,
    ) -> LibraryResult<PageResult>;

    async fn save(&self, credential: &Credential, kind: ResourceKind, ids: &[String]) -> LibraryResult<()>;

    async fn remove(&self, credential: &Credential, kind: ResourceKind, ids: &[String]) -> LibraryResult<()>;

    async fn update_visibility(&self, credential: &Credential, playlist_id: &str, public: bool) -> LibraryResult<()>;

    /// Every playlist in the user's library, in Spotify's order.
    async fn list_all_playlists(&self, credential: &Credential, skip_cache: bool) -> LibraryResult<Vec<Playlist>>;

    /// Drop every cached snapshot for the credential's user. Best-effort.
    async fn invalidate_cache(&self, credential: &Credential);
}
