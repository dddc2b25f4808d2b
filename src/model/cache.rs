//! Per-user cache of library snapshots to avoid repeated API calls

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::types::{PageResult, Playlist, ResourceKind};

/// What a cached snapshot was fetched for
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SnapshotKey {
    SavedPage { kind: ResourceKind, limit: u32, offset: i64 },
    AllPlaylists,
}

#[derive(Clone, Debug)]
pub enum Snapshot {
    Page(PageResult),
    Playlists(Vec<Playlist>),
}

#[derive(Clone, Debug)]
struct Entry {
    snapshot: Snapshot,
    stored_at: Instant,
}

/// Snapshots grouped by Spotify user id.
///
/// Entries are never patched in place; a mutation purges everything the
/// user has cached.
#[derive(Clone)]
pub struct LibraryCache {
    users: Arc<RwLock<HashMap<String, HashMap<SnapshotKey, Entry>>>>,
    ttl: Duration,
}

impl LibraryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// A live snapshot, if any. An expired entry found here is dropped.
    pub async fn get(&self, user_id: &str, key: &SnapshotKey) -> Option<Snapshot> {
        let mut users = self.users.write().await;
        let entries = users.get_mut(user_id)?;
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            return Some(entry.snapshot.clone());
        }

        entries.remove(key);
        if entries.is_empty() {
            users.remove(user_id);
        }
        None
    }

    /// Store a snapshot, dropping the user's entries that have expired.
    pub async fn put(&self, user_id: &str, key: SnapshotKey, snapshot: Snapshot) {
        let mut users = self.users.write().await;
        let entries = users.entry(user_id.to_string()).or_default();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        entries.insert(
            key,
            Entry {
                snapshot,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn clear_user(&self, user_id: &str) -> usize {
        let mut users = self.users.write().await;
        users.remove(user_id).map(|entries| entries.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub async fn len(&self, user_id: &str) -> usize {
        let users = self.users.read().await;
        users.get(user_id).map(HashMap::len).unwrap_or(0)
    }
}

impl Default for LibraryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_key(offset: i64) -> SnapshotKey {
        SnapshotKey::SavedPage {
            kind: ResourceKind::Show,
            limit: 5,
            offset,
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = LibraryCache::default();
        cache
            .put("alice", page_key(0), Snapshot::Page(PageResult { items: vec![], total: 7 }))
            .await;

        match cache.get("alice", &page_key(0)).await {
            Some(Snapshot::Page(page)) => assert_eq!(page.total, 7),
            other => panic!("unexpected snapshot: {:?}", other),
        }
        assert!(cache.get("alice", &page_key(5)).await.is_none());
        assert!(cache.get("bob", &page_key(0)).await.is_none());
    }

    #[tokio::test]
    async fn test_clear_user_only_touches_that_user() {
        let cache = LibraryCache::default();
        cache.put("alice", page_key(0), Snapshot::Playlists(vec![])).await;
        cache.put("alice", SnapshotKey::AllPlaylists, Snapshot::Playlists(vec![])).await;
        cache.put("bob", page_key(0), Snapshot::Playlists(vec![])).await;

        assert_eq!(cache.clear_user("alice").await, 2);
        assert_eq!(cache.len("alice").await, 0);
        assert_eq!(cache.len("bob").await, 1);
        assert_eq!(cache.clear_user("alice").await, 0);
    }

    #[tokio::test]
    async fn test_expired_entries_are_not_served() {
        let cache = LibraryCache::new(Duration::ZERO);
        cache.put("alice", SnapshotKey::AllPlaylists, Snapshot::Playlists(vec![])).await;

        assert!(cache.get("alice", &SnapshotKey::AllPlaylists).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped() {
        let cache = LibraryCache::new(Duration::ZERO);
        for offset in 0..1000 {
            cache
                .put("alice", page_key(offset * 5), Snapshot::Playlists(vec![]))
                .await;
        }
        assert_eq!(cache.len("alice").await, 1);

        assert!(cache.get("alice", &page_key(999 * 5)).await.is_none());
        assert_eq!(cache.len("alice").await, 0);
    }
}
