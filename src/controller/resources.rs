//! List, search, save and remove for every resource kind
//!
//! The three kinds behave the same way and differ only in the data carried by
//! their [`KindDescriptor`].

use crate::model::{pagination::PageRequest, LibraryError, RemoteLibrary, ResourceKind};
use crate::session::Session;
use crate::view::{ListView, SearchView};

use super::{invalidate_cache, require_credential, Outcome};

/// Routes and wording for one resource kind
#[derive(Debug, PartialEq, Eq)]
pub struct KindDescriptor {
    pub kind: ResourceKind,
    /// Collection path, also where mutations redirect to
    pub path: &'static str,
    pub search_path: &'static str,
    /// Member path in router syntax
    pub member_path: &'static str,
    pub singular: &'static str,
    pub plural: &'static str,
    /// Capitalized singular used at the start of notices
    pub title: &'static str,
}

pub static EPISODES: KindDescriptor = KindDescriptor {
    kind: ResourceKind::Episode,
    path: "/saved_episodes",
    search_path: "/saved_episodes/search",
    member_path: "/saved_episodes/{id}",
    singular: "episode",
    plural: "episodes",
    title: "Episode",
};

pub static SHOWS: KindDescriptor = KindDescriptor {
    kind: ResourceKind::Show,
    path: "/saved_shows",
    search_path: "/saved_shows/search",
    member_path: "/saved_shows/{id}",
    singular: "show",
    plural: "shows",
    title: "Show",
};

pub static PLAYLISTS: KindDescriptor = KindDescriptor {
    kind: ResourceKind::Playlist,
    path: "/saved_playlists",
    search_path: "/saved_playlists/search",
    member_path: "/saved_playlists/{id}",
    singular: "playlist",
    plural: "playlists",
    title: "Playlist",
};

pub static KINDS: [&KindDescriptor; 3] = [&EPISODES, &SHOWS, &PLAYLISTS];

impl KindDescriptor {
    pub fn saved_notice(&self) -> String {
        format!("{} saved to your library.", self.title)
    }

    pub fn save_failed(&self) -> String {
        format!("Could not save {}.", self.singular)
    }

    pub fn removed_notice(&self) -> String {
        format!("{} removed from your library.", self.title)
    }

    pub fn remove_failed(&self) -> String {
        format!("Could not remove {}.", self.singular)
    }

    pub fn load_failed(&self) -> String {
        format!("Could not load saved {}.", self.plural)
    }

    pub fn search_failed(&self) -> String {
        format!("Could not search for {}.", self.plural)
    }
}

/// Library operations for one resource kind
pub struct ResourceHandler<'a> {
    library: &'a dyn RemoteLibrary,
    descriptor: &'static KindDescriptor,
}

impl<'a> ResourceHandler<'a> {
    pub fn new(library: &'a dyn RemoteLibrary, descriptor: &'static KindDescriptor) -> Self {
        Self { library, descriptor }
    }

    /// Saved items, one page at a time. A rejected token ends the session;
    /// any other failure renders an empty page with an error.
    pub async fn list(&self, session: &mut Session, page: Option<&str>) -> Outcome<ListView> {
        let credential = match require_credential(session) {
            Ok(credential) => credential,
            Err(outcome) => return outcome,
        };
        let kind = self.descriptor.kind;
        let request = PageRequest::from_param(page);

        let result = match request.offset() {
            Ok(offset) => self.library.list_saved(&credential, kind, request.limit(), offset).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(result) => {
                tracing::debug!(%kind, page = request.page, total = result.total, "Loaded saved items");
                Outcome::Render(ListView::from_page(kind, request.page, result, request.page_size))
            }
            Err(LibraryError::Unauthorized) => {
                tracing::warn!(%kind, user_id = %credential.user_id, "Token rejected while listing");
                session.sign_out();
                Outcome::session_expired()
            }
            Err(e) => {
                tracing::error!(%kind, error = %e, "Spotify error");
                Outcome::Render(ListView::failed(kind, request.page, self.descriptor.load_failed()))
            }
        }
    }

    /// Search results for `query`. Blank queries render nothing without
    /// asking Spotify. Every failure, a rejected token included, renders an
    /// empty result with an error.
    pub async fn search(&self, session: &mut Session, query: Option<&str>, page: Option<&str>) -> Outcome<SearchView> {
        let credential = match require_credential(session) {
            Ok(credential) => credential,
            Err(outcome) => return outcome,
        };
        let kind = self.descriptor.kind;
        let request = PageRequest::from_param(page);
        let mut view = SearchView::empty(kind, query.map(str::to_string), request.page);

        let Some(query) = query.filter(|q| !q.trim().is_empty()) else {
            return Outcome::Render(view);
        };

        let result = match request.offset() {
            Ok(offset) => self.library.search(&credential, kind, query, request.limit(), offset).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(result) => {
                tracing::info!(%kind, query, total = result.total, "Search completed successfully");
                let list = ListView::from_page(kind, request.page, result, request.page_size);
                view.items = list.items;
                view.total = list.total;
                view.total_pages = list.total_pages;
            }
            Err(e) => {
                tracing::error!(%kind, query, error = %e, "Spotify error");
                view.error = Some(self.descriptor.search_failed());
            }
        }
        Outcome::Render(view)
    }

    pub async fn create<V>(&self, session: &mut Session, id: Option<&str>) -> Outcome<V> {
        let credential = match require_credential(session) {
            Ok(credential) => credential,
            Err(outcome) => return outcome,
        };
        let descriptor = self.descriptor;

        let Some(id) = id.filter(|id| !id.is_empty()) else {
            tracing::warn!(kind = %descriptor.kind, "Save requested without an id");
            return Outcome::redirect_with_alert(descriptor.path, descriptor.save_failed());
        };

        match self.library.save(&credential, descriptor.kind, &[id.to_string()]).await {
            Ok(()) => {
                invalidate_cache(self.library, &credential, "save").await;
                Outcome::redirect_with_notice(descriptor.path, descriptor.saved_notice())
            }
            Err(e) => {
                tracing::error!(kind = %descriptor.kind, id, error = %e, "Spotify error");
                Outcome::redirect_with_alert(descriptor.path, descriptor.save_failed())
            }
        }
    }

    pub async fn destroy<V>(&self, session: &mut Session, id: &str) -> Outcome<V> {
        let credential = match require_credential(session) {
            Ok(credential) => credential,
            Err(outcome) => return outcome,
        };
        let descriptor = self.descriptor;

        if id.is_empty() {
            tracing::warn!(kind = %descriptor.kind, "Remove requested without an id");
            return Outcome::redirect_with_alert(descriptor.path, descriptor.remove_failed());
        }

        match self.library.remove(&credential, descriptor.kind, &[id.to_string()]).await {
            Ok(()) => {
                invalidate_cache(self.library, &credential, "remove").await;
                Outcome::redirect_with_notice(descriptor.path, descriptor.removed_notice())
            }
            Err(e) => {
                tracing::error!(kind = %descriptor.kind, id, error = %e, "Spotify error");
                Outcome::redirect_with_alert(descriptor.path, descriptor.remove_failed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::{always, eq};

    use crate::controller::test_support::{episode, expired, signed_in, MockLibrary};
    use crate::model::PageResult;
    use crate::session::{Flash, SESSION_EXPIRED};

    type Redirect = Outcome<()>;

    #[tokio::test]
    async fn test_list_renders_page() {
        let mut library = MockLibrary::new();
        library
            .expect_list_saved()
            .with(always(), eq(ResourceKind::Episode), eq(5), eq(0))
            .times(1)
            .returning(|_, _, _, _| Ok(PageResult { items: vec![episode("1")], total: 1 }));

        let mut session = signed_in();
        let outcome = ResourceHandler::new(&library, &EPISODES).list(&mut session, None).await;

        match outcome {
            Outcome::Render(view) => {
                assert_eq!(view.items, vec![episode("1")]);
                assert_eq!(view.total, 1);
                assert_eq!(view.total_pages, 1);
                assert_eq!(view.page, 1);
                assert!(view.error.is_none());
            }
            other => panic!("expected render, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_uses_page_offset() {
        let mut library = MockLibrary::new();
        library
            .expect_list_saved()
            .with(always(), eq(ResourceKind::Show), eq(5), eq(10))
            .times(1)
            .returning(|_, _, _, _| {
                Ok(PageResult {
                    items: vec![episode("11"), episode("12")],
                    total: 12,
                })
            });

        let mut session = signed_in();
        let outcome = ResourceHandler::new(&library, &SHOWS)
            .list(&mut session, Some("3"))
            .await;

        match outcome {
            Outcome::Render(view) => {
                assert_eq!(view.total_pages, 3);
                assert_eq!(view.items.len(), 2);
            }
            other => panic!("expected render, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_unauthorized_redirects_to_root() {
        let mut library = MockLibrary::new();
        library
            .expect_list_saved()
            .returning(|_, _, _, _| Err(LibraryError::Unauthorized));

        let mut session = signed_in();
        let outcome = ResourceHandler::new(&library, &EPISODES).list(&mut session, None).await;

        assert_eq!(
            outcome,
            Outcome::Redirect {
                location: "/".to_string(),
                flash: Some(Flash::Alert(SESSION_EXPIRED.to_string())),
            }
        );
        assert!(session.credential.is_none());
    }

    #[tokio::test]
    async fn test_list_generic_error_renders_empty_page() {
        let mut library = MockLibrary::new();
        library
            .expect_list_saved()
            .returning(|_, _, _, _| Err(LibraryError::api("Error")));

        let mut session = signed_in();
        let outcome = ResourceHandler::new(&library, &SHOWS).list(&mut session, None).await;

        match outcome {
            Outcome::Render(view) => {
                assert!(view.items.is_empty());
                assert_eq!(view.total, 0);
                assert_eq!(view.total_pages, 0);
                assert_eq!(view.error.as_deref(), Some("Could not load saved shows."));
            }
            other => panic!("expected render, got {:?}", other),
        }
        assert!(session.credential.is_some());
    }

    #[tokio::test]
    async fn test_expired_session_never_reaches_library() {
        let library = MockLibrary::new();
        let handler = ResourceHandler::new(&library, &EPISODES);

        let mut session = expired();
        assert_eq!(handler.list(&mut session, None).await, Outcome::session_expired());
        assert!(session.credential.is_none());

        let mut session = expired();
        let outcome: Redirect = handler.create(&mut session, Some("1")).await;
        assert_eq!(outcome, Outcome::session_expired());
    }

    #[tokio::test]
    async fn test_search_without_query_skips_remote() {
        let library = MockLibrary::new();
        let handler = ResourceHandler::new(&library, &EPISODES);

        for query in [None, Some(""), Some("   ")] {
            let mut session = signed_in();
            match handler.search(&mut session, query, None).await {
                Outcome::Render(view) => {
                    assert!(view.items.is_empty());
                    assert!(view.error.is_none());
                }
                other => panic!("expected render, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_search_renders_matches() {
        let mut library = MockLibrary::new();
        library
            .expect_search()
            .withf(|_, kind, query, limit, offset| {
                *kind == ResourceKind::Episode && query == "query" && *limit == 5 && *offset == 5
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(PageResult { items: vec![episode("1")], total: 6 }));

        let mut session = signed_in();
        let outcome = ResourceHandler::new(&library, &EPISODES)
            .search(&mut session, Some("query"), Some("2"))
            .await;

        match outcome {
            Outcome::Render(view) => {
                assert_eq!(view.query.as_deref(), Some("query"));
                assert_eq!(view.items, vec![episode("1")]);
                assert_eq!(view.total_pages, 2);
            }
            other => panic!("expected render, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_unauthorized_is_treated_as_failure() {
        let mut library = MockLibrary::new();
        library
            .expect_search()
            .returning(|_, _, _, _, _| Err(LibraryError::Unauthorized));

        let mut session = signed_in();
        let outcome = ResourceHandler::new(&library, &SHOWS)
            .search(&mut session, Some("query"), None)
            .await;

        match outcome {
            Outcome::Render(view) => {
                assert!(view.items.is_empty());
                assert_eq!(view.total, 0);
                assert_eq!(view.error.as_deref(), Some("Could not search for shows."));
            }
            other => panic!("expected render, got {:?}", other),
        }
        assert!(session.credential.is_some());
    }

    #[tokio::test]
    async fn test_unaddressable_page_renders_failure() {
        let mut library = MockLibrary::new();
        library.expect_list_saved().times(0);
        library.expect_search().times(0);
        let handler = ResourceHandler::new(&library, &EPISODES);

        let mut session = signed_in();
        match handler.list(&mut session, Some("99999999999999999999")).await {
            Outcome::Render(view) => {
                assert!(view.items.is_empty());
                assert_eq!(view.error.as_deref(), Some("Could not load saved episodes."));
            }
            other => panic!("expected render, got {:?}", other),
        }
        assert!(session.credential.is_some());

        match handler
            .search(&mut session, Some("query"), Some("99999999999999999999"))
            .await
        {
            Outcome::Render(view) => {
                assert!(view.items.is_empty());
                assert_eq!(view.error.as_deref(), Some("Could not search for episodes."));
            }
            other => panic!("expected render, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_unauthorized_is_treated_as_failure() {
        let mut library = MockLibrary::new();
        library
            .expect_save()
            .returning(|_, _, _| Err(LibraryError::Unauthorized));
        library.expect_invalidate_cache().times(0);

        let mut session = signed_in();
        let outcome: Redirect = ResourceHandler::new(&library, &PLAYLISTS)
            .create(&mut session, Some("1"))
            .await;

        assert_eq!(
            outcome,
            Outcome::redirect_with_alert("/saved_playlists", "Could not save playlist.")
        );
        assert!(session.credential.is_some());
    }

    #[tokio::test]
    async fn test_destroy_unauthorized_is_treated_as_failure() {
        let mut library = MockLibrary::new();
        library
            .expect_remove()
            .returning(|_, _, _| Err(LibraryError::Unauthorized));
        library.expect_invalidate_cache().times(0);

        let mut session = signed_in();
        let outcome: Redirect = ResourceHandler::new(&library, &EPISODES)
            .destroy(&mut session, "1")
            .await;

        assert_eq!(
            outcome,
            Outcome::redirect_with_alert("/saved_episodes", "Could not remove episode.")
        );
        assert!(session.credential.is_some());
    }

    #[tokio::test]
    async fn test_create_invalidates_cache_once() {
        let mut library = MockLibrary::new();
        let mut seq = mockall::Sequence::new();
        library
            .expect_save()
            .withf(|_, kind, ids| *kind == ResourceKind::Episode && ids == ["1".to_string()])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        library
            .expect_invalidate_cache()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ());

        let mut session = signed_in();
        let outcome: Redirect = ResourceHandler::new(&library, &EPISODES)
            .create(&mut session, Some("1"))
            .await;

        assert_eq!(
            outcome,
            Outcome::redirect_with_notice("/saved_episodes", "Episode saved to your library.")
        );
    }

    #[tokio::test]
    async fn test_create_failure_leaves_cache_alone() {
        let mut library = MockLibrary::new();
        library
            .expect_save()
            .returning(|_, _, _| Err(LibraryError::api("Error")));
        library.expect_invalidate_cache().times(0);

        let mut session = signed_in();
        let outcome: Redirect = ResourceHandler::new(&library, &SHOWS)
            .create(&mut session, Some("1"))
            .await;

        assert_eq!(outcome, Outcome::redirect_with_alert("/saved_shows", "Could not save show."));
    }

    #[tokio::test]
    async fn test_create_without_id_fails_without_remote_call() {
        let library = MockLibrary::new();

        let mut session = signed_in();
        let outcome: Redirect = ResourceHandler::new(&library, &EPISODES)
            .create(&mut session, None)
            .await;

        assert_eq!(outcome, Outcome::redirect_with_alert("/saved_episodes", "Could not save episode."));
    }

    #[tokio::test]
    async fn test_destroy_invalidates_cache_once() {
        let mut library = MockLibrary::new();
        library
            .expect_remove()
            .withf(|_, kind, ids| *kind == ResourceKind::Show && ids == ["1".to_string()])
            .times(1)
            .returning(|_, _, _| Ok(()));
        library.expect_invalidate_cache().times(1).returning(|_| ());

        let mut session = signed_in();
        let outcome: Redirect = ResourceHandler::new(&library, &SHOWS)
            .destroy(&mut session, "1")
            .await;

        assert_eq!(
            outcome,
            Outcome::redirect_with_notice("/saved_shows", "Show removed from your library.")
        );
    }

    #[tokio::test]
    async fn test_destroy_failure_alerts_and_keeps_cache() {
        let mut library = MockLibrary::new();
        library
            .expect_remove()
            .returning(|_, _, _| Err(LibraryError::api("Error")));
        library.expect_invalidate_cache().times(0);

        let mut session = signed_in();
        let outcome: Redirect = ResourceHandler::new(&library, &EPISODES)
            .destroy(&mut session, "1")
            .await;

        assert_eq!(
            outcome,
            Outcome::redirect_with_alert("/saved_episodes", "Could not remove episode.")
        );
    }

    #[test]
    fn test_descriptor_wording() {
        assert_eq!(PLAYLISTS.kind, ResourceKind::Playlist);
        assert_eq!(PLAYLISTS.saved_notice(), "Playlist saved to your library.");
        assert_eq!(EPISODES.load_failed(), "Could not load saved episodes.");
        assert_eq!(SHOWS.search_failed(), "Could not search for shows.");
        assert!(KINDS.iter().all(|d| d.member_path.starts_with(d.path)));
    }
}
