use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cache::ReviewCache;
use crate::error::Error;
use crate::review::{Review, sort_newest_first};
use crate::sources::local::LocalSource;
use crate::sources::{ReviewSource, SourceKind};
use crate::store::KeyValueStore;

const OFFLINE_BANNER: &str =
    "Unable to load the latest reviews right now. Showing previously saved reviews.";
const EMPTY_BANNER: &str = "Unable to load reviews right now. Please try again later.";

/// What the loader knows at each step. Consumers replace their view with
/// every event; the last one wins.
#[derive(Debug)]
pub enum LoadEvent {
    /// Cache entry still inside its validity window, shown before the fetch.
    Cached(Vec<Review>),
    Fresh(Vec<Review>),
    Failed {
        error: Error,
        fallback: Vec<Review>,
        banner: String,
    },
}

impl LoadEvent {
    pub fn reviews(&self) -> &[Review] {
        match self {
            LoadEvent::Cached(reviews) | LoadEvent::Fresh(reviews) => reviews,
            LoadEvent::Failed { fallback, .. } => fallback,
        }
    }
}

/// Stale-while-revalidate loading over a source, its cache and the local store.
pub struct ReviewLoader<'a, S> {
    source: &'a dyn ReviewSource,
    cache: &'a ReviewCache<S>,
    local: &'a LocalSource<S>,
}

impl<'a, S: KeyValueStore> ReviewLoader<'a, S> {
    pub fn new(
        source: &'a dyn ReviewSource,
        cache: &'a ReviewCache<S>,
        local: &'a LocalSource<S>,
    ) -> Self {
        Self {
            source,
            cache,
            local,
        }
    }

    pub fn load(&self, now: DateTime<Utc>, mut on_event: impl FnMut(LoadEvent)) {
        if self.source.kind() == SourceKind::Local {
            match self.source.fetch_reviews() {
                Ok(reviews) => on_event(LoadEvent::Fresh(reviews)),
                Err(error) => {
                    warn!(error = %error, "failed to read local reviews");
                    on_event(LoadEvent::Failed {
                        error,
                        fallback: Vec::new(),
                        banner: EMPTY_BANNER.to_string(),
                    });
                }
            }
            return;
        }

        let pending = self.pending();
        if let Some(cached) = self.cache.get_cached(now) {
            on_event(LoadEvent::Cached(merge_pending(cached, &pending)));
        }

        match self.source.fetch_reviews() {
            Ok(fetched) => {
                if let Err(e) = self.cache.put_cache(&fetched, now) {
                    warn!(error = %e, "failed to store review cache");
                }
                info!(count = fetched.len(), source = %self.source.kind(), "loaded reviews");
                on_event(LoadEvent::Fresh(merge_pending(fetched, &pending)));
            }
            Err(error) => {
                warn!(error = %error, "review fetch failed, falling back");
                let (fallback, banner) = self.fallback();
                on_event(LoadEvent::Failed {
                    error,
                    fallback: merge_pending(fallback, &pending),
                    banner: banner.to_string(),
                });
            }
        }
    }

    /// Run [`load`](Self::load) and keep only the final event.
    pub fn load_latest(&self, now: DateTime<Utc>) -> Option<LoadEvent> {
        let mut last = None;
        self.load(now, |event| last = Some(event));
        last
    }

    fn pending(&self) -> Vec<Review> {
        self.local.pending_reviews().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read pending reviews");
            Vec::new()
        })
    }

    fn fallback(&self) -> (Vec<Review>, &'static str) {
        if let Some(stale) = self.cache.get_stale() {
            debug!(count = stale.len(), "using stale review cache");
            return (stale, OFFLINE_BANNER);
        }
        match self.local.stored_reviews() {
            Ok(local) if !local.is_empty() => {
                debug!(count = local.len(), "using local reviews");
                (local, OFFLINE_BANNER)
            }
            Ok(_) => (Vec::new(), EMPTY_BANNER),
            Err(e) => {
                warn!(error = %e, "local fallback unavailable");
                (Vec::new(), EMPTY_BANNER)
            }
        }
    }
}

/// Add pending local submissions the fetched list does not already hold.
/// A fetched record with the same name and content counts as the same review.
pub fn merge_pending(fetched: Vec<Review>, pending: &[Review]) -> Vec<Review> {
    let mut merged: Vec<Review> = pending
        .iter()
        .filter(|p| {
            !fetched
                .iter()
                .any(|f| f.name == p.name && f.content.trim() == p.content.trim())
        })
        .cloned()
        .collect();
    merged.extend(fetched);
    sort_newest_first(&mut merged);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachePolicy;
    use crate::review::fixtures::review;
    use crate::sources::github::GitHubSource;
    use crate::sources::github::tests::{MockHttpClient, issue_json, remote_config};
    use crate::sources::local::LOCAL_KEY;
    use crate::store::{FileStore, KeyValueStore};
    use chrono::{TimeDelta, TimeZone};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        cache: ReviewCache<FileStore>,
        local: LocalSource<FileStore>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        Fixture {
            cache: ReviewCache::new(store.clone(), CachePolicy::default()),
            local: LocalSource::new(store),
            dir,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap()
    }

    fn remote(responses: Vec<crate::error::Result<String>>) -> GitHubSource {
        GitHubSource::with_client(&remote_config(), Box::new(MockHttpClient::new(responses)))
            .unwrap()
    }

    fn one_issue() -> String {
        serde_json::to_string(&[issue_json(
            1001,
            "Review from Sam - Desert Safari",
            "Rating: 4/5\n\nReview: Wonderful evening in the dunes.",
            &["review", "approved"],
            "closed",
            "2024-03-10T10:00:00Z",
        )])
        .unwrap()
    }

    fn collect(loader: &ReviewLoader<'_, FileStore>) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        loader.load(now(), |e| events.push(e));
        events
    }

    #[test]
    fn test_cold_load_fetches_and_caches() {
        let fx = fixture();
        let source = remote(vec![Ok(one_issue())]);
        let loader = ReviewLoader::new(&source, &fx.cache, &fx.local);

        let events = collect(&loader);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], LoadEvent::Fresh(r) if r.len() == 1 && r[0].name == "Sam"));
        assert_eq!(fx.cache.get_cached(now()).unwrap().len(), 1);
    }

    #[test]
    fn test_fresh_cache_shown_then_revalidated() {
        let fx = fixture();
        fx.cache
            .put_cache(&[review("cached", 5, 1)], now() - TimeDelta::minutes(1))
            .unwrap();
        let source = remote(vec![Ok(one_issue())]);
        let loader = ReviewLoader::new(&source, &fx.cache, &fx.local);

        let events = collect(&loader);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], LoadEvent::Cached(r) if r[0].id == "cached"));
        assert!(matches!(&events[1], LoadEvent::Fresh(r) if r[0].name == "Sam"));
    }

    #[test]
    fn test_expired_cache_not_emitted() {
        let fx = fixture();
        fx.cache
            .put_cache(&[review("cached", 5, 1)], now() - TimeDelta::minutes(10))
            .unwrap();
        let source = remote(vec![Ok(one_issue())]);
        let loader = ReviewLoader::new(&source, &fx.cache, &fx.local);

        let events = collect(&loader);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LoadEvent::Fresh(_)));
    }

    #[test]
    fn test_failure_falls_back_to_stale_cache() {
        let fx = fixture();
        fx.cache
            .put_cache(&[review("stale", 5, 1)], now() - TimeDelta::hours(2))
            .unwrap();
        let source = remote(vec![Err(Error::Network("GitHub API error: 503".into()))]);
        let loader = ReviewLoader::new(&source, &fx.cache, &fx.local);

        match loader.load_latest(now()).unwrap() {
            LoadEvent::Failed {
                error,
                fallback,
                banner,
            } => {
                assert!(matches!(error, Error::Network(_)));
                assert_eq!(fallback.len(), 1);
                assert_eq!(fallback[0].id, "stale");
                assert_eq!(banner, OFFLINE_BANNER);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_failure_with_nothing_stored_is_empty() {
        let fx = fixture();
        let source = remote(vec![Err(Error::Network("offline".into()))]);
        let loader = ReviewLoader::new(&source, &fx.cache, &fx.local);

        match loader.load_latest(now()).unwrap() {
            LoadEvent::Failed {
                fallback, banner, ..
            } => {
                assert!(fallback.is_empty());
                assert_eq!(banner, EMPTY_BANNER);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        // Starter reviews are never written on the remote path.
        assert!(!fx.dir.path().join(format!("{LOCAL_KEY}.json")).exists());
    }

    #[test]
    fn test_failure_without_cache_uses_stored_local_reviews() {
        let fx = fixture();
        let stored = vec![review("kept-1", 4, 3), review("kept-2", 5, 8)];
        FileStore::new(fx.dir.path())
            .set(LOCAL_KEY, &serde_json::to_string(&stored).unwrap())
            .unwrap();
        let source = remote(vec![Err(Error::Network("offline".into()))]);
        let loader = ReviewLoader::new(&source, &fx.cache, &fx.local);

        match loader.load_latest(now()).unwrap() {
            LoadEvent::Failed {
                fallback, banner, ..
            } => {
                let ids: Vec<&str> = fallback.iter().map(|r| r.id.as_str()).collect();
                assert_eq!(ids, vec!["kept-2", "kept-1"]);
                assert_eq!(banner, OFFLINE_BANNER);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_pending_submission_survives_fresh_fetch() {
        let fx = fixture();
        let mut pending = review("local-1", 4, 19);
        pending.approved = false;
        pending.verified = false;
        pending.pending = true;
        fx.local.append(&pending).unwrap();

        let source = remote(vec![Ok(one_issue())]);
        let loader = ReviewLoader::new(&source, &fx.cache, &fx.local);
        let event = loader.load_latest(now()).unwrap();

        let ids: Vec<&str> = event.reviews().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["local-1", "1001"]);
        // The cache holds only what the remote returned.
        assert_eq!(fx.cache.get_stale().unwrap().len(), 1);
    }

    #[test]
    fn test_local_source_emits_fresh_only() {
        let fx = fixture();
        let dir = TempDir::new().unwrap();
        let source = LocalSource::new(FileStore::new(dir.path()));
        let loader = ReviewLoader::new(&source, &fx.cache, &fx.local);

        let events = collect(&loader);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], LoadEvent::Fresh(r) if r.len() == 3));
    }

    #[test]
    fn test_merge_pending_dedups_by_name_and_content() {
        let fetched = review("1001", 5, 10);
        let mut same = fetched.clone();
        same.id = "local-1".to_string();
        same.pending = true;
        let mut other = review("local-2", 3, 12);
        other.pending = true;

        let merged = merge_pending(vec![fetched], &[same, other]);
        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["local-2", "1001"]);
    }
}
