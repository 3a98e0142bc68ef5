//! Username to account id resolution with caching.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::converter::JqlConverter;
use super::query::build_jql;
use crate::cache::{CacheConfig, Clock, ExpiringCache, SystemClock};
use crate::error::{ResolveError, Result};

/// Resolves usernames to Jira account ids, remembering each answer for a
/// fixed TTL.
///
/// The resolved id scopes issue searches, so an expired id is never
/// reused: the cache drops it and the next lookup asks Jira again.
/// Failures are not cached.
pub struct AccountIds<T, C = SystemClock> {
    converter: T,
    cache: Arc<ExpiringCache<String, C>>,
    ttl: Duration,
}

impl<T, C> AccountIds<T, C>
where
    T: JqlConverter,
    C: Clock,
{
    pub fn new(converter: T, cache: Arc<ExpiringCache<String, C>>, config: &CacheConfig) -> Self {
        Self {
            converter,
            cache,
            ttl: config.ttl,
        }
    }

    /// Account id for `username`, from cache or from one conversion call.
    pub async fn account_id(&self, username: &str) -> Result<String> {
        if let Some(account_id) = self.cache.get(username) {
            debug!(username, "account id cache hit");
            return Ok(account_id);
        }

        debug!(username, "account id cache miss");
        let raw = self.converter.convert(username).await?;

        let account_id = extract_account_id(&raw)
            .ok_or_else(|| ResolveError::Extraction { raw: raw.clone() })?
            .to_string();

        self.cache.insert(username, account_id.clone(), self.ttl);
        Ok(account_id)
    }

    /// `assignee = "<account id>"` for `username`.
    pub async fn assignee_clause(&self, username: &str) -> Result<String> {
        Ok(build_jql("assignee", &self.account_id(username).await?))
    }
}

/// Account id between the first and last double quote of `jql`.
///
/// Returns `None` when there is no such pair or nothing between them.
/// Single quotes are not recognised.
pub fn extract_account_id(jql: &str) -> Option<&str> {
    let start = jql.find('"')?;
    let end = jql.rfind('"')?;
    if end <= start {
        return None;
    }

    Some(&jql[start + 1..end]).filter(|id| !id.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::ManualClock;

    /// Converter that replays a canned answer and counts calls.
    pub(crate) struct StubConverter {
        reply: fn(&str) -> Result<String>,
        pub(crate) calls: AtomicUsize,
    }

    impl StubConverter {
        pub(crate) fn new(reply: fn(&str) -> Result<String>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl JqlConverter for StubConverter {
        async fn convert(&self, username: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)(username)
        }
    }

    pub(crate) fn account_for(username: &str) -> Result<String> {
        Ok(format!(r#"assignee = "account:{username}-id""#))
    }

    fn accounts(
        reply: fn(&str) -> Result<String>,
    ) -> (AccountIds<StubConverter, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let cache = Arc::new(ExpiringCache::with_clock("account_ids", clock.clone()));
        let accounts = AccountIds::new(
            StubConverter::new(reply),
            cache,
            &CacheConfig::account_ids(),
        );
        (accounts, clock)
    }

    #[test]
    fn test_extract_account_id() {
        assert_eq!(
            extract_account_id(r#"assignee = "account:5b10ac8d82e05b22cc7d4ef5""#),
            Some("account:5b10ac8d82e05b22cc7d4ef5")
        );
        assert_eq!(extract_account_id("assignee = 'account:123456789'"), None);
        assert_eq!(extract_account_id("assignee = account:123456789"), None);
        assert_eq!(extract_account_id(""), None);
        assert_eq!(extract_account_id(r#"assignee = "incomplete"#), None);
        assert_eq!(extract_account_id(r#"assignee = """#), None);
    }

    #[test]
    fn test_extract_spans_first_to_last_quote() {
        assert_eq!(
            extract_account_id(r#"assignee in ("a", "b")"#),
            Some(r#"a", "b"#)
        );
    }

    #[tokio::test]
    async fn test_cache_hit_skips_conversion() {
        let (accounts, _) = accounts(|_| panic!("conversion must not run on a cache hit"));
        accounts
            .cache
            .insert("alice", "account:123".to_string(), Duration::from_secs(300));

        assert_eq!(accounts.account_id("alice").await.unwrap(), "account:123");
        assert_eq!(
            accounts.assignee_clause("alice").await.unwrap(),
            r#"assignee = "account:123""#
        );
        assert_eq!(accounts.converter.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_converts_once_then_caches() {
        let (accounts, _) = accounts(account_for);

        assert_eq!(
            accounts.account_id("testuser").await.unwrap(),
            "account:testuser-id"
        );
        assert_eq!(
            accounts.account_id("testuser").await.unwrap(),
            "account:testuser-id"
        );
        assert_eq!(accounts.converter.calls(), 1);
        assert_eq!(
            accounts.cache.get("testuser").as_deref(),
            Some("account:testuser-id")
        );
    }

    #[tokio::test]
    async fn test_expired_id_is_resolved_again() {
        let (accounts, clock) = accounts(account_for);

        accounts.account_id("bob").await.unwrap();
        clock.advance(Duration::from_secs(601));
        accounts.account_id("bob").await.unwrap();

        assert_eq!(accounts.converter.calls(), 2);
    }

    #[tokio::test]
    async fn test_no_result_is_not_cached() {
        let (accounts, _) = accounts(|username| {
            Err(ResolveError::NoResult {
                username: username.to_string(),
            })
        });

        let err = accounts.account_id("testuser").await.unwrap_err();
        assert_eq!(err.to_string(), "no conversion result for username: testuser");
        assert!(!accounts.cache.is_stored("testuser"));

        accounts.account_id("testuser").await.unwrap_err();
        assert_eq!(accounts.converter.calls(), 2);
    }

    #[tokio::test]
    async fn test_unquoted_result_carries_raw_value() {
        let (accounts, _) = accounts(|_| Ok("assignee = malformed_without_quotes".to_string()));

        let err = accounts.account_id("testuser").await.unwrap_err();
        match &err {
            ResolveError::Extraction { raw } => {
                assert_eq!(raw, "assignee = malformed_without_quotes");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(
            err.to_string()
                .contains("failed to extract account ID from converted query")
        );
        assert!(!accounts.cache.is_stored("testuser"));
    }
}
