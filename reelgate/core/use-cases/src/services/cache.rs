use ::domain::ItemId;
use ::domain::Quality;

use crate::utils::aliases::MaybeOwnedString;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub item_id: ItemId,
    pub quality: Quality,
}

impl CacheKey {
    pub fn new(item_id: impl Into<ItemId>, quality: Quality) -> Self {
        Self { item_id: item_id.into(), quality }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    resolved_uri: MaybeOwnedString,
    created_at: ::tokio::time::Instant,
}

/// Bounded store of resolved playable sources.
///
/// Reads refresh recency, so the least recently used entry is evicted first.
/// Entries older than the TTL are dropped on read.
pub struct SourceCache {
    entries: ::tokio::sync::Mutex<::lru::LruCache<CacheKey, CacheEntry>>,
    ttl: ::std::time::Duration,
}

impl SourceCache {
    pub fn new(capacity: usize, ttl: ::std::time::Duration) -> Self {
        let capacity = ::std::num::NonZeroUsize::new(capacity).unwrap_or(::std::num::NonZeroUsize::MIN);

        Self {
            entries: ::tokio::sync::Mutex::new(::lru::LruCache::new(capacity)),
            ttl,
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<MaybeOwnedString> {
        let mut entries = self.entries.lock().await;

        let expired = entries.get(key)?.created_at.elapsed() >= self.ttl;

        if expired {
            entries.pop(key);
            ::tracing::debug!(item_id = %key.item_id, quality = %key.quality, "cached source expired");
            return None;
        }

        entries.get(key).map(|entry| entry.resolved_uri.clone())
    }

    pub async fn contains(&self, key: &CacheKey) -> bool {
        let entries = self.entries.lock().await;

        entries
            .peek(key)
            .is_some_and(|entry| entry.created_at.elapsed() < self.ttl)
    }

    pub async fn insert(&self, key: CacheKey, resolved_uri: MaybeOwnedString) {
        let entry = CacheEntry { resolved_uri, created_at: ::tokio::time::Instant::now() };

        if let Some((evicted, _)) = self.entries.lock().await.push(key.clone(), entry) {
            if evicted != key {
                ::tracing::debug!(item_id = %evicted.item_id, quality = %evicted.quality, "evicted cached source");
            }
        }
    }

    /// Drops every quality cached for `item_id`.
    pub async fn forget(&self, item_id: &ItemId) {
        let mut entries = self.entries.lock().await;

        let keys = entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| key.item_id == *item_id)
            .cloned()
            .collect::<Vec<_>>();

        for key in keys {
            entries.pop(&key);
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: ::std::time::Duration = ::std::time::Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn expired_entries_read_as_absent() {
        let cache = SourceCache::new(4, TTL);
        let key = CacheKey::new("a", Quality::Auto);

        cache.insert(key.clone(), "a.mp4".into()).await;
        assert_eq!(cache.get(&key).await.as_deref(), Some("a.mp4"));

        ::tokio::time::advance(TTL).await;

        assert!(!cache.contains(&key).await);
        assert_eq!(cache.get(&key).await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn evicts_least_recently_used_past_capacity() {
        let cache = SourceCache::new(2, TTL);
        let (a, b, c) = (
            CacheKey::new("a", Quality::Auto),
            CacheKey::new("b", Quality::Auto),
            CacheKey::new("c", Quality::Auto),
        );

        cache.insert(a.clone(), "a.mp4".into()).await;
        cache.insert(b.clone(), "b.mp4".into()).await;
        cache.get(&a).await;
        cache.insert(c.clone(), "c.mp4".into()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.contains(&a).await);
        assert!(!cache.contains(&b).await);
        assert!(cache.contains(&c).await);
    }

    #[tokio::test]
    async fn keys_are_per_quality() {
        let cache = SourceCache::new(4, TTL);

        cache.insert(CacheKey::new("a", Quality::P720), "a-720.mp4".into()).await;
        cache.insert(CacheKey::new("a", Quality::P360), "a-360.mp4".into()).await;
        cache.insert(CacheKey::new("b", Quality::P360), "b-360.mp4".into()).await;

        assert_eq!(cache.get(&CacheKey::new("a", Quality::P360)).await.as_deref(), Some("a-360.mp4"));

        cache.forget(&"a".into()).await;

        assert_eq!(cache.len().await, 1);
        assert!(cache.contains(&CacheKey::new("b", Quality::P360)).await);
    }
}
