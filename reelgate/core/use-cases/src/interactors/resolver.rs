use ::domain::ItemId;
use ::domain::Quality;
use ::domain::Variants;
use ::futures_util::future::BoxFuture;
use ::futures_util::future::FutureExt as _;
use ::futures_util::future::Shared;

use crate::gateways::SourceOptimizer;
use crate::services::cache::CacheKey;
use crate::services::cache::SourceCache;
use crate::utils::aliases::MaybeOwnedString;

type InFlight = Shared<BoxFuture<'static, MaybeOwnedString>>;

/// Maps an item and a quality preference to a playable location.
///
/// Concurrent requests for the same key share one optimization attempt.
/// The optimized location is preferred but never awaited past the configured budget:
/// on timeout, failure or an empty answer the direct rendition is used instead.
pub struct SourceResolver {
    cache: ::std::sync::Arc<SourceCache>,
    optimizer: ::std::sync::Arc<dyn SourceOptimizer>,
    timeout: ::std::time::Duration,
    in_flight: ::tokio::sync::Mutex<::std::collections::HashMap<CacheKey, InFlight>>,
}

impl SourceResolver {
    pub fn new(
        cache: ::std::sync::Arc<SourceCache>,
        optimizer: ::std::sync::Arc<dyn SourceOptimizer>,
        timeout: ::std::time::Duration,
    ) -> Self {
        Self {
            cache,
            optimizer,
            timeout,
            in_flight: ::tokio::sync::Mutex::new(::std::collections::HashMap::new()),
        }
    }

    /// Returns `None` only when the item has no usable rendition at all.
    pub async fn resolve(
        self: ::std::sync::Arc<Self>, item_id: ItemId, variants: &Variants, quality: Quality,
    ) -> Option<MaybeOwnedString> {
        let key = CacheKey::new(item_id, quality);

        let attempt = {
            let mut in_flight = self.in_flight.lock().await;

            if let Some(uri) = self.cache.get(&key).await {
                ::tracing::debug!(item_id = %key.item_id, quality = %quality, "source cache hit");
                return Some(uri);
            }

            let Some(direct) = variants.select(quality) else {
                ::tracing::warn!(item_id = %key.item_id, "item has no playable rendition");
                return None;
            };
            let direct: MaybeOwnedString = direct.to_owned().into();

            match in_flight.get(&key) {
                Some(attempt) => attempt.clone(),
                None => {
                    let attempt = ::std::sync::Arc::clone(&self).fetch(key.clone(), direct).boxed().shared();
                    in_flight.insert(key, attempt.clone());
                    attempt
                },
            }
        };

        Some(attempt.await)
    }

    pub async fn is_cached(&self, item_id: &ItemId, quality: Quality) -> bool {
        self.cache.contains(&CacheKey::new(item_id.clone(), quality)).await
    }

    /// Drops cached locations of `item_id`, so the next resolution starts over.
    pub async fn forget(&self, item_id: &ItemId) {
        self.cache.forget(item_id).await;
    }

    async fn fetch(self: ::std::sync::Arc<Self>, key: CacheKey, direct: MaybeOwnedString) -> MaybeOwnedString {
        let optimization = ::std::sync::Arc::clone(&self.optimizer).optimize(key.item_id.clone(), key.quality, direct.clone());

        let uri = match ::tokio::time::timeout(self.timeout, optimization).await {
            Ok(Ok(uri)) if !uri.trim().is_empty() => uri,
            Ok(Ok(_)) => {
                ::tracing::warn!(item_id = %key.item_id, "optimizer returned an empty location, using direct rendition");
                direct
            },
            Ok(Err(error)) => {
                ::tracing::warn!(item_id = %key.item_id, %error, "optimization failed, using direct rendition");
                direct
            },
            Err(_) => {
                ::tracing::warn!(item_id = %key.item_id, timeout = ?self.timeout, "optimization timed out, using direct rendition");
                direct
            },
        };

        self.cache.insert(key.clone(), uri.clone()).await;
        self.in_flight.lock().await.remove(&key);

        uri
    }
}
