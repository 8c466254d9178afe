use ::domain::FeedItem;
use ::domain::ItemId;

use crate::interactors::resolver::SourceResolver;
use crate::models::descriptors::ScrollDirection;
use crate::services::feed::FeedWindow;
use crate::services::quality::QualityPreferenceStore;

/// A background resolution started by the prefetcher.
#[derive(Debug)]
pub struct ScheduledPrefetch {
    pub item_id: ItemId,
    pub task: ::tokio::task::JoinHandle<()>,
}

/// Resolves the items the user is about to reach, so the cache is warm when they land.
///
/// Failures stay in the background: they are logged and the item resolves again on focus.
#[derive(::bon::Builder)]
pub struct Prefetcher {
    feed: ::std::sync::Arc<FeedWindow>,
    resolver: ::std::sync::Arc<SourceResolver>,
    quality: ::std::sync::Arc<QualityPreferenceStore>,

    #[builder(default = 2)]
    ahead: usize,

    #[builder(with = |concurrency: usize| ::std::sync::Arc::new(::tokio::sync::Semaphore::new(concurrency.max(1))))]
    worker_pool: ::std::sync::Arc<::tokio::sync::Semaphore>,

    #[builder(skip = ::std::sync::Arc::new(::tokio::sync::Mutex::new(::std::collections::HashSet::new())))]
    in_flight: ::std::sync::Arc<::tokio::sync::Mutex<::std::collections::HashSet<ItemId>>>,
}

impl Prefetcher {
    /// Schedules the items following `current_index` in scroll order.
    pub async fn schedule(self: ::std::sync::Arc<Self>, current_index: usize, direction: ScrollDirection) -> Vec<ScheduledPrefetch> {
        let upcoming = self.feed.ahead(current_index, direction, self.ahead).await;

        ::std::sync::Arc::clone(&self).schedule_items(upcoming).await
    }

    /// Starts a resolution for every item that is neither cached nor already being prefetched.
    pub async fn schedule_items(self: ::std::sync::Arc<Self>, items: Vec<FeedItem>) -> Vec<ScheduledPrefetch> {
        let quality = self.quality.current();
        let mut scheduled = Vec::new();

        for item in items {
            if item.variants.is_empty() || self.resolver.is_cached(&item.id, quality).await {
                continue;
            }

            if !self.in_flight.lock().await.insert(item.id.clone()) {
                continue;
            }

            let item_id = item.id.clone();
            let this = ::std::sync::Arc::clone(&self);

            let task = ::tokio::spawn(async move {
                let Ok(_permit) = ::std::sync::Arc::clone(&this.worker_pool).acquire_owned().await else {
                    return;
                };

                match ::std::sync::Arc::clone(&this.resolver).resolve(item.id.clone(), &item.variants, quality).await {
                    Some(_) => ::tracing::debug!(item_id = %item.id, quality = %quality, "prefetched source"),
                    None => ::tracing::debug!(item_id = %item.id, "nothing to prefetch"),
                }

                this.in_flight.lock().await.remove(&item.id);
            });

            scheduled.push(ScheduledPrefetch { item_id, task });
        }

        scheduled
    }
}
