use ::async_trait::async_trait;
use ::domain::AdKind;
use ::domain::FeedItem;
use ::domain::ItemId;
use ::domain::Quality;
use ::use_cases::errors::BackendError;
use ::use_cases::gateways::AdNetworkClient;
use ::use_cases::gateways::AuthorizationService;
use ::use_cases::gateways::BalanceBackend;
use ::use_cases::gateways::ContentFeedProvider;
use ::use_cases::gateways::LikeBackend;
use ::use_cases::gateways::SourceOptimizer;
use ::use_cases::models::descriptors::AccessGrant;
use ::use_cases::models::descriptors::AdContext;
use ::use_cases::models::descriptors::FeedPage;
use ::use_cases::models::descriptors::Reward;
use ::use_cases::models::descriptors::RewardReceipt;
use ::use_cases::models::descriptors::SpendReceipt;
use ::use_cases::models::events::AdNetworkEvent;

use crate::utils::aliases::BoxedStream;
use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedPath;
use crate::utils::aliases::MaybeOwnedString;

fn lock<T>(mutex: &::std::sync::Mutex<T>) -> ::std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(::std::sync::PoisonError::into_inner)
}

/// Offline ad network: every ad loads after a short delay, plays for a while, then pays out.
#[derive(::bon::Builder)]
pub struct SimulatedAdNetwork {
    #[builder(default = ::std::time::Duration::from_millis(300))]
    load_delay: ::std::time::Duration,

    #[builder(default = ::std::time::Duration::from_secs(1))]
    show_duration: ::std::time::Duration,

    #[builder(default = 10)]
    reward: u64,

    /// Number of initial load attempts answered with a no-fill.
    #[builder(default)]
    unfilled_loads: u32,

    #[builder(skip)]
    attempts: ::std::sync::atomic::AtomicU32,

    #[builder(skip)]
    loaded: ::std::sync::Mutex<::std::collections::HashSet<AdKind>>,
}

#[async_trait]
impl AdNetworkClient for SimulatedAdNetwork {
    async fn load(self: ::std::sync::Arc<Self>, kind: AdKind) -> Fallible<()> {
        ::tokio::time::sleep(self.load_delay).await;

        let attempt = self.attempts.fetch_add(1, ::std::sync::atomic::Ordering::SeqCst);
        if attempt < self.unfilled_loads {
            ::anyhow::bail!("no fill for {} ad", kind);
        }

        lock(&self.loaded).insert(kind);

        Ok(())
    }

    async fn show(self: ::std::sync::Arc<Self>, kind: AdKind) -> Fallible<BoxedStream<AdNetworkEvent>> {
        if !lock(&self.loaded).remove(&kind) {
            ::anyhow::bail!("{} ad is not loaded", kind);
        }

        let show_duration = self.show_duration;
        let reward = Reward { amount: self.reward };

        Ok(::std::boxed::Box::pin(::async_stream::stream! {
            ::tokio::time::sleep(show_duration).await;
            yield AdNetworkEvent::RewardEarned(reward);
            yield AdNetworkEvent::Closed;
        }))
    }
}

/// Offline stand-in for the content backend, keeping the wallet in memory.
#[derive(::bon::Builder)]
pub struct SimulatedBackend {
    #[builder(default = ::std::time::Duration::from_millis(150))]
    latency: ::std::time::Duration,

    #[builder(default = 100)]
    starting_balance: u64,

    #[builder(default = 10)]
    coins_per_reward: u64,

    /// Appended to direct locations to mimic an edge-warmed source.
    #[builder(into, default = MaybeOwnedString::Borrowed("?edge=warm"))]
    optimized_suffix: MaybeOwnedString,

    #[builder(skip = ::std::sync::Mutex::new(starting_balance))]
    balance: ::std::sync::Mutex<u64>,

    #[builder(skip)]
    likes: ::std::sync::Mutex<::std::collections::HashSet<ItemId>>,
}

impl SimulatedBackend {
    pub fn is_liked(&self, item_id: &ItemId) -> bool {
        lock(&self.likes).contains(item_id)
    }
}

#[async_trait]
impl BalanceBackend for SimulatedBackend {
    async fn spend_coins(self: ::std::sync::Arc<Self>, item_id: ItemId, amount: u64) -> Result<SpendReceipt, BackendError> {
        ::tokio::time::sleep(self.latency).await;

        let mut balance = lock(&self.balance);
        if *balance < amount {
            return Err(BackendError::rejected(402, "Not enough coins"));
        }

        *balance -= amount;
        ::tracing::debug!(%item_id, amount, balance = *balance, "simulated coin spend");

        Ok(SpendReceipt { balance: Some(*balance) })
    }

    async fn record_ad_reward(
        self: ::std::sync::Arc<Self>, kind: AdKind, _: AdContext,
    ) -> Result<RewardReceipt, BackendError> {
        ::tokio::time::sleep(self.latency).await;

        let coins = match kind {
            AdKind::Unlock => 0,
            AdKind::Reward | AdKind::DailyCheckin | AdKind::Benefit => self.coins_per_reward,
        };

        let mut balance = lock(&self.balance);
        *balance += coins;

        Ok(RewardReceipt { coins, balance: Some(*balance) })
    }

    async fn balance(self: ::std::sync::Arc<Self>, _: MaybeOwnedString) -> Result<u64, BackendError> {
        ::tokio::time::sleep(self.latency).await;

        Ok(*lock(&self.balance))
    }
}

#[async_trait]
impl LikeBackend for SimulatedBackend {
    async fn set_liked(self: ::std::sync::Arc<Self>, item_id: ItemId, liked: bool) -> Result<(), BackendError> {
        ::tokio::time::sleep(self.latency).await;

        let mut likes = lock(&self.likes);
        match liked {
            true => likes.insert(item_id),
            false => likes.remove(&item_id),
        };

        Ok(())
    }
}

#[async_trait]
impl AuthorizationService for SimulatedBackend {
    async fn grant(self: ::std::sync::Arc<Self>, item_id: ItemId) -> Fallible<AccessGrant> {
        ::tokio::time::sleep(self.latency).await;

        let cookies = [("token".to_owned(), format!("sim-{}", item_id))].into_iter().collect();

        Ok(AccessGrant { cookies })
    }
}

#[async_trait]
impl SourceOptimizer for SimulatedBackend {
    async fn optimize(
        self: ::std::sync::Arc<Self>, _: ItemId, _: Quality, direct: MaybeOwnedString,
    ) -> Fallible<MaybeOwnedString> {
        ::tokio::time::sleep(self.latency).await;

        Ok(format!("{}{}", direct, self.optimized_suffix).into())
    }
}

/// Feed read from a JSON array of items on disk, served in fixed-size pages.
///
/// The cursor is the offset of the next page.
#[derive(::bon::Builder)]
pub struct JsonFileFeedProvider {
    #[builder(into)]
    path: MaybeOwnedPath,

    #[builder(default = 10)]
    page_size: usize,
}

#[async_trait]
impl ContentFeedProvider for JsonFileFeedProvider {
    async fn page(self: ::std::sync::Arc<Self>, cursor: Option<MaybeOwnedString>) -> Fallible<FeedPage> {
        let offset = match cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|err| ::anyhow::anyhow!("invalid feed cursor {:?}: {}", cursor, err))?,
            None => 0,
        };

        let bytes = ::tokio::fs::read(&self.path).await?;
        let items: Vec<FeedItem> = ::serde_json::from_slice(&bytes)?;

        let end = offset.saturating_add(self.page_size.max(1)).min(items.len());
        let next_cursor = (end < items.len()).then(|| end.to_string().into());
        let items = items.into_iter().skip(offset).take(end.saturating_sub(offset)).collect();

        Ok(FeedPage { items, next_cursor })
    }
}
