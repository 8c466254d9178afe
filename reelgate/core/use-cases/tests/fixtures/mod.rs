//! In-memory gateways and a fully wired engine for integration tests.
//!
//! Nothing here touches the network or the filesystem. Time-dependent tests run on a
//! paused tokio clock and move it explicitly.

#![allow(dead_code)]

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use domain::AdKind;
use domain::FeedItem;
use domain::ItemId;
use domain::Quality;
use use_cases::boundaries::Accept;
use use_cases::boundaries::PlayerReport;
use use_cases::boundaries::Update;
use use_cases::errors::BackendError;
use use_cases::gateways::AdNetworkClient;
use use_cases::gateways::AuthorizationService;
use use_cases::gateways::BalanceBackend;
use use_cases::gateways::Clock;
use use_cases::gateways::KeyValueStore;
use use_cases::gateways::LikeBackend;
use use_cases::gateways::SourceOptimizer;
use use_cases::interactors::authorization::AuthorizationAttachment;
use use_cases::interactors::likes::LikeInteractor;
use use_cases::interactors::monetization::MonetizationInteractor;
use use_cases::interactors::playback::PlaybackInteractor;
use use_cases::interactors::prefetcher::Prefetcher;
use use_cases::interactors::resolver::SourceResolver;
use use_cases::models::descriptors::AccessGrant;
use use_cases::models::descriptors::AdContext;
use use_cases::models::descriptors::PlaybackRequest;
use use_cases::models::descriptors::Reward;
use use_cases::models::descriptors::RewardReceipt;
use use_cases::models::descriptors::SpendReceipt;
use use_cases::models::events::AdNetworkEvent;
use use_cases::models::events::InteractionEvent;
use use_cases::models::events::PlayerCommand;
use use_cases::models::events::PlayerEvent;
use use_cases::services::cache::SourceCache;
use use_cases::services::feed::FeedWindow;
use use_cases::services::quality::QualityPreferenceStore;
use use_cases::services::quota::QuotaStore;
use use_cases::settings::EngineSettings;
use use_cases::utils::aliases::BoxedStream;
use use_cases::utils::aliases::Fallible;
use use_cases::utils::aliases::MaybeOwnedString;

pub fn day(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

/// Lets every spawned task run until it blocks, without moving the clock.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

pub fn item(id: &'static str) -> FeedItem {
    FeedItem::builder()
        .id(id)
        .thumbnail(format!("{id}.jpg"))
        .variants(
            [
                (Quality::P360, format!("{id}-360.mp4")),
                (Quality::P720, format!("{id}-720.mp4")),
                (Quality::Auto, format!("{id}.m3u8")),
            ]
            .into_iter()
            .collect::<domain::Variants>(),
        )
        .like_count(10u64)
        .build()
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn raw(&self, key: &str) -> Option<serde_json::Value> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(self: Arc<Self>, key: &str) -> Fallible<Option<serde_json::Value>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(self: Arc<Self>, key: &str, value: serde_json::Value) -> Fallible<()> {
        // Forces interleaving between concurrent read-modify-write cycles.
        tokio::task::yield_now().await;
        self.values.lock().unwrap().insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(self: Arc<Self>, key: &str) -> Fallible<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self { today: Mutex::new(today) }
    }

    pub fn set(&self, today: NaiveDate) {
        *self.today.lock().unwrap() = today;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Optimized,
    Empty,
    Fail,
}

pub struct CountingOptimizer {
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<(ItemId, Quality, MaybeOwnedString)>>,
    delay: Duration,
    answer: Answer,
}

impl CountingOptimizer {
    pub fn new(delay: Duration, answer: Answer) -> Self {
        Self { calls: AtomicUsize::new(0), requests: Mutex::new(Vec::new()), delay, answer }
    }

    pub fn failing() -> Self {
        Self::new(Duration::ZERO, Answer::Fail)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceOptimizer for CountingOptimizer {
    async fn optimize(
        self: Arc<Self>, item_id: ItemId, quality: Quality, direct: MaybeOwnedString,
    ) -> Fallible<MaybeOwnedString> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((item_id, quality, direct.clone()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.answer {
            Answer::Optimized => Ok(format!("cdn://{direct}").into()),
            Answer::Empty => Ok("".into()),
            Answer::Fail => Err(anyhow::anyhow!("optimizer unavailable")),
        }
    }
}

#[derive(Default)]
pub struct FakeAuthorization {
    pub calls: AtomicUsize,
    pub failures: AtomicU32,
}

impl FakeAuthorization {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationService for FakeAuthorization {
    async fn grant(self: Arc<Self>, item_id: ItemId) -> Fallible<AccessGrant> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            anyhow::bail!("authorization service unavailable");
        }

        Ok(AccessGrant {
            cookies: [("grant".to_owned(), format!("{item_id}-{call}"))].into_iter().collect(),
        })
    }
}

pub struct FakeAdNetwork {
    pub loads: AtomicUsize,
    pub shows: AtomicUsize,
    pub failing_loads: AtomicU32,
    pub reward: u64,
}

impl Default for FakeAdNetwork {
    fn default() -> Self {
        Self { loads: AtomicUsize::new(0), shows: AtomicUsize::new(0), failing_loads: AtomicU32::new(0), reward: 20 }
    }
}

impl FakeAdNetwork {
    pub fn shows(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdNetworkClient for FakeAdNetwork {
    async fn load(self: Arc<Self>, _: AdKind) -> Fallible<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            anyhow::bail!("no fill");
        }

        Ok(())
    }

    async fn show(self: Arc<Self>, _: AdKind) -> Fallible<BoxedStream<AdNetworkEvent>> {
        self.shows.fetch_add(1, Ordering::SeqCst);

        let amount = self.reward;

        Ok(Box::pin(async_stream::stream! {
            yield AdNetworkEvent::RewardEarned(Reward { amount });
            yield AdNetworkEvent::Closed;
        }))
    }
}

pub struct FakeBackend {
    pub balance: AtomicU64,
    pub spends: AtomicUsize,
    pub fail_spends: AtomicBool,
    pub fail_rewards: AtomicBool,
    pub fail_likes: AtomicBool,
    pub rewards: Mutex<Vec<(AdKind, AdContext)>>,
    pub likes: Mutex<Vec<(ItemId, bool)>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            balance: AtomicU64::new(100),
            spends: AtomicUsize::new(0),
            fail_spends: AtomicBool::new(false),
            fail_rewards: AtomicBool::new(false),
            fail_likes: AtomicBool::new(false),
            rewards: Mutex::new(Vec::new()),
            likes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BalanceBackend for FakeBackend {
    async fn spend_coins(self: Arc<Self>, _: ItemId, amount: u64) -> Result<SpendReceipt, BackendError> {
        self.spends.fetch_add(1, Ordering::SeqCst);

        if self.fail_spends.load(Ordering::SeqCst) {
            return Err(BackendError::rejected(402, "Not enough coins"));
        }

        let balance = self.balance.fetch_sub(amount, Ordering::SeqCst) - amount;
        Ok(SpendReceipt { balance: Some(balance) })
    }

    async fn record_ad_reward(self: Arc<Self>, kind: AdKind, context: AdContext) -> Result<RewardReceipt, BackendError> {
        if self.fail_rewards.load(Ordering::SeqCst) {
            return Err(BackendError::Transport(anyhow::anyhow!("connection reset")));
        }

        self.rewards.lock().unwrap().push((kind, context));

        let balance = self.balance.fetch_add(20, Ordering::SeqCst) + 20;
        Ok(RewardReceipt { coins: 20, balance: Some(balance) })
    }

    async fn balance(self: Arc<Self>, _: MaybeOwnedString) -> Result<u64, BackendError> {
        Ok(self.balance.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl LikeBackend for FakeBackend {
    async fn set_liked(self: Arc<Self>, item_id: ItemId, liked: bool) -> Result<(), BackendError> {
        if self.fail_likes.load(Ordering::SeqCst) {
            return Err(BackendError::rejected(500, "try again later"));
        }

        self.likes.lock().unwrap().push((item_id, liked));
        Ok(())
    }
}

/// Collects everything the engine tells the UI and tracks which surfaces decode at full rate.
#[derive(Default)]
pub struct Recorder {
    commands: Mutex<Vec<PlayerCommand>>,
    events: Mutex<Vec<InteractionEvent>>,
    decoding: Mutex<HashSet<ItemId>>,
    max_decoding: AtomicUsize,
}

impl Recorder {
    pub fn commands(&self) -> Vec<PlayerCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<InteractionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
        self.events.lock().unwrap().clear();
    }

    pub fn attaches(&self, item_id: &str) -> Vec<PlaybackRequest> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                PlayerCommand::Attach { item_id: id, request } if id == item_id => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn max_decoding(&self) -> usize {
        self.max_decoding.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Update<PlayerCommand> for Recorder {
    async fn update(self: Arc<Self>, command: &PlayerCommand) -> Fallible<()> {
        {
            let mut decoding = self.decoding.lock().unwrap();

            match command {
                PlayerCommand::Play { item_id } => {
                    decoding.insert(item_id.clone());
                    self.max_decoding.fetch_max(decoding.len(), Ordering::SeqCst);
                },
                PlayerCommand::Pause { item_id } | PlayerCommand::Release { item_id } => {
                    decoding.remove(item_id);
                },
                _ => (),
            }
        }

        self.commands.lock().unwrap().push(command.clone());
        Ok(())
    }
}

#[async_trait]
impl Update<InteractionEvent> for Recorder {
    async fn update(self: Arc<Self>, event: &InteractionEvent) -> Fallible<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct Engine {
    pub settings: EngineSettings,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub recorder: Arc<Recorder>,
    pub feed: Arc<FeedWindow>,
    pub optimizer: Arc<CountingOptimizer>,
    pub resolver: Arc<SourceResolver>,
    pub quality: Arc<QualityPreferenceStore>,
    pub prefetcher: Arc<Prefetcher>,
    pub authorization: Arc<FakeAuthorization>,
    pub backend: Arc<FakeBackend>,
    pub ads: Arc<FakeAdNetwork>,
    pub quota: Arc<QuotaStore>,
    pub likes: Arc<LikeInteractor>,
    pub playback: Arc<PlaybackInteractor>,
    pub monetization: Arc<MonetizationInteractor>,
}

impl Engine {
    pub async fn new(items: Vec<FeedItem>) -> Self {
        Self::with(items, EngineSettings::default(), CountingOptimizer::failing()).await
    }

    pub async fn with(items: Vec<FeedItem>, settings: EngineSettings, optimizer: CountingOptimizer) -> Self {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(FixedClock::new(day(1)));
        let recorder = Arc::new(Recorder::default());
        let feed = Arc::new(FeedWindow::new(items));
        let optimizer = Arc::new(optimizer);

        let cache = Arc::new(SourceCache::new(settings.cache_capacity, settings.cache_ttl));
        let resolver = Arc::new(SourceResolver::new(cache, optimizer.clone(), settings.resolve_timeout));
        let quality = Arc::new(QualityPreferenceStore::load(store.clone()).await.unwrap());

        let prefetcher = Arc::new(
            Prefetcher::builder()
                .feed(feed.clone())
                .resolver(resolver.clone())
                .quality(quality.clone())
                .ahead(settings.prefetch_ahead)
                .worker_pool(settings.prefetch_concurrency)
                .build(),
        );

        let authorization = Arc::new(FakeAuthorization::default());
        let backend = Arc::new(FakeBackend::default());
        let ads = Arc::new(FakeAdNetwork::default());
        let quota = Arc::new(QuotaStore::new(store.clone(), clock.clone()));

        let likes = Arc::new(LikeInteractor {
            output_boundary: recorder.clone(),
            feed: feed.clone(),
            backend: backend.clone(),
        });

        let playback = Arc::new(
            PlaybackInteractor::builder()
                .output_boundary(recorder.clone())
                .feed(feed.clone())
                .resolver(resolver.clone())
                .prefetcher(prefetcher.clone())
                .authorization(Arc::new(AuthorizationAttachment::new(authorization.clone())))
                .quality(quality.clone())
                .likes(likes.clone())
                .settings(settings.clone())
                .build(),
        );

        let monetization = Arc::new(
            MonetizationInteractor::builder()
                .output_boundary(recorder.clone())
                .ads(ads.clone())
                .backend(backend.clone())
                .quota(quota.clone())
                .feed(feed.clone())
                .playback(playback.clone())
                .user_id("user-1")
                .settings(settings.clone())
                .build(),
        );

        Self {
            settings,
            store,
            clock,
            recorder,
            feed,
            optimizer,
            resolver,
            quality,
            prefetcher,
            authorization,
            backend,
            ads,
            quota,
            likes,
            playback,
            monetization,
        }
    }

    pub async fn report(&self, item_id: &'static str, event: PlayerEvent) {
        self.playback.clone().accept(PlayerReport::new(item_id.into(), event)).await.unwrap();
        settle().await;
    }

    /// Plays the player's part once a source is attached.
    pub async fn load(&self, item_id: &'static str) {
        self.report(item_id, PlayerEvent::MetadataLoaded { duration_ms: 15_000 }).await;
    }

    pub async fn phase(&self, item_id: &'static str) -> Option<domain::PlaybackPhase> {
        self.playback.state(&item_id.into()).await.map(|state| state.phase)
    }
}
