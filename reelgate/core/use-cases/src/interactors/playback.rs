use ::async_trait::async_trait;
use ::domain::FeedItem;
use ::domain::ItemId;
use ::domain::PlaybackPhase;
use ::domain::PlaybackState;
use ::futures_util::future::BoxFuture;
use ::futures_util::future::FutureExt as _;

use crate::boundaries::Accept;
use crate::boundaries::ChangeAppStateRequestModel;
use crate::boundaries::ChangeScrollStateRequestModel;
use crate::boundaries::ChangeVisibilityRequestModel;
use crate::boundaries::FocusItemRequestModel;
use crate::boundaries::LockStateChanged;
use crate::boundaries::PlaybackOutputBoundary;
use crate::boundaries::PlayerReport;
use crate::boundaries::ReplaceWindowRequestModel;
use crate::boundaries::SelectQualityRequestModel;
use crate::boundaries::TapRequestModel;
use crate::boundaries::TogglePauseRequestModel;
use crate::interactors::authorization::AuthorizationAttachment;
use crate::interactors::likes::LikeInteractor;
use crate::interactors::prefetcher::Prefetcher;
use crate::interactors::resolver::SourceResolver;
use crate::models::descriptors::Headers;
use crate::models::descriptors::PlaybackRequest;
use crate::models::descriptors::ScrollDirection;
use crate::models::events::PlaybackFailure;
use crate::models::events::PlayerCommand;
use crate::models::events::PlayerEvent;
use crate::services::feed::FeedWindow;
use crate::services::quality::QualityPreferenceStore;
use crate::settings::EngineSettings;
use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedString;

/// Drives one player surface per feed item and keeps at most one of them playing.
///
/// Every request mutates the shared state under one lock and emits the resulting player
/// commands before releasing it, pauses ahead of plays. The output boundary must not
/// call back into the interactor while handling a command.
#[derive(::bon::Builder)]
pub struct PlaybackInteractor {
    output_boundary: ::std::sync::Arc<dyn PlaybackOutputBoundary>,

    feed: ::std::sync::Arc<FeedWindow>,
    resolver: ::std::sync::Arc<SourceResolver>,
    prefetcher: ::std::sync::Arc<Prefetcher>,
    authorization: ::std::sync::Arc<AuthorizationAttachment>,
    quality: ::std::sync::Arc<QualityPreferenceStore>,
    likes: ::std::sync::Arc<LikeInteractor>,

    #[builder(default)]
    settings: EngineSettings,

    #[builder(skip)]
    state: ::tokio::sync::Mutex<FeedPlayback>,
}

impl PlaybackInteractor {
    pub async fn state(&self, item_id: &ItemId) -> Option<PlaybackState> {
        self.state.lock().await.items.get(item_id).map(|item| item.state.clone())
    }

    pub async fn playing(&self) -> Vec<ItemId> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .filter(|(_, item)| item.state.phase == PlaybackPhase::Playing)
            .map(|(item_id, _)| item_id.clone())
            .collect()
    }

    pub async fn controls_visible(&self, item_id: &ItemId) -> bool {
        self.state.lock().await.items.get(item_id).is_some_and(|item| item.controls_visible)
    }

    /// Whether the item gave up on playback and shows its thumbnail instead.
    pub async fn is_degraded(&self, item_id: &ItemId) -> bool {
        self.state.lock().await.items.get(item_id).is_some_and(|item| item.degraded)
    }

    async fn apply(this: &::std::sync::Arc<Self>, playback: &mut FeedPlayback, effects: Effects) -> Fallible<()> {
        for item_id in &effects.invalidated_grants {
            this.authorization.invalidate(item_id).await;
        }

        for item_id in &effects.forgotten_sources {
            this.resolver.forget(item_id).await;
        }

        for command in &effects.commands {
            ::std::sync::Arc::clone(&this.output_boundary).update(command).await?;
        }

        for (item_id, kind) in effects.timers {
            Self::schedule_timer(this, playback, item_id, kind);
        }

        for resolution in effects.resolutions {
            ::tokio::spawn(::std::sync::Arc::clone(this).resolve_source(resolution));
        }

        if let Some(item_id) = effects.like {
            let likes = ::std::sync::Arc::clone(&this.likes);

            ::tokio::spawn(async move {
                if let Err(error) = likes.toggle(item_id.clone()).await {
                    ::tracing::warn!(%item_id, %error, "double-tap like failed");
                }
            });
        }

        if let Some((index, direction)) = effects.prefetch {
            ::tokio::spawn(::std::sync::Arc::clone(&this.prefetcher).schedule(index, direction));
        }

        Ok(())
    }

    fn schedule_timer(this: &::std::sync::Arc<Self>, playback: &mut FeedPlayback, item_id: ItemId, kind: TimerKind) {
        playback.cancel_timer(&item_id, kind);
        playback.next_token += 1;

        let token = playback.next_token;
        let delay = match kind {
            TimerKind::SingleTap => this.settings.double_tap_window,
            TimerKind::AutoHide => this.settings.controls_auto_hide,
        };

        let task = ::tokio::spawn(::std::sync::Arc::clone(this).fire_timer(item_id.clone(), kind, token, delay));

        playback.timers.insert((item_id, kind), Timer { token, task });
    }

    fn fire_timer(
        self: ::std::sync::Arc<Self>, item_id: ItemId, kind: TimerKind, token: u64, delay: ::std::time::Duration,
    ) -> BoxFuture<'static, ()> {
        async move {
            ::tokio::time::sleep(delay).await;

            if let Err(error) = self.on_timer(item_id.clone(), kind, token).await {
                ::tracing::warn!(%item_id, ?kind, %error, "timer handling failed");
            }
        }
        .boxed()
    }

    fn resolve_source(self: ::std::sync::Arc<Self>, resolution: Resolution) -> BoxFuture<'static, ()> {
        async move {
            let Some(item) = self.feed.get(&resolution.item_id).await else {
                return;
            };

            let uri = ::std::sync::Arc::clone(&self.resolver)
                .resolve(item.id.clone(), &item.variants, self.quality.current())
                .await;

            let headers = match (&uri, resolution.authenticated) {
                (Some(_), true) => self.authorization.attach(&item.id).await,
                _ => Headers::new(),
            };

            let item_id = resolution.item_id.clone();

            if let Err(error) = self.on_source_resolved(resolution, uri, headers, item.thumbnail).await {
                ::tracing::warn!(%item_id, %error, "failed to attach resolved source");
            }
        }
        .boxed()
    }

    async fn on_source_resolved(
        self: ::std::sync::Arc<Self>, resolution: Resolution, uri: Option<MaybeOwnedString>, headers: Headers,
        thumbnail: MaybeOwnedString,
    ) -> Fallible<()> {
        let mut playback = self.state.lock().await;
        let mut effects = Effects::default();

        let current = playback.items.get(&resolution.item_id).is_some_and(|item| {
            item.generation == resolution.generation && item.state.phase == PlaybackPhase::Resolving
        });

        if !current {
            ::tracing::debug!(item_id = %resolution.item_id, "discarding stale resolution");
            return Ok(());
        }

        match uri {
            Some(uri) => {
                if let Some(item) = playback.items.get_mut(&resolution.item_id) {
                    item.state.phase = PlaybackPhase::Buffering;
                    item.state.is_buffering = true;
                }

                let request = PlaybackRequest::builder()
                    .uri(uri)
                    .headers(headers)
                    .start_position_ms(resolution.start_position_ms)
                    .build();

                effects.commands.push(PlayerCommand::Attach { item_id: resolution.item_id.clone(), request });
            },
            None => playback.degrade(&resolution.item_id, thumbnail, &mut effects),
        }

        playback.reconcile(&mut effects);

        Self::apply(&self, &mut playback, effects).await
    }

    async fn on_timer(self: ::std::sync::Arc<Self>, item_id: ItemId, kind: TimerKind, token: u64) -> Fallible<()> {
        let mut playback = self.state.lock().await;
        let mut effects = Effects::default();

        let key = (item_id.clone(), kind);
        if !matches!(playback.timers.get(&key), Some(timer) if timer.token == token) {
            return Ok(());
        }
        playback.timers.remove(&key);

        match kind {
            TimerKind::SingleTap => {
                if let Some(item) = playback.items.get_mut(&item_id) {
                    item.last_tap = None;
                }

                playback.toggle_pause(&item_id, &mut effects);
            },
            TimerKind::AutoHide => playback.hide_controls(&item_id, &mut effects),
        }

        Self::apply(&self, &mut playback, effects).await
    }
}

#[async_trait]
impl Accept<ReplaceWindowRequestModel> for PlaybackInteractor {
    async fn accept(self: ::std::sync::Arc<Self>, request: ReplaceWindowRequestModel) -> Fallible<()> {
        let retained = request.items.clone();
        let removed = self.feed.replace(request.items).await;

        let mut playback = self.state.lock().await;
        let mut effects = Effects::default();

        for item_id in removed {
            playback.evict(&item_id, &mut effects);
        }

        for item in &retained {
            let relocked = match playback.items.get(&item.id) {
                Some(state) if state.locked != item.is_locked() => item.is_locked(),
                _ => continue,
            };

            playback.set_locked(&item.id, relocked, &mut effects);
        }

        playback.reconcile(&mut effects);

        Self::apply(&self, &mut playback, effects).await
    }
}

#[async_trait]
impl Accept<ChangeVisibilityRequestModel> for PlaybackInteractor {
    async fn accept(self: ::std::sync::Arc<Self>, request: ChangeVisibilityRequestModel) -> Fallible<()> {
        let Some(item) = self.feed.get(&request.item_id).await else {
            ::tracing::debug!(item_id = %request.item_id, "visibility change for an item outside the window");
            return Ok(());
        };

        let mut playback = self.state.lock().await;
        let mut effects = Effects::default();

        if request.visible {
            playback.show(&item, &mut effects);
        } else {
            playback.hide(&item.id);
        }

        playback.reconcile(&mut effects);

        Self::apply(&self, &mut playback, effects).await
    }
}

#[async_trait]
impl Accept<FocusItemRequestModel> for PlaybackInteractor {
    async fn accept(self: ::std::sync::Arc<Self>, request: FocusItemRequestModel) -> Fallible<()> {
        let Some(item) = self.feed.at(request.index).await else {
            ::tracing::debug!(index = request.index, "focus past the end of the window");
            return Ok(());
        };

        self.quality.refresh_available(&item);

        let mut playback = self.state.lock().await;
        let mut effects = Effects::default();

        let previous = playback.active.replace(item.id.clone()).filter(|previous| *previous != item.id);

        let direction = match &previous {
            Some(previous) => match self.feed.index_of(previous).await {
                Some(index) if index > request.index => ScrollDirection::Backward,
                _ => ScrollDirection::Forward,
            },
            None => ScrollDirection::Forward,
        };

        if let Some(previous) = previous {
            playback.cancel_timers(&previous);

            if let Some(state) = playback.items.get_mut(&previous) {
                state.user_paused = false;
                state.last_tap = None;
            }

            playback.hide_controls(&previous, &mut effects);
        }

        playback.show(&item, &mut effects);
        playback.reconcile(&mut effects);

        effects.prefetch = Some((request.index, direction));

        ::tracing::debug!(item_id = %item.id, index = request.index, ?direction, "focused item");

        Self::apply(&self, &mut playback, effects).await
    }
}

#[async_trait]
impl Accept<ChangeScrollStateRequestModel> for PlaybackInteractor {
    async fn accept(self: ::std::sync::Arc<Self>, request: ChangeScrollStateRequestModel) -> Fallible<()> {
        let mut playback = self.state.lock().await;
        let mut effects = Effects::default();

        playback.scrolling = request.scrolling;
        playback.reconcile(&mut effects);

        Self::apply(&self, &mut playback, effects).await
    }
}

#[async_trait]
impl Accept<ChangeAppStateRequestModel> for PlaybackInteractor {
    async fn accept(self: ::std::sync::Arc<Self>, request: ChangeAppStateRequestModel) -> Fallible<()> {
        let mut playback = self.state.lock().await;
        let mut effects = Effects::default();

        playback.foreground = request.foreground;
        playback.reconcile(&mut effects);

        Self::apply(&self, &mut playback, effects).await
    }
}

#[async_trait]
impl Accept<TapRequestModel> for PlaybackInteractor {
    async fn accept(self: ::std::sync::Arc<Self>, request: TapRequestModel) -> Fallible<()> {
        let mut playback = self.state.lock().await;
        let mut effects = Effects::default();

        let now = ::tokio::time::Instant::now();
        let window = self.settings.double_tap_window;

        let Some(item) = playback.items.get_mut(&request.item_id) else {
            return Ok(());
        };

        match item.last_tap.take() {
            Some(previous) if now.duration_since(previous) <= window => {
                playback.cancel_timer(&request.item_id, TimerKind::SingleTap);
                effects.like = Some(request.item_id.clone());
            },
            _ => {
                item.last_tap = Some(now);
                effects.timers.push((request.item_id.clone(), TimerKind::SingleTap));
            },
        }

        Self::apply(&self, &mut playback, effects).await
    }
}

#[async_trait]
impl Accept<TogglePauseRequestModel> for PlaybackInteractor {
    async fn accept(self: ::std::sync::Arc<Self>, request: TogglePauseRequestModel) -> Fallible<()> {
        let mut playback = self.state.lock().await;
        let mut effects = Effects::default();

        playback.toggle_pause(&request.item_id, &mut effects);

        Self::apply(&self, &mut playback, effects).await
    }
}

#[async_trait]
impl Accept<SelectQualityRequestModel> for PlaybackInteractor {
    async fn accept(self: ::std::sync::Arc<Self>, request: SelectQualityRequestModel) -> Fallible<()> {
        if let Err(error) = self.quality.select(request.quality).await {
            ::tracing::warn!(quality = %request.quality, %error, "quality preference not persisted");
        }

        let mut playback = self.state.lock().await;
        let mut effects = Effects::default();

        if let Some(active) = playback.active.clone() {
            playback.restart(&active, &mut effects);
        }

        playback.reconcile(&mut effects);

        Self::apply(&self, &mut playback, effects).await
    }
}

#[async_trait]
impl Accept<PlayerReport> for PlaybackInteractor {
    async fn accept(self: ::std::sync::Arc<Self>, report: PlayerReport) -> Fallible<()> {
        let thumbnail = match report.event {
            PlayerEvent::Failed(_) => self.feed.get(&report.item_id).await.map(|item| item.thumbnail),
            _ => None,
        };

        let mut playback = self.state.lock().await;
        let mut effects = Effects::default();

        let Some(item) = playback.items.get_mut(&report.item_id) else {
            return Ok(());
        };

        match report.event {
            PlayerEvent::MetadataLoaded { duration_ms } => {
                item.state.duration_ms = duration_ms;
                item.state.is_buffering = false;

                // Failures are counted per outage; a loaded source ends it.
                if item.state.phase == PlaybackPhase::Buffering {
                    item.state.phase = PlaybackPhase::Ready;
                    item.failures = 0;
                }
            },
            PlayerEvent::Progress { position_ms } => item.state.progress_ms = position_ms,
            PlayerEvent::BufferingChanged { buffering } => item.state.is_buffering = buffering,
            PlayerEvent::Ended => {
                item.state.progress_ms = 0;
                effects.commands.push(PlayerCommand::Seek { item_id: report.item_id.clone(), position_ms: 0 });

                if item.state.phase == PlaybackPhase::Playing {
                    effects.commands.push(PlayerCommand::Play { item_id: report.item_id.clone() });
                }
            },
            PlayerEvent::Failed(failure) => {
                let retries = self.settings.max_playback_retries;

                playback.fail(&report.item_id, failure, retries, thumbnail.unwrap_or_default(), &mut effects);
            },
        }

        playback.reconcile(&mut effects);

        Self::apply(&self, &mut playback, effects).await
    }
}

#[async_trait]
impl Accept<LockStateChanged> for PlaybackInteractor {
    async fn accept(self: ::std::sync::Arc<Self>, request: LockStateChanged) -> Fallible<()> {
        let mut playback = self.state.lock().await;
        let mut effects = Effects::default();

        playback.set_locked(&request.item_id, request.locked, &mut effects);
        playback.reconcile(&mut effects);

        Self::apply(&self, &mut playback, effects).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TimerKind {
    SingleTap,
    AutoHide,
}

struct Timer {
    token: u64,
    task: ::tokio::task::JoinHandle<()>,
}

struct Resolution {
    item_id: ItemId,
    generation: u64,
    start_position_ms: u64,
    authenticated: bool,
}

/// Side effects computed under the state lock.
#[derive(Default)]
struct Effects {
    commands: Vec<PlayerCommand>,
    resolutions: Vec<Resolution>,
    timers: Vec<(ItemId, TimerKind)>,
    invalidated_grants: Vec<ItemId>,
    forgotten_sources: Vec<ItemId>,
    like: Option<ItemId>,
    prefetch: Option<(usize, ScrollDirection)>,
}

#[derive(Default)]
struct ItemPlayback {
    state: PlaybackState,
    visible: bool,
    locked: bool,
    user_paused: bool,
    controls_visible: bool,
    degraded: bool,
    failures: u32,
    grant_refreshed: bool,
    unauthenticated: bool,
    generation: u64,
    last_tap: Option<::tokio::time::Instant>,
}

impl ItemPlayback {
    fn is_attached(&self) -> bool {
        matches!(
            self.state.phase,
            PlaybackPhase::Buffering | PlaybackPhase::Ready | PlaybackPhase::Playing | PlaybackPhase::Paused
        )
    }

    fn begin_resolution(&mut self, item_id: &ItemId, start_position_ms: u64, effects: &mut Effects) {
        self.generation += 1;
        self.state.phase = PlaybackPhase::Resolving;
        self.state.is_buffering = false;

        effects.resolutions.push(Resolution {
            item_id: item_id.clone(),
            generation: self.generation,
            start_position_ms,
            authenticated: !self.unauthenticated,
        });
    }
}

struct FeedPlayback {
    items: ::std::collections::HashMap<ItemId, ItemPlayback>,
    timers: ::std::collections::HashMap<(ItemId, TimerKind), Timer>,
    active: Option<ItemId>,
    scrolling: bool,
    foreground: bool,
    next_token: u64,
}

impl Default for FeedPlayback {
    fn default() -> Self {
        Self {
            items: ::std::collections::HashMap::new(),
            timers: ::std::collections::HashMap::new(),
            active: None,
            scrolling: false,
            foreground: true,
            next_token: 0,
        }
    }
}

impl FeedPlayback {
    fn should_play(&self, item_id: &ItemId) -> bool {
        let Some(item) = self.items.get(item_id) else {
            return false;
        };

        self.active.as_ref() == Some(item_id)
            && self.foreground
            && !self.scrolling
            && item.visible
            && !item.locked
            && !item.degraded
            && !item.user_paused
    }

    /// Pauses every item that may no longer play, then starts the one that should.
    fn reconcile(&mut self, effects: &mut Effects) {
        let eligible = self.active.clone().filter(|active| self.should_play(active));

        for (item_id, item) in &mut self.items {
            if item.state.phase == PlaybackPhase::Playing && eligible.as_ref() != Some(item_id) {
                item.state.phase = PlaybackPhase::Paused;
                effects.commands.push(PlayerCommand::Pause { item_id: item_id.clone() });
            }
        }

        let Some(item_id) = eligible else {
            return;
        };

        if let Some(item) = self.items.get_mut(&item_id) {
            if matches!(item.state.phase, PlaybackPhase::Ready | PlaybackPhase::Paused) {
                item.state.phase = PlaybackPhase::Playing;
                effects.commands.push(PlayerCommand::Play { item_id });
            }
        }
    }

    fn show(&mut self, item: &FeedItem, effects: &mut Effects) {
        let state = self.items.entry(item.id.clone()).or_default();
        let appearing = !state.visible;

        state.visible = true;
        state.locked = item.is_locked();

        if state.locked {
            if appearing {
                effects.commands.push(PlayerCommand::SetGateVisible { item_id: item.id.clone(), visible: true });
            }
            return;
        }

        if state.degraded {
            if appearing {
                effects.commands.push(PlayerCommand::ShowThumbnail {
                    item_id: item.id.clone(),
                    thumbnail: item.thumbnail.clone(),
                });
            }
            return;
        }

        if state.state.phase == PlaybackPhase::Idle {
            state.begin_resolution(&item.id, 0, effects);
        }
    }

    fn hide(&mut self, item_id: &ItemId) {
        let Some(item) = self.items.get_mut(item_id) else {
            return;
        };

        item.visible = false;

        // An unfinished resolution keeps running and lands in the cache, but will not attach.
        if item.state.phase == PlaybackPhase::Resolving {
            item.generation += 1;
            item.state.phase = PlaybackPhase::Idle;
        }
    }

    /// Re-resolves an item in place, resuming from its current position.
    fn restart(&mut self, item_id: &ItemId, effects: &mut Effects) {
        let Some(item) = self.items.get_mut(item_id) else {
            return;
        };

        if item.locked || item.degraded || item.state.phase == PlaybackPhase::Idle {
            return;
        }

        if item.state.phase == PlaybackPhase::Playing {
            effects.commands.push(PlayerCommand::Pause { item_id: item_id.clone() });
        }

        let position = item.state.progress_ms;
        item.begin_resolution(item_id, position, effects);
    }

    fn fail(
        &mut self, item_id: &ItemId, failure: PlaybackFailure, max_retries: u32, thumbnail: MaybeOwnedString,
        effects: &mut Effects,
    ) {
        let Some(item) = self.items.get_mut(item_id) else {
            return;
        };

        // While resolving, reports come from the surface being replaced.
        if item.degraded || matches!(item.state.phase, PlaybackPhase::Idle | PlaybackPhase::Resolving) {
            return;
        }

        item.state.phase = PlaybackPhase::Error;
        item.failures += 1;

        match failure {
            PlaybackFailure::Unauthorized if !item.grant_refreshed => {
                item.grant_refreshed = true;
                effects.invalidated_grants.push(item_id.clone());
            },
            PlaybackFailure::Unauthorized => item.unauthenticated = true,
            PlaybackFailure::Decode | PlaybackFailure::Network => effects.forgotten_sources.push(item_id.clone()),
        }

        if item.failures > max_retries {
            ::tracing::warn!(%item_id, failures = item.failures, ?failure, "giving up on playback");
            self.degrade(item_id, thumbnail, effects);
            return;
        }

        ::tracing::debug!(%item_id, failures = item.failures, ?failure, "retrying playback");

        let position = item.state.progress_ms;
        item.begin_resolution(item_id, position, effects);
    }

    /// Opens or closes an item's gate. A closed gate tears the surface down, an opened one
    /// starts resolution if the item is on screen.
    fn set_locked(&mut self, item_id: &ItemId, locked: bool, effects: &mut Effects) {
        let Some(item) = self.items.get_mut(item_id) else {
            return;
        };

        item.locked = locked;
        effects.commands.push(PlayerCommand::SetGateVisible { item_id: item_id.clone(), visible: locked });

        if locked {
            if item.state.phase == PlaybackPhase::Playing {
                effects.commands.push(PlayerCommand::Pause { item_id: item_id.clone() });
            }

            if item.is_attached() {
                effects.commands.push(PlayerCommand::Release { item_id: item_id.clone() });
            }

            item.generation += 1;
            item.state = PlaybackState::default();
        } else if item.visible && !item.degraded && item.state.phase == PlaybackPhase::Idle {
            item.begin_resolution(item_id, 0, effects);
        }

        ::tracing::info!(%item_id, locked, "gate changed");
    }

    fn degrade(&mut self, item_id: &ItemId, thumbnail: MaybeOwnedString, effects: &mut Effects) {
        self.cancel_timers(item_id);

        let Some(item) = self.items.get_mut(item_id) else {
            return;
        };

        if item.state.phase != PlaybackPhase::Idle && item.state.phase != PlaybackPhase::Resolving {
            effects.commands.push(PlayerCommand::Release { item_id: item_id.clone() });
        }

        item.degraded = true;
        item.generation += 1;
        item.state.phase = PlaybackPhase::Idle;
        item.state.is_buffering = false;

        effects.commands.push(PlayerCommand::ShowThumbnail { item_id: item_id.clone(), thumbnail });
    }

    fn evict(&mut self, item_id: &ItemId, effects: &mut Effects) {
        self.cancel_timers(item_id);

        if self.active.as_ref() == Some(item_id) {
            self.active = None;
        }

        let Some(item) = self.items.remove(item_id) else {
            return;
        };

        if item.state.phase == PlaybackPhase::Playing {
            effects.commands.push(PlayerCommand::Pause { item_id: item_id.clone() });
        }

        if item.is_attached() {
            effects.commands.push(PlayerCommand::Release { item_id: item_id.clone() });
        }

        effects.invalidated_grants.push(item_id.clone());
    }

    fn toggle_pause(&mut self, item_id: &ItemId, effects: &mut Effects) {
        if self.active.as_ref() != Some(item_id) {
            return;
        }

        let Some(item) = self.items.get_mut(item_id) else {
            return;
        };

        item.user_paused = !item.user_paused;
        item.controls_visible = true;
        effects.commands.push(PlayerCommand::SetControlsVisible { item_id: item_id.clone(), visible: true });

        self.reconcile(effects);
        self.cancel_timer(item_id, TimerKind::AutoHide);

        if self.items.get(item_id).is_some_and(|item| !item.user_paused) {
            effects.timers.push((item_id.clone(), TimerKind::AutoHide));
        }
    }

    fn hide_controls(&mut self, item_id: &ItemId, effects: &mut Effects) {
        let Some(item) = self.items.get_mut(item_id) else {
            return;
        };

        if item.controls_visible && !item.user_paused {
            item.controls_visible = false;
            effects.commands.push(PlayerCommand::SetControlsVisible { item_id: item_id.clone(), visible: false });
        }
    }

    fn cancel_timer(&mut self, item_id: &ItemId, kind: TimerKind) {
        if let Some(timer) = self.timers.remove(&(item_id.clone(), kind)) {
            timer.task.abort();
        }
    }

    fn cancel_timers(&mut self, item_id: &ItemId) {
        self.timers.retain(|(timer_item_id, _), timer| {
            let keep = timer_item_id != item_id;
            if !keep {
                timer.task.abort();
            }
            keep
        });
    }
}
