use ::domain::AdKind;
use ::domain::ItemId;
use ::domain::UnlockKind;
use ::futures_util::StreamExt as _;

use crate::boundaries::Accept;
use crate::boundaries::InteractionOutputBoundary;
use crate::boundaries::LockStateChanged;
use crate::errors::MonetizationError;
use crate::gateways::AdNetworkClient;
use crate::gateways::BalanceBackend;
use crate::models::descriptors::AdContext;
use crate::models::descriptors::Reward;
use crate::models::events::AdLifecycle;
use crate::models::events::AdNetworkEvent;
use crate::models::events::InteractionEvent;
use crate::models::events::ShowAdOutcome;
use crate::services::feed::FeedWindow;
use crate::services::quota::QuotaStore;
use crate::settings::EngineSettings;
use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedString;

/// Ad slots, quota gating, reward crediting and coin unlocks.
///
/// Anything that moves coins or opens a gate is applied locally first and rolled back,
/// with an alert, when the backend refuses it.
#[derive(::bon::Builder)]
pub struct MonetizationInteractor {
    output_boundary: ::std::sync::Arc<dyn InteractionOutputBoundary>,

    ads: ::std::sync::Arc<dyn AdNetworkClient>,
    backend: ::std::sync::Arc<dyn BalanceBackend>,
    quota: ::std::sync::Arc<QuotaStore>,
    feed: ::std::sync::Arc<FeedWindow>,
    playback: ::std::sync::Arc<dyn Accept<LockStateChanged>>,

    #[builder(into)]
    user_id: MaybeOwnedString,

    #[builder(default)]
    settings: EngineSettings,

    #[builder(skip)]
    slots: ::tokio::sync::Mutex<::std::collections::HashMap<AdKind, AdLifecycle>>,

    #[builder(skip)]
    balance: ::tokio::sync::Mutex<Option<u64>>,
}

impl MonetizationInteractor {
    /// Whether another ad of `kind` may be watched today.
    pub async fn can_consume(&self, kind: AdKind, item_id: Option<&ItemId>) -> Fallible<bool> {
        let quota = self.quota.snapshot().await?;

        if quota.daily_count >= self.settings.daily_ad_cap {
            return Ok(false);
        }

        match kind {
            AdKind::Unlock => Ok(item_id.is_some_and(|item_id| quota.unlocks_for(item_id) < self.settings.per_item_unlock_cap)),
            AdKind::DailyCheckin => Ok(!self.quota.checked_in_today().await?),
            AdKind::Reward | AdKind::Benefit => Ok(true),
        }
    }

    pub async fn ad_state(&self, kind: AdKind) -> AdLifecycle {
        self.slots.lock().await.get(&kind).copied().unwrap_or_default()
    }

    pub async fn balance(&self) -> Option<u64> {
        *self.balance.lock().await
    }

    /// Starts loading every ad kind so the first show does not wait on the network.
    pub async fn warm_up(self: ::std::sync::Arc<Self>) -> Fallible<()> {
        let loads = AdKind::ALL.map(|kind| ::std::sync::Arc::clone(&self).load(kind));

        ::futures_util::future::try_join_all(loads).await?;

        Ok(())
    }

    /// Loads one ad of `kind`, retrying a bounded number of times.
    ///
    /// Does nothing when the slot is already loading, loaded or showing.
    pub async fn load(self: ::std::sync::Arc<Self>, kind: AdKind) -> Fallible<()> {
        {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(kind).or_default();

            if matches!(slot, AdLifecycle::Loading | AdLifecycle::Loaded | AdLifecycle::Showing) {
                return Ok(());
            }

            *slot = AdLifecycle::Loading;
        }

        self.announce(kind, AdLifecycle::Loading).await?;

        let attempts = self.settings.ad_load_attempts.max(1);

        for attempt in 1..=attempts {
            match ::std::sync::Arc::clone(&self.ads).load(kind).await {
                Ok(()) => {
                    ::tracing::debug!(kind = %kind, attempt, "ad loaded");
                    return self.transition(kind, AdLifecycle::Loaded).await;
                },
                Err(error) => {
                    ::tracing::warn!(kind = %kind, attempt, %error, "ad failed to load");

                    if attempt < attempts {
                        ::tokio::time::sleep(self.settings.ad_load_retry_delay).await;
                    }
                },
            }
        }

        self.transition(kind, AdLifecycle::NotLoaded).await
    }

    /// Shows an ad of `kind` and credits its reward.
    ///
    /// The quota is checked before the ad network is touched. An ad that is not loaded yet
    /// starts loading and reports `Loading` instead of failing.
    pub async fn show_ad(self: ::std::sync::Arc<Self>, kind: AdKind, context: AdContext) -> Fallible<ShowAdOutcome> {
        match kind {
            AdKind::Unlock if context.item_id.is_none() => return Err(MonetizationError::MissingTarget(kind).into()),
            AdKind::Benefit if context.benefit_id.is_none() => return Err(MonetizationError::MissingTarget(kind).into()),
            _ => (),
        }

        if !self.can_consume(kind, context.item_id.as_ref()).await? {
            ::tracing::info!(kind = %kind, "ad quota exhausted");
            self.emit(InteractionEvent::QuotaExhausted { kind }).await?;
            return Ok(ShowAdOutcome::QuotaExhausted);
        }

        let previous = {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(kind).or_default();
            let previous = *slot;

            if previous == AdLifecycle::Loaded {
                *slot = AdLifecycle::Showing;
            }

            previous
        };

        match previous {
            AdLifecycle::Loaded => (),
            AdLifecycle::Showing => return Ok(ShowAdOutcome::Busy),
            AdLifecycle::NotLoaded | AdLifecycle::Closed | AdLifecycle::Loading => {
                self.emit(InteractionEvent::AdLoading { kind }).await?;
                Self::spawn_load(&self, kind);
                return Ok(ShowAdOutcome::Loading);
            },
        }

        self.announce(kind, AdLifecycle::Showing).await?;

        let mut events = match ::std::sync::Arc::clone(&self.ads).show(kind).await {
            Ok(events) => events,
            Err(error) => {
                ::tracing::warn!(kind = %kind, %error, "ad failed to show");
                self.transition(kind, AdLifecycle::NotLoaded).await?;
                self.emit(InteractionEvent::AdLoading { kind }).await?;
                Self::spawn_load(&self, kind);
                return Ok(ShowAdOutcome::Loading);
            },
        };

        let mut rewarded = false;

        while let Some(event) = events.next().await {
            match event {
                AdNetworkEvent::RewardEarned(reward) => {
                    match ::std::sync::Arc::clone(&self).credit_reward(kind, reward, context.clone()).await {
                        Ok(()) => rewarded = true,
                        Err(error) => ::tracing::warn!(kind = %kind, %error, "reward not credited"),
                    }
                },
                AdNetworkEvent::Closed => break,
            }
        }

        self.transition(kind, AdLifecycle::Closed).await?;
        Self::spawn_load(&self, kind);

        Ok(ShowAdOutcome::Completed { rewarded })
    }

    /// Counts the watched ad, then applies its reward by kind.
    pub async fn credit_reward(self: ::std::sync::Arc<Self>, kind: AdKind, reward: Reward, context: AdContext) -> Fallible<()> {
        self.quota
            .record(kind, context.item_id.as_ref())
            .await
            .map_err(MonetizationError::Storage)?;

        match kind {
            AdKind::Reward | AdKind::Benefit => self.credit_coins(kind, reward, context).await,
            AdKind::Unlock => self.credit_unlock(context).await,
            AdKind::DailyCheckin => self.credit_checkin(reward, context).await,
        }
    }

    /// Opens a coin-gated item, optimistically.
    pub async fn unlock_with_coins(self: ::std::sync::Arc<Self>, item_id: ItemId) -> Fallible<()> {
        let item = self
            .feed
            .get(&item_id)
            .await
            .ok_or_else(|| MonetizationError::UnknownItem(item_id.clone()))?;

        if !item.is_locked() {
            return Err(MonetizationError::NotLocked(item_id).into());
        }

        if item.lock.unlock_kind != Some(UnlockKind::Coins) {
            return Err(MonetizationError::NotCoinGated(item_id).into());
        }

        let price = item.lock.price;
        let before = self.adjust_balance(|balance| balance.saturating_sub(price)).await?;
        self.set_locked(&item_id, false).await?;

        match ::std::sync::Arc::clone(&self.backend).spend_coins(item_id.clone(), price).await {
            Ok(receipt) => {
                ::tracing::info!(%item_id, price, "unlocked with coins");

                if let Some(balance) = receipt.balance {
                    self.store_balance(Some(balance)).await?;
                }

                Ok(())
            },
            Err(error) => {
                let error = MonetizationError::from(error);
                ::tracing::warn!(%item_id, %error, "coin unlock rejected, rolling back");

                self.set_locked(&item_id, true).await?;
                self.store_balance(before).await?;
                self.alert(&error).await?;

                Err(error.into())
            },
        }
    }

    pub async fn refresh_balance(&self) -> Fallible<u64> {
        let balance = ::std::sync::Arc::clone(&self.backend)
            .balance(self.user_id.clone())
            .await
            .map_err(MonetizationError::from)?;

        self.store_balance(Some(balance)).await?;

        Ok(balance)
    }

    async fn credit_coins(&self, kind: AdKind, reward: Reward, context: AdContext) -> Fallible<()> {
        let before = self.adjust_balance(|balance| balance.saturating_add(reward.amount)).await?;

        match ::std::sync::Arc::clone(&self.backend).record_ad_reward(kind, context).await {
            Ok(receipt) => {
                ::tracing::info!(kind = %kind, coins = receipt.coins, "ad reward credited");

                match receipt.balance {
                    Some(balance) => self.store_balance(Some(balance)).await?,
                    None => {
                        if let Err(error) = self.refresh_balance().await {
                            ::tracing::warn!(%error, "balance refresh failed");
                        }
                    },
                }

                Ok(())
            },
            Err(error) => {
                let error = MonetizationError::from(error);

                self.store_balance(before).await?;
                self.alert(&error).await?;

                Err(error.into())
            },
        }
    }

    async fn credit_unlock(&self, context: AdContext) -> Fallible<()> {
        let item_id = context
            .item_id
            .clone()
            .ok_or(MonetizationError::MissingTarget(AdKind::Unlock))?;

        self.set_locked(&item_id, false).await?;

        match ::std::sync::Arc::clone(&self.backend).record_ad_reward(AdKind::Unlock, context).await {
            Ok(_) => {
                ::tracing::info!(%item_id, "unlocked by ad");
                Ok(())
            },
            Err(error) => {
                let error = MonetizationError::from(error);

                self.set_locked(&item_id, true).await?;
                self.alert(&error).await?;

                Err(error.into())
            },
        }
    }

    async fn credit_checkin(&self, reward: Reward, context: AdContext) -> Fallible<()> {
        let date = self.quota.mark_checked_in().await.map_err(MonetizationError::Storage)?;
        self.emit(InteractionEvent::CheckedIn { date }).await?;

        let before = self.adjust_balance(|balance| balance.saturating_add(reward.amount)).await?;

        match ::std::sync::Arc::clone(&self.backend).record_ad_reward(AdKind::DailyCheckin, context).await {
            Ok(receipt) => {
                if let Some(balance) = receipt.balance {
                    self.store_balance(Some(balance)).await?;
                }

                Ok(())
            },
            Err(error) => {
                let error = MonetizationError::from(error);

                self.quota.clear_checked_in().await.map_err(MonetizationError::Storage)?;
                self.store_balance(before).await?;
                self.alert(&error).await?;

                Err(error.into())
            },
        }
    }

    /// Flips the gate in the feed, tells the player surfaces, then the UI.
    async fn set_locked(&self, item_id: &ItemId, locked: bool) -> Fallible<()> {
        self.feed
            .update(item_id, |item| item.lock.is_locked = locked)
            .await
            .ok_or_else(|| MonetizationError::UnknownItem(item_id.clone()))?;

        ::std::sync::Arc::clone(&self.playback)
            .accept(LockStateChanged::new(item_id.clone(), locked))
            .await?;

        self.emit(InteractionEvent::LockChanged { item_id: item_id.clone(), locked }).await
    }

    /// Applies `f` to a known balance and returns the previous one.
    async fn adjust_balance<F>(&self, f: F) -> Fallible<Option<u64>>
    where
        F: FnOnce(u64) -> u64,
    {
        let (before, after) = {
            let mut balance = self.balance.lock().await;
            let before = *balance;
            *balance = before.map(f);

            (before, *balance)
        };

        if let Some(balance) = after {
            self.emit(InteractionEvent::BalanceChanged { balance }).await?;
        }

        Ok(before)
    }

    async fn store_balance(&self, balance: Option<u64>) -> Fallible<()> {
        *self.balance.lock().await = balance;

        match balance {
            Some(balance) => self.emit(InteractionEvent::BalanceChanged { balance }).await,
            None => Ok(()),
        }
    }

    async fn transition(&self, kind: AdKind, state: AdLifecycle) -> Fallible<()> {
        self.slots.lock().await.insert(kind, state);
        self.announce(kind, state).await
    }

    async fn announce(&self, kind: AdKind, state: AdLifecycle) -> Fallible<()> {
        self.emit(InteractionEvent::AdStateChanged { kind, state }).await
    }

    async fn alert(&self, error: &MonetizationError) -> Fallible<()> {
        self.emit(InteractionEvent::Alert { message: error.user_message().into() }).await
    }

    async fn emit(&self, event: InteractionEvent) -> Fallible<()> {
        ::std::sync::Arc::clone(&self.output_boundary).update(&event).await
    }

    fn spawn_load(this: &::std::sync::Arc<Self>, kind: AdKind) {
        let this = ::std::sync::Arc::clone(this);

        ::tokio::spawn(async move {
            if let Err(error) = this.load(kind).await {
                ::tracing::warn!(kind = %kind, %error, "ad reload failed");
            }
        });
    }
}
