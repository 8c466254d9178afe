use ::domain::AdKind;
use ::domain::ItemId;

use crate::gateways::Clock;
use crate::gateways::KeyValueStore;
use crate::utils::aliases::Fallible;

const QUOTA_KEY: &str = "ad_quota";
const CHECKIN_KEY: &str = "daily_checkin_date";

/// Persisted ad consumption counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, ::serde::Serialize, ::serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuotaState {
    pub daily_count: u32,
    pub last_reset_date: Option<::chrono::NaiveDate>,
    pub per_item_count: ::std::collections::BTreeMap<String, u32>,
}

impl QuotaState {
    pub fn unlocks_for(&self, item_id: &str) -> u32 {
        self.per_item_count.get(item_id).copied().unwrap_or_default()
    }
}

/// Counts how many ads a user has watched, per day and per item.
///
/// All mutations are serialized, so two concurrent recordings never lose an increment.
/// The daily counter resets the first time it is read on a new calendar day.
pub struct QuotaStore {
    store: ::std::sync::Arc<dyn KeyValueStore>,
    clock: ::std::sync::Arc<dyn Clock>,
    guard: ::tokio::sync::Mutex<()>,
}

impl QuotaStore {
    pub fn new(store: ::std::sync::Arc<dyn KeyValueStore>, clock: ::std::sync::Arc<dyn Clock>) -> Self {
        Self { store, clock, guard: ::tokio::sync::Mutex::new(()) }
    }

    /// Current counters, with the daily counter reset if the stored date is not today.
    pub async fn snapshot(&self) -> Fallible<QuotaState> {
        let _guard = self.guard.lock().await;

        self.load_current().await
    }

    /// Counts one watched ad. Unlock ads also count towards `item_id`.
    pub async fn record(&self, kind: AdKind, item_id: Option<&ItemId>) -> Fallible<QuotaState> {
        let _guard = self.guard.lock().await;

        let mut state = self.load_current().await?;
        state.daily_count += 1;

        if let (AdKind::Unlock, Some(item_id)) = (kind, item_id) {
            *state.per_item_count.entry(item_id.to_string()).or_default() += 1;
        }

        self.save(&state).await?;

        ::tracing::debug!(
            kind = %kind,
            daily_count = state.daily_count,
            item_id = item_id.map(|item_id| item_id.as_ref()),
            "recorded watched ad",
        );

        Ok(state)
    }

    pub async fn checked_in_today(&self) -> Fallible<bool> {
        let stored = ::std::sync::Arc::clone(&self.store).get(CHECKIN_KEY).await?;

        let date = match stored {
            Some(value) => ::serde_json::from_value::<::chrono::NaiveDate>(value).ok(),
            None => None,
        };

        Ok(date == Some(self.clock.today()))
    }

    pub async fn mark_checked_in(&self) -> Fallible<::chrono::NaiveDate> {
        let today = self.clock.today();

        ::std::sync::Arc::clone(&self.store)
            .set(CHECKIN_KEY, ::serde_json::to_value(today)?)
            .await?;

        Ok(today)
    }

    pub async fn clear_checked_in(&self) -> Fallible<()> {
        ::std::sync::Arc::clone(&self.store).delete(CHECKIN_KEY).await
    }

    async fn load_current(&self) -> Fallible<QuotaState> {
        let today = self.clock.today();

        let mut state = match ::std::sync::Arc::clone(&self.store).get(QUOTA_KEY).await? {
            Some(value) => ::serde_json::from_value(value).unwrap_or_else(|error| {
                ::tracing::warn!(%error, "discarding unreadable ad quota");
                QuotaState::default()
            }),
            None => QuotaState::default(),
        };

        if state.last_reset_date != Some(today) {
            state.daily_count = 0;
            state.last_reset_date = Some(today);
            self.save(&state).await?;
        }

        Ok(state)
    }

    async fn save(&self, state: &QuotaState) -> Fallible<()> {
        ::std::sync::Arc::clone(&self.store)
            .set(QUOTA_KEY, ::serde_json::to_value(state)?)
            .await
    }
}
