use ::domain::AdKind;
use ::domain::FeedItem;
use ::domain::ItemId;
use ::domain::Quality;
use ::domain::UnlockKind;
use ::use_cases::boundaries::Accept;
use ::use_cases::boundaries::ChangeAppStateRequestModel;
use ::use_cases::boundaries::ChangeScrollStateRequestModel;
use ::use_cases::boundaries::ChangeVisibilityRequestModel;
use ::use_cases::boundaries::FocusItemRequestModel;
use ::use_cases::boundaries::ReplaceWindowRequestModel;
use ::use_cases::boundaries::SelectQualityRequestModel;
use ::use_cases::boundaries::TapRequestModel;
use ::use_cases::boundaries::TogglePauseRequestModel;
use ::use_cases::gateways::ContentFeedProvider;
use ::use_cases::interactors::likes::LikeInteractor;
use ::use_cases::interactors::monetization::MonetizationInteractor;
use ::use_cases::interactors::playback::PlaybackInteractor;
use ::use_cases::models::descriptors::AdContext;
use ::use_cases::services::feed::FeedWindow;

use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedString;

/// One user gesture or pause in a scripted session.
#[derive(Debug, Clone, PartialEq, ::serde::Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum SessionStep {
    /// Swipes from the active item to `index` and settles there.
    Scroll { index: usize },
    Visibility { item: ItemId, visible: bool },
    Background,
    Foreground,
    Tap { item: ItemId },
    DoubleTap { item: ItemId },
    TogglePause { item: ItemId },
    WatchAd {
        kind: AdKind,
        #[serde(default)]
        item: Option<ItemId>,
        #[serde(default)]
        benefit: Option<MaybeOwnedString>,
    },
    SpendCoins { item: ItemId },
    Like { item: ItemId },
    Quality { quality: Quality },
    /// Appends the next feed page to the retained window.
    NextPage,
    Wait { ms: u64 },
}

/// Walks the whole feed: gestures on the first item, a few ads, then every item in order,
/// unlocking gated ones the way they ask to be unlocked.
pub fn demo(items: &[FeedItem]) -> Vec<SessionStep> {
    let Some(first) = items.first() else {
        return Vec::new();
    };

    let wait = |ms| SessionStep::Wait { ms };
    let quality = first.variants.available().get(1).copied().unwrap_or_default();

    let mut steps = vec![
        SessionStep::WatchAd { kind: AdKind::Reward, item: None, benefit: None },
        wait(1_000),
        SessionStep::Scroll { index: 0 },
        wait(1_500),
        SessionStep::Tap { item: first.id.clone() },
        wait(800),
        SessionStep::Tap { item: first.id.clone() },
        wait(2_500),
        SessionStep::DoubleTap { item: first.id.clone() },
        wait(500),
        SessionStep::Quality { quality },
        wait(1_500),
        SessionStep::Background,
        wait(500),
        SessionStep::Foreground,
        wait(1_000),
        SessionStep::WatchAd { kind: AdKind::Reward, item: None, benefit: None },
        wait(500),
        SessionStep::WatchAd { kind: AdKind::DailyCheckin, item: None, benefit: None },
        wait(500),
    ];

    for (index, item) in items.iter().enumerate().skip(1) {
        steps.extend([SessionStep::Scroll { index }, wait(1_200)]);

        if !item.is_locked() {
            continue;
        }

        let unlock = match item.lock.unlock_kind {
            Some(UnlockKind::Coins) => SessionStep::SpendCoins { item: item.id.clone() },
            Some(UnlockKind::Ads) | None => {
                SessionStep::WatchAd { kind: AdKind::Unlock, item: Some(item.id.clone()), benefit: None }
            },
        };

        steps.extend([unlock, wait(1_500)]);
    }

    steps.extend([SessionStep::Scroll { index: 0 }, wait(1_000)]);
    steps
}

/// Replays session steps against the engine, the way the feed UI would drive it.
#[derive(::bon::Builder)]
pub struct Session {
    playback: ::std::sync::Arc<PlaybackInteractor>,
    monetization: ::std::sync::Arc<MonetizationInteractor>,
    likes: ::std::sync::Arc<LikeInteractor>,
    feed: ::std::sync::Arc<FeedWindow>,
    provider: ::std::sync::Arc<dyn ContentFeedProvider>,

    /// Gap between the two taps of a double tap.
    #[builder(default = ::std::time::Duration::from_millis(120))]
    tap_gap: ::std::time::Duration,

    #[builder(skip)]
    active: Option<usize>,

    #[builder(skip)]
    cursor: Option<MaybeOwnedString>,

    #[builder(skip)]
    exhausted: bool,
}

impl Session {
    pub async fn play(&mut self, steps: Vec<SessionStep>) -> Fallible<()> {
        for step in steps {
            ::tracing::info!(?step, "session step");
            self.step(step).await?;
        }

        Ok(())
    }

    pub async fn step(&mut self, step: SessionStep) -> Fallible<()> {
        match step {
            SessionStep::Scroll { index } => self.scroll(index).await?,
            SessionStep::Visibility { item, visible } => {
                self.playback.clone().accept(ChangeVisibilityRequestModel::new(item, visible)).await?
            },
            SessionStep::Background => self.playback.clone().accept(ChangeAppStateRequestModel::new(false)).await?,
            SessionStep::Foreground => self.playback.clone().accept(ChangeAppStateRequestModel::new(true)).await?,
            SessionStep::Tap { item } => self.playback.clone().accept(TapRequestModel::new(item)).await?,
            SessionStep::DoubleTap { item } => {
                self.playback.clone().accept(TapRequestModel::new(item.clone())).await?;
                ::tokio::time::sleep(self.tap_gap).await;
                self.playback.clone().accept(TapRequestModel::new(item)).await?;
            },
            SessionStep::TogglePause { item } => {
                self.playback.clone().accept(TogglePauseRequestModel::new(item)).await?
            },
            SessionStep::WatchAd { kind, item, benefit } => {
                let context = AdContext { item_id: item, benefit_id: benefit };

                match self.monetization.clone().show_ad(kind, context).await {
                    Ok(outcome) => ::tracing::info!(%kind, ?outcome, "ad opportunity settled"),
                    Err(error) => ::tracing::warn!(%kind, %error, "ad opportunity rejected"),
                }
            },
            SessionStep::SpendCoins { item } => {
                if let Err(error) = self.monetization.clone().unlock_with_coins(item.clone()).await {
                    ::tracing::warn!(item_id = %item, %error, "coin unlock failed");
                }
            },
            SessionStep::Like { item } => {
                if let Err(error) = self.likes.clone().toggle(item.clone()).await {
                    ::tracing::warn!(item_id = %item, %error, "like toggle failed");
                }
            },
            SessionStep::Quality { quality } => {
                self.playback.clone().accept(SelectQualityRequestModel::new(quality)).await?
            },
            SessionStep::NextPage => self.next_page().await?,
            SessionStep::Wait { ms } => ::tokio::time::sleep(::std::time::Duration::from_millis(ms)).await,
        }

        Ok(())
    }

    /// Loads the next feed page, if any, keeping the items already in the window.
    pub async fn next_page(&mut self) -> Fallible<()> {
        if self.exhausted {
            ::tracing::info!("feed has no more pages");
            return Ok(());
        }

        let page = ::std::sync::Arc::clone(&self.provider).page(self.cursor.clone()).await?;
        ::tracing::info!(items = page.items.len(), "feed page loaded");

        let mut items = self.feed.items().await;
        items.extend(page.items);

        self.playback.clone().accept(ReplaceWindowRequestModel::new(items)).await?;

        self.exhausted = page.next_cursor.is_none();
        self.cursor = page.next_cursor;

        Ok(())
    }

    async fn scroll(&mut self, index: usize) -> Fallible<()> {
        let Some(target) = self.feed.at(index).await else {
            ::tracing::warn!(index, "scroll past the end of the feed");
            return Ok(());
        };

        self.playback.clone().accept(ChangeScrollStateRequestModel::new(true)).await?;

        let previous = match self.active.filter(|active| *active != index) {
            Some(active) => self.feed.at(active).await,
            None => None,
        };

        if let Some(previous) = previous {
            self.playback.clone().accept(ChangeVisibilityRequestModel::new(previous.id, false)).await?;
        }

        self.playback.clone().accept(ChangeVisibilityRequestModel::new(target.id, true)).await?;
        self.playback.clone().accept(ChangeScrollStateRequestModel::new(false)).await?;
        self.playback.clone().accept(FocusItemRequestModel::new(index)).await?;

        self.active = Some(index);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ::domain::Lock;
    use ::domain::Variants;

    use super::*;

    fn item(id: &'static str, lock: Lock) -> FeedItem {
        FeedItem::builder()
            .id(id)
            .variants(Variants::new().with(Quality::Auto, "a.m3u8").with(Quality::P720, "a-720.mp4"))
            .lock(lock)
            .build()
    }

    #[test]
    fn script_steps_are_read_from_json() {
        let steps: Vec<SessionStep> = ::serde_json::from_str(
            r#"[
                {"step": "scroll", "index": 1},
                {"step": "watch_ad", "kind": "unlock", "item": "b"},
                {"step": "watch_ad", "kind": "benefit", "benefit": "weekly"},
                {"step": "quality", "quality": "720p"},
                {"step": "background"},
                {"step": "wait", "ms": 250}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            steps,
            vec![
                SessionStep::Scroll { index: 1 },
                SessionStep::WatchAd { kind: AdKind::Unlock, item: Some("b".into()), benefit: None },
                SessionStep::WatchAd { kind: AdKind::Benefit, item: None, benefit: Some("weekly".into()) },
                SessionStep::Quality { quality: Quality::P720 },
                SessionStep::Background,
                SessionStep::Wait { ms: 250 },
            ],
        );
    }

    #[test]
    fn demo_unlocks_gated_items_their_own_way() {
        let steps = demo(&[item("a", Lock::open()), item("b", Lock::ads()), item("c", Lock::coins(50))]);

        assert!(steps.contains(&SessionStep::Quality { quality: Quality::P720 }));
        assert!(steps.contains(&SessionStep::WatchAd { kind: AdKind::Unlock, item: Some("b".into()), benefit: None }));
        assert!(steps.contains(&SessionStep::SpendCoins { item: "c".into() }));
        assert_eq!(steps.iter().filter(|step| matches!(step, SessionStep::Scroll { .. })).count(), 4);
    }

    #[test]
    fn demo_of_an_empty_feed_does_nothing() {
        assert!(demo(&[]).is_empty());
    }
}
