use ::domain::FeedItem;
use ::domain::Quality;

use crate::gateways::KeyValueStore;
use crate::utils::aliases::Fallible;

const PREFERENCE_KEY: &str = "playback_quality";

/// Process-wide playback quality preference, persisted across runs.
pub struct QualityPreferenceStore {
    store: ::std::sync::Arc<dyn KeyValueStore>,
    current: ::std::sync::RwLock<Quality>,
    available: ::std::sync::RwLock<Vec<Quality>>,
}

impl QualityPreferenceStore {
    /// Restores the persisted preference; missing or unreadable values mean `auto`.
    pub async fn load(store: ::std::sync::Arc<dyn KeyValueStore>) -> Fallible<Self> {
        let current = match ::std::sync::Arc::clone(&store).get(PREFERENCE_KEY).await? {
            Some(value) => ::serde_json::from_value(value).unwrap_or_else(|error| {
                ::tracing::warn!(%error, "discarding unreadable quality preference");
                Quality::Auto
            }),
            None => Quality::Auto,
        };

        Ok(Self {
            store,
            current: ::std::sync::RwLock::new(current),
            available: ::std::sync::RwLock::new(Vec::new()),
        })
    }

    pub fn current(&self) -> Quality {
        self.current.read().map(|quality| *quality).unwrap_or_default()
    }

    /// Stores `quality` and persists it.
    ///
    /// The in-memory value changes even when persisting fails.
    pub async fn select(&self, quality: Quality) -> Fallible<()> {
        if let Ok(mut current) = self.current.write() {
            *current = quality;
        }

        ::std::sync::Arc::clone(&self.store)
            .set(PREFERENCE_KEY, ::serde_json::to_value(quality)?)
            .await?;

        ::tracing::info!(quality = %quality, "playback quality selected");

        Ok(())
    }

    /// Derives the choices offered for the focused item.
    pub fn refresh_available(&self, item: &FeedItem) -> Vec<Quality> {
        let available = item.variants.available();

        if let Ok(mut current) = self.available.write() {
            current.clone_from(&available);
        }

        available
    }

    pub fn available(&self) -> Vec<Quality> {
        self.available.read().map(|available| available.clone()).unwrap_or_default()
    }
}
