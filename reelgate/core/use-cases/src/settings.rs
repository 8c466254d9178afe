//! Engine tunables.
//!
//! Every field has a default, so a settings file only needs the values it overrides.
//! Durations are written in milliseconds.

use ::std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, ::serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    /// Maximum number of resolved sources kept in the cache.
    /// Default: 50.
    pub cache_capacity: usize,

    /// Age after which a resolved source is treated as absent.
    /// Default: 30 minutes.
    #[serde(rename = "cacheTtlMs", with = "millis")]
    pub cache_ttl: Duration,

    /// Budget for the optimized resolution before falling back to the direct rendition.
    /// Default: 1 second.
    #[serde(rename = "resolveTimeoutMs", with = "millis")]
    pub resolve_timeout: Duration,

    /// How many items past the active one are resolved ahead of time.
    /// Default: 2.
    pub prefetch_ahead: usize,

    /// Maximum number of concurrent prefetch resolutions.
    /// Default: 2.
    pub prefetch_concurrency: usize,

    /// Silent retries after a playback failure before the item degrades to its thumbnail.
    /// Default: 3.
    pub max_playback_retries: u32,

    /// Delay after which the controls overlay hides itself while playing.
    /// Default: 2 seconds.
    #[serde(rename = "controlsAutoHideMs", with = "millis")]
    pub controls_auto_hide: Duration,

    /// Two taps closer than this form a double tap.
    /// Default: 300 milliseconds.
    #[serde(rename = "doubleTapWindowMs", with = "millis")]
    pub double_tap_window: Duration,

    /// Ads of any kind a user may watch per calendar day.
    /// Default: 10.
    pub daily_ad_cap: u32,

    /// Unlock ads a user may watch for one item.
    /// Default: 3.
    pub per_item_unlock_cap: u32,

    /// Load attempts per ad before the slot falls back to `NotLoaded`.
    /// Default: 3.
    pub ad_load_attempts: u32,

    /// Pause between two ad load attempts.
    /// Default: 2 seconds.
    #[serde(rename = "adLoadRetryDelayMs", with = "millis")]
    pub ad_load_retry_delay: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cache_capacity: 50,
            cache_ttl: Duration::from_secs(30 * 60),
            resolve_timeout: Duration::from_secs(1),
            prefetch_ahead: 2,
            prefetch_concurrency: 2,
            max_playback_retries: 3,
            controls_auto_hide: Duration::from_secs(2),
            double_tap_window: Duration::from_millis(300),
            daily_ad_cap: 10,
            per_item_unlock_cap: 3,
            ad_load_attempts: 3,
            ad_load_retry_delay: Duration::from_secs(2),
        }
    }
}

mod millis {
    use ::serde::Deserialize as _;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<::std::time::Duration, D::Error>
    where
        D: ::serde::Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(::std::time::Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_keep_defaults() {
        let settings: EngineSettings =
            ::serde_json::from_str(r#"{"dailyAdCap": 5, "resolveTimeoutMs": 750}"#).unwrap();

        assert_eq!(settings.daily_ad_cap, 5);
        assert_eq!(settings.resolve_timeout, Duration::from_millis(750));
        assert_eq!(settings.cache_capacity, EngineSettings::default().cache_capacity);
        assert_eq!(settings.double_tap_window, Duration::from_millis(300));
    }
}
