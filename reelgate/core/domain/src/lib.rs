pub(crate) mod utils;

use ::serde::Deserialize;
use ::serde::Serialize;

use crate::utils::aliases::MaybeOwnedString;

pub type ItemId = MaybeOwnedString;

/// One playable unit of the feed.
///
/// Immutable once supplied by the content feed, except for `lock` and the like state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ::bon::Builder)]
#[builder(on(_, into))]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: ItemId,
    #[builder(default)]
    #[serde(default)]
    pub variants: Variants,
    #[builder(default)]
    #[serde(default)]
    pub thumbnail: MaybeOwnedString,
    #[builder(default)]
    #[serde(default)]
    pub lock: Lock,
    #[builder(default)]
    #[serde(default)]
    pub like_count: u64,
    #[builder(default)]
    #[serde(default)]
    pub is_liked: bool,
}

impl FeedItem {
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[default]
    #[serde(rename = "auto", alias = "master", alias = "default")]
    Auto,
}

impl Quality {
    pub const ALL: [Quality; 5] = [Self::P360, Self::P480, Self::P720, Self::P1080, Self::Auto];

    pub fn label(self) -> &'static str {
        match self {
            Self::P360 => "360p",
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
            Self::Auto => "auto",
        }
    }
}

impl ::std::fmt::Display for Quality {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        formatter.write_str(self.label())
    }
}

impl ::std::str::FromStr for Quality {
    type Err = UnknownQuality;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label.trim().to_ascii_lowercase().as_str() {
            "360p" => Ok(Self::P360),
            "480p" => Ok(Self::P480),
            "720p" => Ok(Self::P720),
            "1080p" => Ok(Self::P1080),
            "auto" | "master" | "default" => Ok(Self::Auto),
            _ => Err(UnknownQuality(label.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ::thiserror::Error)]
#[error("unknown quality label: {0:?}")]
pub struct UnknownQuality(pub String);

/// Raw locations of the encoded renditions of an item, keyed by quality.
///
/// Locations may be empty; an empty location is treated as if the rendition were absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variants(::std::collections::BTreeMap<Quality, MaybeOwnedString>);

impl Variants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, quality: Quality, location: impl Into<MaybeOwnedString>) -> Self {
        self.0.insert(quality, location.into());
        self
    }

    pub fn get(&self, quality: Quality) -> Option<&str> {
        self.0
            .get(&quality)
            .map(|location| location.trim())
            .filter(|location| !location.is_empty())
    }

    /// Picks the direct location for `preference`.
    ///
    /// An explicit quality wins when present, then the master rendition, then the first
    /// non-empty rendition in ascending quality order.
    pub fn select(&self, preference: Quality) -> Option<&str> {
        let exact = match preference {
            Quality::Auto => None,
            quality => self.get(quality),
        };

        exact
            .or_else(|| self.get(Quality::Auto))
            .or_else(|| Quality::ALL.into_iter().find_map(|quality| self.get(quality)))
    }

    /// Qualities a user can pick for this item: `auto` first, then explicit renditions from best to worst.
    pub fn available(&self) -> Vec<Quality> {
        if self.is_empty() {
            return Vec::new();
        }

        ::std::iter::once(Quality::Auto)
            .chain(
                Quality::ALL
                    .into_iter()
                    .rev()
                    .filter(|quality| *quality != Quality::Auto)
                    .filter(|quality| self.get(*quality).is_some()),
            )
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        Quality::ALL.into_iter().all(|quality| self.get(quality).is_none())
    }
}

impl<Location> FromIterator<(Quality, Location)> for Variants
where
    Location: Into<MaybeOwnedString>,
{
    fn from_iter<Iter: IntoIterator<Item = (Quality, Location)>>(iter: Iter) -> Self {
        Self(iter.into_iter().map(|(quality, location)| (quality, location.into())).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lock {
    pub is_locked: bool,
    #[serde(default)]
    pub unlock_kind: Option<UnlockKind>,
    #[serde(default)]
    pub price: u64,
}

impl Lock {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn coins(price: u64) -> Self {
        Self { is_locked: true, unlock_kind: Some(UnlockKind::Coins), price }
    }

    pub fn ads() -> Self {
        Self { is_locked: true, unlock_kind: Some(UnlockKind::Ads), price: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockKind {
    Coins,
    Ads,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdKind {
    Reward,
    Unlock,
    DailyCheckin,
    Benefit,
}

impl AdKind {
    pub const ALL: [AdKind; 4] = [Self::Reward, Self::Unlock, Self::DailyCheckin, Self::Benefit];

    pub fn label(self) -> &'static str {
        match self {
            Self::Reward => "reward",
            Self::Unlock => "unlock",
            Self::DailyCheckin => "daily_checkin",
            Self::Benefit => "benefit",
        }
    }
}

impl ::std::fmt::Display for AdKind {
    fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        formatter.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Resolving,
    Buffering,
    Ready,
    Playing,
    Paused,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub phase: PlaybackPhase,
    pub progress_ms: u64,
    pub duration_ms: u64,
    pub is_buffering: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variants() -> Variants {
        [
            (Quality::P360, "low.mp4"),
            (Quality::P720, "hd.mp4"),
            (Quality::P1080, ""),
            (Quality::Auto, "master.m3u8"),
        ]
        .into_iter()
        .collect()
    }

    #[::rstest::rstest]
    #[case(Quality::P720, Some("hd.mp4"))]
    #[case(Quality::P360, Some("low.mp4"))]
    #[case(Quality::P1080, Some("master.m3u8"))]
    #[case(Quality::P480, Some("master.m3u8"))]
    #[case(Quality::Auto, Some("master.m3u8"))]
    fn selects_exact_quality_then_master(#[case] preference: Quality, #[case] expected: Option<&str>) {
        assert_eq!(variants().select(preference), expected);
    }

    #[test]
    fn falls_back_to_first_non_empty_rendition_without_master() {
        let variants: Variants = [(Quality::P1080, "fhd.mp4"), (Quality::P480, "  "), (Quality::P720, "hd.mp4")]
            .into_iter()
            .collect();

        assert_eq!(variants.select(Quality::P480), Some("hd.mp4"));
        assert_eq!(variants.select(Quality::Auto), Some("hd.mp4"));
    }

    #[test]
    fn empty_variants_select_nothing() {
        let variants: Variants = [(Quality::Auto, "")].into_iter().collect();

        assert!(variants.is_empty());
        assert_eq!(variants.select(Quality::P720), None);
        assert!(variants.available().is_empty());
    }

    #[test]
    fn available_lists_auto_then_best_first() {
        assert_eq!(variants().available(), vec![Quality::Auto, Quality::P720, Quality::P360]);
    }

    #[test]
    fn master_alias_deserializes_as_auto() {
        let item: FeedItem = ::serde_json::from_str(
            r#"{"id":"a","variants":{"master":"a.mp4","720p":""},"lock":{"isLocked":true,"unlockKind":"coins","price":50}}"#,
        )
        .unwrap();

        assert_eq!(item.variants.select(Quality::P720), Some("a.mp4"));
        assert_eq!(item.lock, Lock::coins(50));
        assert!(!item.is_liked);
    }

    #[test]
    fn quality_labels_round_trip_through_from_str() {
        for quality in Quality::ALL {
            assert_eq!(quality.label().parse::<Quality>(), Ok(quality));
        }
        assert!("4k".parse::<Quality>().is_err());
    }

    #[test]
    fn unknown_quality_names_the_label() {
        let error = "4k".parse::<Quality>().unwrap_err();

        assert_eq!(error, UnknownQuality("4k".to_owned()));
        assert_eq!(error.to_string(), r#"unknown quality label: "4k""#);
    }
}
