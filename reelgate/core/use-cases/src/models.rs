pub mod descriptors {
    use ::domain::FeedItem;
    use ::domain::ItemId;

    use crate::utils::aliases::MaybeOwnedString;

    pub type Headers = Vec<(MaybeOwnedString, MaybeOwnedString)>;

    /// Short-lived access grant for one item, as handed out by the authorization service.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct AccessGrant {
        pub cookies: ::std::collections::BTreeMap<String, String>,
    }

    impl AccessGrant {
        pub fn headers(&self) -> Headers {
            if self.cookies.is_empty() {
                return Headers::new();
            }

            let cookie = self.cookies
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join("; ");

            vec![("Cookie".into(), cookie.into())]
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, ::bon::Builder)]
    #[builder(on(_, into))]
    pub struct PlaybackRequest {
        pub uri: MaybeOwnedString,
        #[builder(default)]
        pub headers: Headers,
        #[builder(default)]
        pub start_position_ms: u64,
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq, ::bon::Builder)]
    #[builder(on(_, into))]
    pub struct AdContext {
        pub item_id: Option<ItemId>,
        pub benefit_id: Option<MaybeOwnedString>,
    }

    impl AdContext {
        pub fn item(item_id: impl Into<ItemId>) -> Self {
            Self { item_id: Some(item_id.into()), benefit_id: None }
        }

        pub fn benefit(benefit_id: impl Into<MaybeOwnedString>) -> Self {
            Self { item_id: None, benefit_id: Some(benefit_id.into()) }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Reward {
        pub amount: u64,
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct SpendReceipt {
        pub balance: Option<u64>,
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RewardReceipt {
        pub coins: u64,
        pub balance: Option<u64>,
    }

    #[derive(Debug, Clone, Default)]
    pub struct FeedPage {
        pub items: Vec<FeedItem>,
        pub next_cursor: Option<MaybeOwnedString>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum ScrollDirection {
        #[default]
        Forward,
        Backward,
    }
}

pub mod events {
    use ::domain::AdKind;
    use ::domain::ItemId;

    use crate::models::descriptors::PlaybackRequest;
    use crate::models::descriptors::Reward;
    use crate::utils::aliases::MaybeOwnedString;

    /// Commands issued to the platform player surface of one item.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PlayerCommand {
        Attach { item_id: ItemId, request: PlaybackRequest },
        Play { item_id: ItemId },
        Pause { item_id: ItemId },
        Seek { item_id: ItemId, position_ms: u64 },
        Release { item_id: ItemId },
        ShowThumbnail { item_id: ItemId, thumbnail: MaybeOwnedString },
        SetControlsVisible { item_id: ItemId, visible: bool },
        SetGateVisible { item_id: ItemId, visible: bool },
    }

    impl PlayerCommand {
        pub fn item_id(&self) -> &ItemId {
            match self {
                Self::Attach { item_id, .. }
                | Self::Play { item_id }
                | Self::Pause { item_id }
                | Self::Seek { item_id, .. }
                | Self::Release { item_id }
                | Self::ShowThumbnail { item_id, .. }
                | Self::SetControlsVisible { item_id, .. }
                | Self::SetGateVisible { item_id, .. } => item_id,
            }
        }
    }

    /// Events reported back by the platform player of one item.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PlayerEvent {
        MetadataLoaded { duration_ms: u64 },
        Progress { position_ms: u64 },
        BufferingChanged { buffering: bool },
        Ended,
        Failed(PlaybackFailure),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PlaybackFailure {
        Decode,
        Network,
        Unauthorized,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum AdNetworkEvent {
        RewardEarned(Reward),
        Closed,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum AdLifecycle {
        #[default]
        NotLoaded,
        Loading,
        Loaded,
        Showing,
        Closed,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ShowAdOutcome {
        /// Quota reached; no ad network call was made.
        QuotaExhausted,
        /// The ad is not ready yet; a load is under way.
        Loading,
        /// Another ad of this kind is on screen.
        Busy,
        Completed { rewarded: bool },
    }

    /// Item and wallet state changes the feed UI renders.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum InteractionEvent {
        AdStateChanged { kind: AdKind, state: AdLifecycle },
        AdLoading { kind: AdKind },
        QuotaExhausted { kind: AdKind },
        BalanceChanged { balance: u64 },
        LockChanged { item_id: ItemId, locked: bool },
        LikeChanged { item_id: ItemId, liked: bool, like_count: u64 },
        CheckedIn { date: ::chrono::NaiveDate },
        Alert { message: MaybeOwnedString },
    }
}
