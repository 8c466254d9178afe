use ::async_trait::async_trait;
use ::domain::AdKind;
use ::domain::ItemId;
use ::domain::Quality;

use crate::errors::BackendError;
use crate::models::descriptors::AccessGrant;
use crate::models::descriptors::AdContext;
use crate::models::descriptors::FeedPage;
use crate::models::descriptors::RewardReceipt;
use crate::models::descriptors::SpendReceipt;
use crate::models::events::AdNetworkEvent;
use crate::utils::aliases::BoxedStream;
use crate::utils::aliases::Fallible;
use crate::utils::aliases::MaybeOwnedString;

#[async_trait]
pub trait KeyValueStore: ::core::marker::Send + ::core::marker::Sync {
    async fn get(self: ::std::sync::Arc<Self>, key: &str) -> Fallible<Option<::serde_json::Value>>;
    async fn set(self: ::std::sync::Arc<Self>, key: &str, value: ::serde_json::Value) -> Fallible<()>;
    async fn delete(self: ::std::sync::Arc<Self>, key: &str) -> Fallible<()>;
}

pub trait Clock: ::core::marker::Send + ::core::marker::Sync {
    fn today(&self) -> ::chrono::NaiveDate;
}

/// Turns a direct rendition location into a pre-warmed, optimized one.
#[async_trait]
pub trait SourceOptimizer: ::core::marker::Send + ::core::marker::Sync {
    async fn optimize(
        self: ::std::sync::Arc<Self>, item_id: ItemId, quality: Quality, direct: MaybeOwnedString,
    ) -> Fallible<MaybeOwnedString>;
}

#[async_trait]
pub trait AuthorizationService: ::core::marker::Send + ::core::marker::Sync {
    async fn grant(self: ::std::sync::Arc<Self>, item_id: ItemId) -> Fallible<AccessGrant>;
}

#[async_trait]
pub trait AdNetworkClient: ::core::marker::Send + ::core::marker::Sync {
    /// Settles once the ad is loaded.
    async fn load(self: ::std::sync::Arc<Self>, kind: AdKind) -> Fallible<()>;

    /// Presents a loaded ad; the stream ends after `Closed`.
    async fn show(self: ::std::sync::Arc<Self>, kind: AdKind) -> Fallible<BoxedStream<AdNetworkEvent>>;
}

#[async_trait]
pub trait BalanceBackend: ::core::marker::Send + ::core::marker::Sync {
    async fn spend_coins(self: ::std::sync::Arc<Self>, item_id: ItemId, amount: u64) -> Result<SpendReceipt, BackendError>;

    async fn record_ad_reward(
        self: ::std::sync::Arc<Self>, kind: AdKind, context: AdContext,
    ) -> Result<RewardReceipt, BackendError>;

    async fn balance(self: ::std::sync::Arc<Self>, user_id: MaybeOwnedString) -> Result<u64, BackendError>;
}

#[async_trait]
pub trait LikeBackend: ::core::marker::Send + ::core::marker::Sync {
    async fn set_liked(self: ::std::sync::Arc<Self>, item_id: ItemId, liked: bool) -> Result<(), BackendError>;
}

#[async_trait]
pub trait ContentFeedProvider: ::core::marker::Send + ::core::marker::Sync {
    async fn page(self: ::std::sync::Arc<Self>, cursor: Option<MaybeOwnedString>) -> Fallible<FeedPage>;
}
