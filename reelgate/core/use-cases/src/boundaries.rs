use ::async_trait::async_trait;
use ::derive_new::new;
use ::domain::FeedItem;
use ::domain::ItemId;
use ::domain::Quality;

use crate::models::events::InteractionEvent;
use crate::models::events::PlayerCommand;
use crate::models::events::PlayerEvent;
use crate::utils::aliases::Fallible;

#[async_trait]
pub trait Accept<Request>: ::core::marker::Send + ::core::marker::Sync {
    async fn accept(self: ::std::sync::Arc<Self>, request: Request) -> Fallible<()>;
}

#[async_trait]
pub trait Update<Event>: ::core::marker::Send + ::core::marker::Sync {
    async fn update(self: ::std::sync::Arc<Self>, event: &Event) -> Fallible<()>;
}

pub trait PlaybackOutputBoundary: Update<PlayerCommand> {}

impl<Boundary> PlaybackOutputBoundary for Boundary where Boundary: Update<PlayerCommand> {}

pub trait InteractionOutputBoundary: Update<InteractionEvent> {}

impl<Boundary> InteractionOutputBoundary for Boundary where Boundary: Update<InteractionEvent> {}

/// The content feed handed over a new retained window.
#[derive(new, Debug, Clone)]
pub struct ReplaceWindowRequestModel {
    pub items: Vec<FeedItem>,
}

#[derive(new, Debug, Clone)]
pub struct ChangeVisibilityRequestModel {
    pub item_id: ItemId,
    pub visible: bool,
}

/// The feed settled on a new active index.
#[derive(new, Debug, Clone, Copy)]
pub struct FocusItemRequestModel {
    pub index: usize,
}

#[derive(new, Debug, Clone, Copy)]
pub struct ChangeScrollStateRequestModel {
    pub scrolling: bool,
}

#[derive(new, Debug, Clone, Copy)]
pub struct ChangeAppStateRequestModel {
    pub foreground: bool,
}

#[derive(new, Debug, Clone)]
pub struct TapRequestModel {
    pub item_id: ItemId,
}

#[derive(new, Debug, Clone)]
pub struct TogglePauseRequestModel {
    pub item_id: ItemId,
}

#[derive(new, Debug, Clone, Copy)]
pub struct SelectQualityRequestModel {
    pub quality: Quality,
}

#[derive(new, Debug, Clone)]
pub struct PlayerReport {
    pub item_id: ItemId,
    pub event: PlayerEvent,
}

/// An item's gate opened or closed again.
#[derive(new, Debug, Clone)]
pub struct LockStateChanged {
    pub item_id: ItemId,
    pub locked: bool,
}
