use ::domain::ItemId;

use crate::boundaries::InteractionOutputBoundary;
use crate::errors::LikeError;
use crate::gateways::LikeBackend;
use crate::models::events::InteractionEvent;
use crate::services::feed::FeedWindow;
use crate::utils::aliases::Fallible;

/// Optimistic like toggling; a rejected toggle is reverted and alerted.
pub struct LikeInteractor {
    pub output_boundary: ::std::sync::Arc<dyn InteractionOutputBoundary>,

    pub feed: ::std::sync::Arc<FeedWindow>,
    pub backend: ::std::sync::Arc<dyn LikeBackend>,
}

impl LikeInteractor {
    pub async fn toggle(self: ::std::sync::Arc<Self>, item_id: ItemId) -> Fallible<bool> {
        let updated = self
            .feed
            .update(&item_id, |item| {
                item.is_liked = !item.is_liked;
                item.like_count = if item.is_liked {
                    item.like_count.saturating_add(1)
                } else {
                    item.like_count.saturating_sub(1)
                };
            })
            .await
            .ok_or_else(|| LikeError::UnknownItem(item_id.clone()))?;

        ::std::sync::Arc::clone(&self.output_boundary)
            .update(&InteractionEvent::LikeChanged {
                item_id: item_id.clone(),
                liked: updated.is_liked,
                like_count: updated.like_count,
            })
            .await?;

        let Err(error) = ::std::sync::Arc::clone(&self.backend).set_liked(item_id.clone(), updated.is_liked).await else {
            return Ok(updated.is_liked);
        };

        ::tracing::warn!(%item_id, %error, "like not recorded, reverting");

        let reverted = self
            .feed
            .update(&item_id, |item| {
                item.is_liked = !updated.is_liked;
                item.like_count = if updated.is_liked {
                    item.like_count.saturating_sub(1)
                } else {
                    item.like_count.saturating_add(1)
                };
            })
            .await;

        if let Some(reverted) = reverted {
            ::std::sync::Arc::clone(&self.output_boundary)
                .update(&InteractionEvent::LikeChanged {
                    item_id: item_id.clone(),
                    liked: reverted.is_liked,
                    like_count: reverted.like_count,
                })
                .await?;
        }

        ::std::sync::Arc::clone(&self.output_boundary)
            .update(&InteractionEvent::Alert { message: error.user_message().into() })
            .await?;

        Err(LikeError::from(error).into())
    }
}
