use ::domain::FeedItem;
use ::domain::ItemId;

use crate::models::descriptors::ScrollDirection;

/// The ordered window of items currently retained by the feed.
#[derive(Default)]
pub struct FeedWindow {
    items: ::tokio::sync::RwLock<Vec<FeedItem>>,
}

impl FeedWindow {
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self { items: ::tokio::sync::RwLock::new(items) }
    }

    /// Swaps in a new window and returns the ids that dropped out of it.
    pub async fn replace(&self, items: Vec<FeedItem>) -> Vec<ItemId> {
        let mut current = self.items.write().await;

        let removed = current
            .iter()
            .filter(|old| !items.iter().any(|new| new.id == old.id))
            .map(|old| old.id.clone())
            .collect();

        *current = items;

        removed
    }

    pub async fn get(&self, item_id: &ItemId) -> Option<FeedItem> {
        self.items.read().await.iter().find(|item| item.id == *item_id).cloned()
    }

    pub async fn at(&self, index: usize) -> Option<FeedItem> {
        self.items.read().await.get(index).cloned()
    }

    pub async fn index_of(&self, item_id: &ItemId) -> Option<usize> {
        self.items.read().await.iter().position(|item| item.id == *item_id)
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn items(&self) -> Vec<FeedItem> {
        self.items.read().await.clone()
    }

    /// Up to `count` items following `index` in scroll order, nearest first.
    pub async fn ahead(&self, index: usize, direction: ScrollDirection, count: usize) -> Vec<FeedItem> {
        let items = self.items.read().await;

        match direction {
            ScrollDirection::Forward => items.iter().skip(index + 1).take(count).cloned().collect(),
            ScrollDirection::Backward => items.iter().take(index.min(items.len())).rev().take(count).cloned().collect(),
        }
    }

    /// Applies `f` to the item in place and returns the updated copy.
    pub async fn update<F>(&self, item_id: &ItemId, f: F) -> Option<FeedItem>
    where
        F: FnOnce(&mut FeedItem),
    {
        let mut items = self.items.write().await;
        let item = items.iter_mut().find(|item| item.id == *item_id)?;

        f(item);

        Some(item.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> FeedWindow {
        FeedWindow::new(["a", "b", "c", "d"].into_iter().map(|id| FeedItem::builder().id(id).build()).collect())
    }

    fn ids(items: Vec<FeedItem>) -> Vec<String> {
        items.into_iter().map(|item| item.id.into_owned()).collect()
    }

    #[tokio::test]
    async fn ahead_follows_scroll_direction() {
        let window = window();

        assert_eq!(ids(window.ahead(1, ScrollDirection::Forward, 2).await), ["c", "d"]);
        assert_eq!(ids(window.ahead(3, ScrollDirection::Forward, 2).await), Vec::<String>::new());
        assert_eq!(ids(window.ahead(2, ScrollDirection::Backward, 5).await), ["b", "a"]);
    }

    #[tokio::test]
    async fn replace_reports_dropped_items() {
        let window = window();

        let removed = window
            .replace(["c", "d", "e"].into_iter().map(|id| FeedItem::builder().id(id).build()).collect())
            .await;

        assert_eq!(removed, vec![ItemId::from("a"), ItemId::from("b")]);
        assert_eq!(window.index_of(&"e".into()).await, Some(2));
    }
}
