//! Favorites: idempotent bookmarks, independent of ratings.

use snipvault_core::{
    CatalogError, CatalogResult, ItemId, ItemView, PageLimits, PageWindow, SearchPage, UserId,
};

use crate::config::CatalogConfig;
use crate::deadline::Backends;

#[derive(Debug, Clone)]
pub struct FavoriteService {
    backends: Backends,
    limits: PageLimits,
}

impl FavoriteService {
    pub fn new(backends: Backends, config: &CatalogConfig) -> Self {
        Self {
            backends,
            limits: config.favorites_page_limits(),
        }
    }

    /// Bookmark an item. Favoriting twice is a success; an unknown item is
    /// `NotFound`.
    pub async fn favorite(&self, user_id: UserId, item_id: ItemId) -> CatalogResult<()> {
        let store = &self.backends.store;
        let exists = self
            .backends
            .call("store.item_exists", store.item_exists(item_id))
            .await?;
        if !exists {
            return Err(CatalogError::item_not_found(item_id));
        }

        let favorite = snipvault_core::Favorite::new(user_id, item_id);
        match self
            .backends
            .call("store.favorite_insert", store.favorite_insert(&favorite))
            .await
        {
            Ok(()) => {
                tracing::debug!(user_id = %user_id, item_id = %item_id, "favorite added");
                Ok(())
            }
            Err(e) if e.is_conflict() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Remove a bookmark. Removing one that does not exist is a success.
    pub async fn unfavorite(&self, user_id: UserId, item_id: ItemId) -> CatalogResult<()> {
        let removed = self
            .backends
            .call(
                "store.favorite_delete",
                self.backends.store.favorite_delete(user_id, item_id),
            )
            .await?;
        tracing::debug!(user_id = %user_id, item_id = %item_id, removed, "favorite removed");
        Ok(())
    }

    /// One page of the user's favorited items, newest favorite first. Pages
    /// default to `favorites_page_size` items.
    pub async fn list_favorites(
        &self,
        user_id: UserId,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> CatalogResult<SearchPage<ItemView>> {
        let (page, page_size) = self.limits.clamp(page, page_size);
        let store = &self.backends.store;

        let favorites = self
            .backends
            .call("store.favorite_list_by_user", store.favorite_list_by_user(user_id))
            .await?;
        let total = favorites.len() as u64;
        let ids: Vec<ItemId> = PageWindow::new(page, page_size)
            .slice(favorites.into_iter().map(|f| f.item_id));
        if ids.is_empty() {
            return Ok(SearchPage {
                total,
                ..SearchPage::empty(page, page_size)
            });
        }

        let (items, mut ratings) = tokio::try_join!(
            self.backends
                .call("store.item_get_many", store.item_get_many(&ids)),
            self.backends.call(
                "store.rating_values_for_user",
                store.rating_values_for_user(user_id, &ids),
            ),
        )?;

        Ok(SearchPage {
            total,
            page,
            page_size,
            items: items
                .into_iter()
                .map(|item| {
                    let rating = ratings.remove(&item.item_id);
                    ItemView::with_rating(item, rating)
                })
                .collect(),
        })
    }
}
