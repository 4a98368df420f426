//! Slug-based URL resolution for the public pages.
//!
//! ```text
//! /items/                         → list_categories
//! /items/{category}/              → redirect_to_first_item (302)
//! /items/{category}/{item}/       → view_item (+1 view)
//! ```
//!
//! A category slug, an item slug or a pairing that does not resolve answers
//! with [`AppError::PageNotFound`], which the public pages render as a
//! friendly "nothing here" page.

use crate::error::{AppError, Result};
use crate::models::{Category, Item, by_name, by_views_desc};
use crate::store::{Store, categories, items};

/// Path of a category's landing URL.
pub fn category_path(category: &Category) -> String {
    format!("/items/{}/", category.slug)
}

/// Path of an item's detail page.
pub fn item_path(category: &Category, item: &Item) -> String {
    format!("/items/{}/{}/", category.slug, item.slug)
}

/// Everything the item detail page shows.
#[derive(Debug, Clone)]
pub struct ItemView {
    pub category: Category,
    /// The viewed item, with its view count already incremented.
    pub item: Item,
    /// Items of the same category ordered by name, including `item`.
    pub siblings: Vec<Item>,
    /// Position of `item` in `siblings`.
    pub index: usize,
}

impl ItemView {
    pub fn previous(&self) -> Option<&Item> {
        self.index.checked_sub(1).and_then(|i| self.siblings.get(i))
    }

    pub fn next(&self) -> Option<&Item> {
        self.siblings.get(self.index + 1)
    }
}

/// Message for a category that exists but has nothing to show.
pub fn empty_category_message(name: &str) -> String {
    format!("Oops.. Category {name} does not contain any item!")
}

/// All categories by name. No categories at all is "nothing here".
pub async fn list_categories(store: &Store) -> Result<Vec<Category>> {
    let mut all = store.call(|conn| categories::list(conn)).await?;
    if all.is_empty() {
        return Err(AppError::page_not_found());
    }
    all.sort_by(by_name);
    Ok(all)
}

/// Path of the alphabetically first item of a category.
pub async fn redirect_to_first_item(store: &Store, category_slug: &str) -> Result<String> {
    let slug = category_slug.to_string();
    let found = store
        .call(move |conn| {
            let Some(category) = categories::find_by_slug(conn, &slug)? else {
                return Ok(None);
            };
            let first = items::first_in_category(conn, category.id)?;
            Ok(Some((category, first)))
        })
        .await?;

    match found {
        None => Err(AppError::page_not_found()),
        Some((category, None)) => Err(AppError::PageNotFound(empty_category_message(
            &category.name,
        ))),
        Some((category, Some(item))) => Ok(item_path(&category, &item)),
    }
}

/// Resolve an item page and count the visit.
pub async fn view_item(store: &Store, category_slug: &str, item_slug: &str) -> Result<ItemView> {
    let (category_slug, item_slug) = (category_slug.to_string(), item_slug.to_string());
    let resolved = store
        .call(move |conn| {
            let Some(category) = categories::find_by_slug(conn, &category_slug)? else {
                return Ok(None);
            };
            let Some(mut item) = items::find_by_slug(conn, &item_slug)? else {
                return Ok(None);
            };
            if item.category_id != category.id {
                return Ok(None);
            }
            item.views = items::increment_views(conn, item.id)?;
            let siblings = items::list_in_category(conn, category.id)?;
            Ok(Some((category, item, siblings)))
        })
        .await?;

    let Some((category, item, mut siblings)) = resolved else {
        return Err(AppError::page_not_found());
    };
    siblings.sort_by(by_name);
    let index = siblings
        .iter()
        .position(|s| s.id == item.id)
        .ok_or_else(AppError::page_not_found)?;
    // The sibling copy was read after the increment, keep both in step
    siblings[index].views = item.views;

    Ok(ItemView {
        category,
        item,
        siblings,
        index,
    })
}

/// Most viewed items with their categories, for the home page.
pub async fn popular_items(store: &Store, limit: usize) -> Result<Vec<(Category, Item)>> {
    let (all_categories, mut top) = store
        .call(move |conn| Ok((categories::list(conn)?, items::popular(conn, limit)?)))
        .await?;
    top.sort_by(by_views_desc);
    Ok(top
        .into_iter()
        .filter_map(|item| {
            all_categories
                .iter()
                .find(|c| c.id == item.category_id)
                .cloned()
                .map(|c| (c, item))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TestSite;

    // =========================================================================
    // list_categories
    // =========================================================================

    #[tokio::test]
    async fn no_categories_is_not_found() {
        let site = TestSite::new().await;
        let err = list_categories(&site.state.store).await.unwrap_err();
        assert!(matches!(err, AppError::PageNotFound(_)));
    }

    #[tokio::test]
    async fn categories_are_listed_by_name() {
        let site = TestSite::new().await;
        site.category("Soups").await;
        site.category("Desserts").await;
        let names: Vec<_> = list_categories(&site.state.store)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Desserts", "Soups"]);
    }

    // =========================================================================
    // redirect_to_first_item
    // =========================================================================

    #[tokio::test]
    async fn redirects_to_alphabetically_first_item() {
        let site = TestSite::new().await;
        let category = site.category("Category 1").await;
        site.item("Item 1-2", &category).await;
        site.item("Item 1-1", &category).await;

        let path = redirect_to_first_item(&site.state.store, "category-1")
            .await
            .unwrap();
        assert_eq!(path, "/items/category-1/item-1-1/");
    }

    #[tokio::test]
    async fn empty_category_names_itself() {
        let site = TestSite::new().await;
        site.category("Desserts").await;
        let err = redirect_to_first_item(&site.state.store, "desserts")
            .await
            .unwrap_err();
        match err {
            AppError::PageNotFound(message) => {
                assert_eq!(message, "Oops.. Category Desserts does not contain any item!")
            }
            other => panic!("expected PageNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_category_is_not_found() {
        let site = TestSite::new().await;
        let err = redirect_to_first_item(&site.state.store, "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PageNotFound(_)));
    }

    // =========================================================================
    // view_item
    // =========================================================================

    #[tokio::test]
    async fn each_view_counts_once() {
        let site = TestSite::new().await;
        let category = site.category("Soups").await;
        site.item("Laksa", &category).await;

        for expected in 1..=5 {
            let view = view_item(&site.state.store, "soups", "laksa").await.unwrap();
            assert_eq!(view.item.views, expected);
        }
    }

    #[tokio::test]
    async fn siblings_are_ordered_with_index() {
        let site = TestSite::new().await;
        let category = site.category("Soups").await;
        for name in ["Pho", "Laksa", "Tom Yum"] {
            site.item(name, &category).await;
        }

        let view = view_item(&site.state.store, "soups", "pho").await.unwrap();
        let names: Vec<_> = view.siblings.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Laksa", "Pho", "Tom Yum"]);
        assert_eq!(view.index, 1);
        assert_eq!(view.previous().unwrap().name, "Laksa");
        assert_eq!(view.next().unwrap().name, "Tom Yum");
    }

    #[tokio::test]
    async fn item_under_wrong_category_is_not_found() {
        let site = TestSite::new().await;
        let soups = site.category("Soups").await;
        site.category("Desserts").await;
        site.item("Laksa", &soups).await;

        let err = view_item(&site.state.store, "desserts", "laksa")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PageNotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_views_are_not_lost() {
        let site = TestSite::new().await;
        let category = site.category("Soups").await;
        let item = site.item("Laksa", &category).await;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let store = site.state.store.clone();
            tasks.spawn(async move { view_item(&store, "soups", "laksa").await.map(|_| ()) });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }
        let id = item.id;
        let reloaded = site.state.store.call(move |c| items::get(c, id)).await.unwrap();
        assert_eq!(reloaded.views, 8);
    }

    // =========================================================================
    // popular_items
    // =========================================================================

    #[tokio::test]
    async fn popular_items_rank_by_views() {
        let site = TestSite::new().await;
        let category = site.category("Soups").await;
        site.item("Laksa", &category).await;
        site.item("Pho", &category).await;
        for _ in 0..3 {
            view_item(&site.state.store, "soups", "pho").await.unwrap();
        }

        let ranked = popular_items(&site.state.store, 6).await.unwrap();
        let names: Vec<_> = ranked.iter().map(|(_, i)| i.name.as_str()).collect();
        assert_eq!(names, ["Pho", "Laksa"]);
        assert_eq!(ranked[0].0.slug, "soups");
    }
}
