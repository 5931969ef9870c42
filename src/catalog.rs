//! # Catalog Store
//!
//! The [`CatalogStore`] trait is the seam between the dialog engine and the
//! relational store. Every method commits atomically on its own; there are no
//! cross-call transactions.
//!
//! The free functions at the bottom of this module wrap the store calls that
//! must never fail the caller. They log the store error and fall back to a
//! safe default instead.

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::errors::CatalogError;
use crate::models::{
    Category, CategoryId, CategorySummary, NewProduct, Product, ProductEntry, ProductId, Rating,
    UserSummary,
};

pub type CatalogResult<T> = Result<T, CatalogError>;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert the user with default flags if absent
    async fn ensure_user(&self, telegram_id: i64) -> CatalogResult<()>;

    /// Stored ban flag; `false` when the user row does not exist
    async fn banned_flag(&self, telegram_id: i64) -> CatalogResult<bool>;

    /// Upsert the ban flag
    async fn set_banned(&self, telegram_id: i64, banned: bool) -> CatalogResult<()>;

    /// Read the notification preference, creating the user with the default
    /// (enabled) when absent
    async fn notification_status(&self, telegram_id: i64) -> CatalogResult<bool>;

    /// Upsert the notification preference
    async fn set_notifications(&self, telegram_id: i64, enabled: bool) -> CatalogResult<()>;

    /// Users with notifications enabled, excluding `excluding`
    async fn list_subscribers(&self, excluding: i64) -> CatalogResult<Vec<i64>>;

    /// All categories ordered by name
    async fn list_categories(&self) -> CatalogResult<Vec<Category>>;

    /// All categories ordered by name with product counts, optionally counting
    /// only products with the given rating
    async fn category_summaries(&self, rating: Option<Rating>)
        -> CatalogResult<Vec<CategorySummary>>;

    async fn category_name(&self, category_id: CategoryId) -> CatalogResult<Option<String>>;

    /// Create-or-get a category by name. Reserved and empty names are rejected
    /// with [`CatalogError::InvalidName`].
    async fn add_category(&self, name: &str) -> CatalogResult<CategoryId>;

    async fn rename_category(&self, category_id: CategoryId, new_name: &str)
        -> CatalogResult<bool>;

    async fn save_product(&self, product: &NewProduct) -> CatalogResult<ProductId>;

    /// Products in a category with a given rating, newest first
    async fn query_products(
        &self,
        category_id: CategoryId,
        rating: Rating,
    ) -> CatalogResult<Vec<Product>>;

    async fn get_product(&self, product_id: ProductId) -> CatalogResult<Option<Product>>;

    /// Every product ordered by category name, then product name
    async fn list_all_products_with_category(&self) -> CatalogResult<Vec<ProductEntry>>;

    /// Products submitted by one user, newest first
    async fn list_user_products(&self, telegram_id: i64) -> CatalogResult<Vec<ProductEntry>>;

    /// One row per known user with a best-effort display name
    async fn list_distinct_users(&self) -> CatalogResult<Vec<UserSummary>>;

    async fn list_banned_users(&self) -> CatalogResult<Vec<UserSummary>>;

    async fn move_product(&self, product_id: ProductId, category_id: CategoryId)
        -> CatalogResult<bool>;

    /// Rename a product owned by `owner_id`
    async fn rename_product(
        &self,
        product_id: ProductId,
        owner_id: i64,
        new_name: &str,
    ) -> CatalogResult<bool>;

    /// Replace the photo of a product owned by `owner_id`
    async fn set_product_photo(
        &self,
        product_id: ProductId,
        owner_id: i64,
        photo_ref: &str,
    ) -> CatalogResult<bool>;

    async fn delete_product(&self, product_id: ProductId) -> CatalogResult<bool>;

    /// Delete the user's products, then the user row
    async fn delete_user_cascade(&self, telegram_id: i64) -> CatalogResult<bool>;

    /// Delete all products, then all categories. Users are kept.
    async fn clear_all(&self) -> CatalogResult<()>;
}

/// Make sure the user row exists. Store errors are logged and swallowed.
pub async fn ensure_user(store: &dyn CatalogStore, telegram_id: i64) {
    if let Err(e) = store.ensure_user(telegram_id).await {
        error!(user_id = telegram_id, error = %e, "Failed to ensure user row");
    }
}

/// Ban check used by the access guard.
///
/// The administrator is never banned. A store failure fails open (the user is
/// treated as not banned) so a transient outage does not lock everyone out.
pub async fn is_banned(store: &dyn CatalogStore, admin_id: i64, telegram_id: i64) -> bool {
    if telegram_id == admin_id {
        return false;
    }
    match store.banned_flag(telegram_id).await {
        Ok(banned) => banned,
        Err(e) => {
            warn!(user_id = telegram_id, error = %e, "Ban check failed, allowing access");
            false
        }
    }
}

/// Current notification preference; defaults to enabled on store failure.
pub async fn notification_status(store: &dyn CatalogStore, telegram_id: i64) -> bool {
    match store.notification_status(telegram_id).await {
        Ok(enabled) => enabled,
        Err(e) => {
            error!(user_id = telegram_id, error = %e, "Failed to read notification status");
            true
        }
    }
}

/// Flip the notification preference and return the new value.
pub async fn toggle_notifications(store: &dyn CatalogStore, telegram_id: i64) -> bool {
    let new_status = !notification_status(store, telegram_id).await;
    if let Err(e) = store.set_notifications(telegram_id, new_status).await {
        error!(user_id = telegram_id, error = %e, "Failed to toggle notifications");
    } else {
        debug!(user_id = telegram_id, enabled = new_status, "Notification preference updated");
    }
    new_status
}

/// Subscribers to notify about a new product; empty on store failure.
pub async fn subscribers(store: &dyn CatalogStore, excluding: i64) -> Vec<i64> {
    match store.list_subscribers(excluding).await {
        Ok(ids) => ids,
        Err(e) => {
            error!(error = %e, "Failed to list subscribers");
            Vec::new()
        }
    }
}
