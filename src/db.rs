//! # PostgreSQL Catalog Store
//!
//! [`PgCatalog`] implements [`CatalogStore`] on top of a shared `sqlx` pool.
//! The schema is created idempotently by [`init_database_schema`] at startup.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::catalog::{CatalogResult, CatalogStore};
use crate::dialogue::validate_category_name;
use crate::errors::CatalogError;
use crate::models::{
    Category, CategoryId, CategorySummary, NewProduct, Product, ProductEntry, ProductId, Rating,
    UserSummary, UNKNOWN_USER_NAME,
};

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS categories (
            id SERIAL PRIMARY KEY,
            name TEXT UNIQUE NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create categories table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS products (
            id SERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            author_name TEXT NOT NULL,
            name TEXT NOT NULL,
            photo_ref TEXT,
            rating TEXT NOT NULL CHECK (rating IN ('Recommend', 'Avoid')),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            category_id INTEGER NOT NULL REFERENCES categories(id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create products table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            user_id BIGINT PRIMARY KEY,
            notifications_enabled BOOLEAN NOT NULL DEFAULT TRUE,
            is_banned BOOLEAN NOT NULL DEFAULT FALSE
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS products_category_rating_idx ON products (category_id, rating)",
    )
    .execute(pool)
    .await
    .context("Failed to create products category index")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS products_user_idx ON products (user_id)")
        .execute(pool)
        .await
        .context("Failed to create products user index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

const PRODUCT_COLUMNS: &str = "p.id, p.user_id, p.author_name, p.category_id,
     c.name AS category_name, p.name, p.rating, p.photo_ref, p.created_at";

const ENTRY_COLUMNS: &str = "p.id, p.name, c.name AS category_name, p.created_at, p.photo_ref";

fn rating_from_row(row: &PgRow) -> Result<Rating, sqlx::Error> {
    let raw: String = row.try_get("rating")?;
    raw.parse::<Rating>().map_err(|e| sqlx::Error::Decode(e.into()))
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        author_name: row.try_get("author_name")?,
        category_id: row.try_get("category_id")?,
        category_name: row.try_get("category_name")?,
        name: row.try_get("name")?,
        rating: rating_from_row(row)?,
        photo_ref: row.try_get("photo_ref")?,
        created_at: row.try_get("created_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<ProductEntry, sqlx::Error> {
    Ok(ProductEntry {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        category_name: row.try_get("category_name")?,
        created_at: row.try_get("created_at")?,
        photo_ref: row.try_get("photo_ref")?,
    })
}

fn user_summary_from_row(row: &PgRow) -> Result<UserSummary, sqlx::Error> {
    let display_name: Option<String> = row.try_get("display_name")?;
    Ok(UserSummary {
        telegram_id: row.try_get("user_id")?,
        display_name: display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string()),
    })
}

/// Users with the author name of their most recent product
const USER_SUMMARY_QUERY: &str = "SELECT u.user_id,
        (ARRAY_AGG(p.author_name ORDER BY p.created_at DESC, p.id DESC))[1] AS display_name
     FROM users u
     LEFT JOIN products p ON p.user_id = u.user_id";

/// Catalog store backed by PostgreSQL
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn ensure_user(&self, telegram_id: i64) -> CatalogResult<()> {
        sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(telegram_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn banned_flag(&self, telegram_id: i64) -> CatalogResult<bool> {
        let banned: Option<bool> =
            sqlx::query_scalar("SELECT is_banned FROM users WHERE user_id = $1")
                .bind(telegram_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(banned.unwrap_or(false))
    }

    async fn set_banned(&self, telegram_id: i64, banned: bool) -> CatalogResult<()> {
        info!(user_id = telegram_id, banned, "Updating ban flag");
        sqlx::query(
            "INSERT INTO users (user_id, is_banned) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET is_banned = EXCLUDED.is_banned",
        )
        .bind(telegram_id)
        .bind(banned)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn notification_status(&self, telegram_id: i64) -> CatalogResult<bool> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let enabled: bool = sqlx::query_scalar(
            "INSERT INTO users (user_id) VALUES ($1)
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
             RETURNING notifications_enabled",
        )
        .bind(telegram_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(enabled)
    }

    async fn set_notifications(&self, telegram_id: i64, enabled: bool) -> CatalogResult<()> {
        sqlx::query(
            "INSERT INTO users (user_id, notifications_enabled) VALUES ($1, $2)
             ON CONFLICT (user_id)
             DO UPDATE SET notifications_enabled = EXCLUDED.notifications_enabled",
        )
        .bind(telegram_id)
        .bind(enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_subscribers(&self, excluding: i64) -> CatalogResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT user_id FROM users
             WHERE notifications_enabled AND user_id <> $1
             ORDER BY user_id",
        )
        .bind(excluding)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        let categories = rows
            .iter()
            .map(|row| {
                Ok(Category {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(categories)
    }

    async fn category_summaries(
        &self,
        rating: Option<Rating>,
    ) -> CatalogResult<Vec<CategorySummary>> {
        let rows = sqlx::query(
            "SELECT c.id, c.name, COUNT(p.id) AS product_count
             FROM categories c
             LEFT JOIN products p
                ON p.category_id = c.id AND ($1::TEXT IS NULL OR p.rating = $1)
             GROUP BY c.id, c.name
             ORDER BY c.name",
        )
        .bind(rating.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await?;

        let summaries = rows
            .iter()
            .map(|row| {
                Ok(CategorySummary {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    product_count: row.try_get("product_count")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(summaries)
    }

    async fn category_name(&self, category_id: CategoryId) -> CatalogResult<Option<String>> {
        let name = sqlx::query_scalar("SELECT name FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    async fn add_category(&self, name: &str) -> CatalogResult<CategoryId> {
        let name = validate_category_name(name)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(&name)
            .execute(&mut *tx)
            .await?;
        let id: CategoryId = sqlx::query_scalar("SELECT id FROM categories WHERE name = $1")
            .bind(&name)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(category_id = id, category = %name, "Category resolved");
        Ok(id)
    }

    async fn rename_category(
        &self,
        category_id: CategoryId,
        new_name: &str,
    ) -> CatalogResult<bool> {
        let new_name = validate_category_name(new_name)?;
        let result = sqlx::query("UPDATE categories SET name = $1 WHERE id = $2")
            .bind(&new_name)
            .bind(category_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    CatalogError::DuplicateName(new_name.clone())
                }
                other => CatalogError::Database(other),
            })?;
        info!(category_id, category = %new_name, "Category renamed");
        Ok(result.rows_affected() > 0)
    }

    async fn save_product(&self, product: &NewProduct) -> CatalogResult<ProductId> {
        let id: ProductId = sqlx::query_scalar(
            "INSERT INTO products (user_id, author_name, name, photo_ref, rating, category_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(product.user_id)
        .bind(&product.author_name)
        .bind(&product.name)
        .bind(product.photo_ref.as_deref())
        .bind(product.rating.as_str())
        .bind(product.category_id)
        .fetch_one(&self.pool)
        .await?;

        info!(
            product_id = id,
            user_id = product.user_id,
            category_id = product.category_id,
            rating = %product.rating,
            "Product saved"
        );
        Ok(id)
    }

    async fn query_products(
        &self,
        category_id: CategoryId,
        rating: Rating,
    ) -> CatalogResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}
             FROM products p JOIN categories c ON c.id = p.category_id
             WHERE p.category_id = $1 AND p.rating = $2
             ORDER BY p.created_at DESC, p.id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(category_id)
            .bind(rating.as_str())
            .fetch_all(&self.pool)
            .await?;

        debug!(category_id, rating = %rating, count = rows.len(), "Queried products");
        let products = rows
            .iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    async fn get_product(&self, product_id: ProductId) -> CatalogResult<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}
             FROM products p JOIN categories c ON c.id = p.category_id
             WHERE p.id = $1"
        );
        let row = sqlx::query(&sql)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(product_from_row).transpose()?)
    }

    async fn list_all_products_with_category(&self) -> CatalogResult<Vec<ProductEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS}
             FROM products p JOIN categories c ON c.id = p.category_id
             ORDER BY c.name, p.name, p.id"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let entries = rows
            .iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn list_user_products(&self, telegram_id: i64) -> CatalogResult<Vec<ProductEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS}
             FROM products p JOIN categories c ON c.id = p.category_id
             WHERE p.user_id = $1
             ORDER BY p.created_at DESC, p.id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(telegram_id)
            .fetch_all(&self.pool)
            .await?;
        let entries = rows
            .iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn list_distinct_users(&self) -> CatalogResult<Vec<UserSummary>> {
        let sql = format!("{USER_SUMMARY_QUERY} GROUP BY u.user_id ORDER BY u.user_id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let users = rows
            .iter()
            .map(user_summary_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    async fn list_banned_users(&self) -> CatalogResult<Vec<UserSummary>> {
        let sql = format!(
            "{USER_SUMMARY_QUERY} WHERE u.is_banned GROUP BY u.user_id ORDER BY u.user_id"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let users = rows
            .iter()
            .map(user_summary_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    async fn move_product(
        &self,
        product_id: ProductId,
        category_id: CategoryId,
    ) -> CatalogResult<bool> {
        let result = sqlx::query("UPDATE products SET category_id = $1 WHERE id = $2")
            .bind(category_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        info!(product_id, category_id, "Product moved");
        Ok(result.rows_affected() > 0)
    }

    async fn rename_product(
        &self,
        product_id: ProductId,
        owner_id: i64,
        new_name: &str,
    ) -> CatalogResult<bool> {
        let result = sqlx::query("UPDATE products SET name = $1 WHERE id = $2 AND user_id = $3")
            .bind(new_name)
            .bind(product_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_product_photo(
        &self,
        product_id: ProductId,
        owner_id: i64,
        photo_ref: &str,
    ) -> CatalogResult<bool> {
        let result =
            sqlx::query("UPDATE products SET photo_ref = $1 WHERE id = $2 AND user_id = $3")
                .bind(photo_ref)
                .bind(product_id)
                .bind(owner_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&self, product_id: ProductId) -> CatalogResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        info!(product_id, "Product deleted");
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user_cascade(&self, telegram_id: i64) -> CatalogResult<bool> {
        let mut tx = self.pool.begin().await?;
        let products = sqlx::query("DELETE FROM products WHERE user_id = $1")
            .bind(telegram_id)
            .execute(&mut *tx)
            .await?;
        let users = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(telegram_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            user_id = telegram_id,
            products_deleted = products.rows_affected(),
            "User deleted"
        );
        Ok(products.rows_affected() + users.rows_affected() > 0)
    }

    async fn clear_all(&self) -> CatalogResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM categories").execute(&mut *tx).await?;
        tx.commit().await?;

        info!("Catalog cleared");
        Ok(())
    }
}
