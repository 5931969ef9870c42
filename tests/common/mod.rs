//! Shared fakes for engine tests: an in-memory catalog store and a transport
//! that records everything it is asked to send.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use catalog_bot::bot::{
    dialogue_for, handle_callback, handle_inbound, BotContext, ChatUser, Inbound,
};
use catalog_bot::catalog::{CatalogResult, CatalogStore};
use catalog_bot::dialogue::{validate_category_name, ConversationState, ConversationStorage};
use catalog_bot::errors::CatalogError;
use catalog_bot::models::{
    Category, CategoryId, CategorySummary, NewProduct, Product, ProductEntry, ProductId, Rating,
    UserSummary, UNKNOWN_USER_NAME,
};
use catalog_bot::transport::{ChatTransport, Keyboard};

pub const ADMIN_ID: i64 = 1;

#[derive(Debug, Clone)]
struct UserRow {
    notifications_enabled: bool,
    is_banned: bool,
}

#[derive(Debug, Clone)]
struct ProductRow {
    id: ProductId,
    user_id: i64,
    author_name: String,
    category_id: CategoryId,
    name: String,
    rating: Rating,
    photo_ref: Option<String>,
    created_at: NaiveDateTime,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, UserRow>,
    categories: Vec<Category>,
    products: Vec<ProductRow>,
    next_category_id: CategoryId,
    next_product_id: ProductId,
    clock: i64,
}

impl Tables {
    fn category_name(&self, id: CategoryId) -> String {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn to_product(&self, row: &ProductRow) -> Product {
        Product {
            id: row.id,
            user_id: row.user_id,
            author_name: row.author_name.clone(),
            category_id: row.category_id,
            category_name: self.category_name(row.category_id),
            name: row.name.clone(),
            rating: row.rating,
            photo_ref: row.photo_ref.clone(),
            created_at: row.created_at,
        }
    }

    fn to_entry(&self, row: &ProductRow) -> ProductEntry {
        ProductEntry {
            id: row.id,
            name: row.name.clone(),
            category_name: self.category_name(row.category_id),
            created_at: row.created_at,
            photo_ref: row.photo_ref.clone(),
        }
    }

    fn user_summary(&self, user_id: i64) -> UserSummary {
        let display_name = self
            .products
            .iter()
            .filter(|p| p.user_id == user_id)
            .max_by_key(|p| (p.created_at, p.id))
            .map(|p| p.author_name.clone())
            .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string());
        UserSummary {
            telegram_id: user_id,
            display_name,
        }
    }
}

/// In-memory [`CatalogStore`] with the same ordering and upsert rules as the
/// PostgreSQL store. `set_failing(true)` makes every call fail;
/// `set_failing_category_lookup(true)` fails only `category_name`.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: Mutex<Tables>,
    failing: AtomicBool,
    failing_category_lookup: AtomicBool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_category_lookup(&self, failing: bool) {
        self.failing_category_lookup.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> CatalogResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CatalogError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.tables().categories.clone()
    }

    pub fn products(&self) -> Vec<Product> {
        let tables = self.tables();
        tables.products.iter().map(|p| tables.to_product(p)).collect()
    }

    pub fn user_ids(&self) -> Vec<i64> {
        self.tables().users.keys().copied().collect()
    }

    pub fn is_user_banned(&self, user_id: i64) -> bool {
        self.tables()
            .users
            .get(&user_id)
            .map(|u| u.is_banned)
            .unwrap_or(false)
    }

    /// Seed a category directly, bypassing the engine
    pub fn seed_category(&self, name: &str) -> CategoryId {
        let mut tables = self.tables();
        tables.next_category_id += 1;
        let id = tables.next_category_id;
        tables.categories.push(Category {
            id,
            name: name.to_string(),
        });
        id
    }

    /// Seed a product directly, bypassing the engine
    pub fn seed_product(
        &self,
        user_id: i64,
        author_name: &str,
        category_id: CategoryId,
        name: &str,
        rating: Rating,
        photo_ref: Option<&str>,
    ) -> ProductId {
        let mut tables = self.tables();
        tables.users.entry(user_id).or_insert(UserRow {
            notifications_enabled: true,
            is_banned: false,
        });
        insert_product(
            &mut tables,
            &NewProduct {
                user_id,
                author_name: author_name.to_string(),
                category_id,
                name: name.to_string(),
                rating,
                photo_ref: photo_ref.map(str::to_string),
            },
        )
    }
}

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 5)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap()
}

fn insert_product(tables: &mut Tables, product: &NewProduct) -> ProductId {
    tables.next_product_id += 1;
    tables.clock += 1;
    let id = tables.next_product_id;
    let created_at = base_time() + Duration::seconds(tables.clock);
    tables.products.push(ProductRow {
        id,
        user_id: product.user_id,
        author_name: product.author_name.clone(),
        category_id: product.category_id,
        name: product.name.clone(),
        rating: product.rating,
        photo_ref: product.photo_ref.clone(),
        created_at,
    });
    id
}

fn newest_first(rows: &mut [&ProductRow]) {
    rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn ensure_user(&self, telegram_id: i64) -> CatalogResult<()> {
        self.check()?;
        self.tables().users.entry(telegram_id).or_insert(UserRow {
            notifications_enabled: true,
            is_banned: false,
        });
        Ok(())
    }

    async fn banned_flag(&self, telegram_id: i64) -> CatalogResult<bool> {
        self.check()?;
        Ok(self.is_user_banned(telegram_id))
    }

    async fn set_banned(&self, telegram_id: i64, banned: bool) -> CatalogResult<()> {
        self.check()?;
        self.tables()
            .users
            .entry(telegram_id)
            .or_insert(UserRow {
                notifications_enabled: true,
                is_banned: false,
            })
            .is_banned = banned;
        Ok(())
    }

    async fn notification_status(&self, telegram_id: i64) -> CatalogResult<bool> {
        self.check()?;
        Ok(self
            .tables()
            .users
            .entry(telegram_id)
            .or_insert(UserRow {
                notifications_enabled: true,
                is_banned: false,
            })
            .notifications_enabled)
    }

    async fn set_notifications(&self, telegram_id: i64, enabled: bool) -> CatalogResult<()> {
        self.check()?;
        self.tables()
            .users
            .entry(telegram_id)
            .or_insert(UserRow {
                notifications_enabled: true,
                is_banned: false,
            })
            .notifications_enabled = enabled;
        Ok(())
    }

    async fn list_subscribers(&self, excluding: i64) -> CatalogResult<Vec<i64>> {
        self.check()?;
        Ok(self
            .tables()
            .users
            .iter()
            .filter(|(id, row)| **id != excluding && row.notifications_enabled)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        self.check()?;
        let mut categories = self.categories();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn category_summaries(
        &self,
        rating: Option<Rating>,
    ) -> CatalogResult<Vec<CategorySummary>> {
        self.check()?;
        let tables = self.tables();
        let mut summaries: Vec<CategorySummary> = tables
            .categories
            .iter()
            .map(|c| CategorySummary {
                id: c.id,
                name: c.name.clone(),
                product_count: tables
                    .products
                    .iter()
                    .filter(|p| p.category_id == c.id && rating.map_or(true, |r| p.rating == r))
                    .count() as i64,
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    async fn category_name(&self, category_id: CategoryId) -> CatalogResult<Option<String>> {
        self.check()?;
        if self.failing_category_lookup.load(Ordering::SeqCst) {
            return Err(CatalogError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .tables()
            .categories
            .iter()
            .find(|c| c.id == category_id)
            .map(|c| c.name.clone()))
    }

    async fn add_category(&self, name: &str) -> CatalogResult<CategoryId> {
        self.check()?;
        let name = validate_category_name(name)?;
        if let Some(existing) = self.tables().categories.iter().find(|c| c.name == name) {
            return Ok(existing.id);
        }
        Ok(self.seed_category(&name))
    }

    async fn rename_category(
        &self,
        category_id: CategoryId,
        new_name: &str,
    ) -> CatalogResult<bool> {
        self.check()?;
        let new_name = validate_category_name(new_name)?;
        let mut tables = self.tables();
        if tables
            .categories
            .iter()
            .any(|c| c.name == new_name && c.id != category_id)
        {
            return Err(CatalogError::DuplicateName(new_name));
        }
        match tables.categories.iter_mut().find(|c| c.id == category_id) {
            Some(category) => {
                category.name = new_name;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn save_product(&self, product: &NewProduct) -> CatalogResult<ProductId> {
        self.check()?;
        Ok(insert_product(&mut self.tables(), product))
    }

    async fn query_products(
        &self,
        category_id: CategoryId,
        rating: Rating,
    ) -> CatalogResult<Vec<Product>> {
        self.check()?;
        let tables = self.tables();
        let mut rows: Vec<&ProductRow> = tables
            .products
            .iter()
            .filter(|p| p.category_id == category_id && p.rating == rating)
            .collect();
        newest_first(&mut rows);
        Ok(rows.into_iter().map(|p| tables.to_product(p)).collect())
    }

    async fn get_product(&self, product_id: ProductId) -> CatalogResult<Option<Product>> {
        self.check()?;
        let tables = self.tables();
        Ok(tables
            .products
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| tables.to_product(p)))
    }

    async fn list_all_products_with_category(&self) -> CatalogResult<Vec<ProductEntry>> {
        self.check()?;
        let tables = self.tables();
        let mut entries: Vec<ProductEntry> =
            tables.products.iter().map(|p| tables.to_entry(p)).collect();
        entries.sort_by(|a, b| {
            (&a.category_name, &a.name, a.id).cmp(&(&b.category_name, &b.name, b.id))
        });
        Ok(entries)
    }

    async fn list_user_products(&self, telegram_id: i64) -> CatalogResult<Vec<ProductEntry>> {
        self.check()?;
        let tables = self.tables();
        let mut rows: Vec<&ProductRow> = tables
            .products
            .iter()
            .filter(|p| p.user_id == telegram_id)
            .collect();
        newest_first(&mut rows);
        Ok(rows.into_iter().map(|p| tables.to_entry(p)).collect())
    }

    async fn list_distinct_users(&self) -> CatalogResult<Vec<UserSummary>> {
        self.check()?;
        let tables = self.tables();
        Ok(tables
            .users
            .keys()
            .map(|id| tables.user_summary(*id))
            .collect())
    }

    async fn list_banned_users(&self) -> CatalogResult<Vec<UserSummary>> {
        self.check()?;
        let tables = self.tables();
        Ok(tables
            .users
            .iter()
            .filter(|(_, row)| row.is_banned)
            .map(|(id, _)| tables.user_summary(*id))
            .collect())
    }

    async fn move_product(
        &self,
        product_id: ProductId,
        category_id: CategoryId,
    ) -> CatalogResult<bool> {
        self.check()?;
        let mut tables = self.tables();
        Ok(match tables.products.iter_mut().find(|p| p.id == product_id) {
            Some(product) => {
                product.category_id = category_id;
                true
            }
            None => false,
        })
    }

    async fn rename_product(
        &self,
        product_id: ProductId,
        owner_id: i64,
        new_name: &str,
    ) -> CatalogResult<bool> {
        self.check()?;
        let mut tables = self.tables();
        Ok(
            match tables
                .products
                .iter_mut()
                .find(|p| p.id == product_id && p.user_id == owner_id)
            {
                Some(product) => {
                    product.name = new_name.to_string();
                    true
                }
                None => false,
            },
        )
    }

    async fn set_product_photo(
        &self,
        product_id: ProductId,
        owner_id: i64,
        photo_ref: &str,
    ) -> CatalogResult<bool> {
        self.check()?;
        let mut tables = self.tables();
        Ok(
            match tables
                .products
                .iter_mut()
                .find(|p| p.id == product_id && p.user_id == owner_id)
            {
                Some(product) => {
                    product.photo_ref = Some(photo_ref.to_string());
                    true
                }
                None => false,
            },
        )
    }

    async fn delete_product(&self, product_id: ProductId) -> CatalogResult<bool> {
        self.check()?;
        let mut tables = self.tables();
        let before = tables.products.len();
        tables.products.retain(|p| p.id != product_id);
        Ok(tables.products.len() < before)
    }

    async fn delete_user_cascade(&self, telegram_id: i64) -> CatalogResult<bool> {
        self.check()?;
        let mut tables = self.tables();
        let before = tables.products.len();
        tables.products.retain(|p| p.user_id != telegram_id);
        let removed_products = tables.products.len() < before;
        let removed_user = tables.users.remove(&telegram_id).is_some();
        Ok(removed_products || removed_user)
    }

    async fn clear_all(&self) -> CatalogResult<()> {
        self.check()?;
        let mut tables = self.tables();
        tables.products.clear();
        tables.categories.clear();
        Ok(())
    }
}

/// One outgoing message captured by [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub photo_ref: Option<String>,
}

/// [`ChatTransport`] that records messages; sends to ids registered with
/// `fail_for` return an error
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    failing_chats: Mutex<HashSet<i64>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, chat_id: i64) {
        self.failing_chats.lock().unwrap().insert(chat_id);
    }

    fn should_fail(&self, chat_id: i64) -> bool {
        self.failing_chats.lock().unwrap().contains(&chat_id)
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| s.chat_id == chat_id)
            .collect()
    }

    pub fn last_to(&self, chat_id: i64) -> Sent {
        self.sent_to(chat_id)
            .pop()
            .unwrap_or_else(|| panic!("nothing was sent to {chat_id}"))
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<()> {
        if self.should_fail(chat_id) {
            return Err(anyhow!("chat {chat_id} unreachable"));
        }
        self.sent.lock().unwrap().push(Sent {
            chat_id,
            text: text.to_string(),
            keyboard,
            photo_ref: None,
        });
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, photo_ref: &str, caption: &str) -> Result<()> {
        if self.should_fail(chat_id) {
            return Err(anyhow!("chat {chat_id} unreachable"));
        }
        self.sent.lock().unwrap().push(Sent {
            chat_id,
            text: caption.to_string(),
            keyboard: None,
            photo_ref: Some(photo_ref.to_string()),
        });
        Ok(())
    }
}

/// Engine wired to the fakes, driven one event at a time
pub struct TestBot {
    pub ctx: BotContext,
    pub store: Arc<MemoryCatalog>,
    pub transport: Arc<RecordingTransport>,
    pub storage: Arc<ConversationStorage>,
}

impl TestBot {
    pub fn new() -> Self {
        let store = Arc::new(MemoryCatalog::new());
        let transport = Arc::new(RecordingTransport::new());
        let ctx = BotContext {
            store: store.clone(),
            transport: transport.clone(),
            admin_id: ADMIN_ID,
            bot_username: "catalog_bot".to_string(),
        };
        Self {
            ctx,
            store,
            transport,
            storage: ConversationStorage::new(),
        }
    }

    pub async fn text(&self, user: &ChatUser, text: &str) {
        handle_inbound(&self.ctx, self.storage.clone(), user, Inbound::Text(text.to_string()))
            .await
            .unwrap();
    }

    pub async fn photo(&self, user: &ChatUser, photo_ref: &str, caption: Option<&str>) {
        let inbound = Inbound::Photo {
            photo_ref: photo_ref.to_string(),
            caption: caption.map(str::to_string),
        };
        handle_inbound(&self.ctx, self.storage.clone(), user, inbound)
            .await
            .unwrap();
    }

    pub async fn unsupported(&self, user: &ChatUser) {
        handle_inbound(&self.ctx, self.storage.clone(), user, Inbound::Unsupported)
            .await
            .unwrap();
    }

    pub async fn callback(&self, user: &ChatUser, token: &str) {
        handle_callback(&self.ctx, user, token).await.unwrap();
    }

    /// Current conversation state; idle when no entry is stored
    pub async fn state(&self, user: &ChatUser) -> ConversationState {
        dialogue_for(self.storage.clone(), user.id)
            .get_or_default()
            .await
            .unwrap()
    }

    pub fn last_text(&self, user: &ChatUser) -> String {
        self.transport.last_to(user.id).text
    }
}

pub fn admin() -> ChatUser {
    ChatUser::new(ADMIN_ID, "Admin")
}

pub fn user(id: i64, name: &str) -> ChatUser {
    ChatUser::new(id, name)
}
