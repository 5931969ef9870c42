//! # Catalog Data Model
//!
//! Entities and read models shared by the store, the dialog engine and the
//! menu projection.
//!
//! ## Core Concepts
//!
//! - **Category**: a named grouping products are filed under
//! - **Product**: a recommendation with a [`Rating`] and optional photo
//! - **UserSummary**: a user identity paired with a best-effort display name

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type CategoryId = i32;
pub type ProductId = i32;

/// Binary recommendation classification of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rating {
    Recommend,
    Avoid,
}

impl Rating {
    /// Value stored in the `products.rating` column and shown on rating buttons
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Recommend => "Recommend",
            Rating::Avoid => "Avoid",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Recommend" => Ok(Rating::Recommend),
            "Avoid" => Ok(Rating::Avoid),
            other => Err(format!("unknown rating: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Category with the number of products filed under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub id: CategoryId,
    pub name: String,
    pub product_count: i64,
}

impl From<&CategorySummary> for Category {
    fn from(summary: &CategorySummary) -> Self {
        Category {
            id: summary.id,
            name: summary.name.clone(),
        }
    }
}

/// A stored product joined with its category name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub user_id: i64,
    pub author_name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub name: String,
    pub rating: Rating,
    pub photo_ref: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Compact product row used by numbered pick-lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEntry {
    pub id: ProductId,
    pub name: String,
    pub category_name: String,
    pub created_at: NaiveDateTime,
    pub photo_ref: Option<String>,
}

/// Insert payload for a new product; `id` and `created_at` are store-assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub user_id: i64,
    pub author_name: String,
    pub category_id: CategoryId,
    pub name: String,
    pub rating: Rating,
    pub photo_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub telegram_id: i64,
    pub display_name: String,
}

/// Placeholder display name for users without any submitted product
pub const UNKNOWN_USER_NAME: &str = "Unknown";
