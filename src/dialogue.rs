//! Conversation state for the per-user catalog dialogue.
//!
//! Each variant of [`ConversationState`] is one step of the dialog and carries
//! only the fields that step needs. Selection lists (categories, products,
//! users) are snapshots taken when the step is entered. Numeric replies are
//! resolved against the snapshot, never against a fresh query, so the numbers
//! a user sees stay stable for the lifetime of the step even if the store
//! changes underneath.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::bot::ui_builder::{BACK, OTHER};
use crate::errors::NameError;
use crate::models::{Category, CategoryId, ProductEntry, ProductId, Rating, UserSummary};

pub const MAX_CATEGORY_NAME_CHARS: usize = 64;
pub const MAX_PRODUCT_NAME_CHARS: usize = 255;

/// Why the user is picking a category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryPurpose {
    /// Filing a new product
    Add,
    /// Browsing products with the given rating
    View(Rating),
}

/// Moderation action applied to the user picked from a list
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserAction {
    Delete,
    Ban,
    Unban,
}

/// Represents where a user currently is within a multi-step dialog
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ConversationState {
    /// Main menu. Never stored: an absent entry means idle.
    #[default]
    Idle,
    ChoosingCategory {
        purpose: CategoryPurpose,
        categories: Vec<Category>,
    },
    AddingCategory,
    AwaitingProductName {
        category_id: CategoryId,
        photo_ref: Option<String>,
    },
    AwaitingRating {
        category_id: CategoryId,
        product_name: String,
        photo_ref: Option<String>,
    },
    SelectingUser {
        action: UserAction,
        users: Vec<UserSummary>,
    },
    SelectingCategoryToRename {
        categories: Vec<Category>,
    },
    EnteringNewCategoryName {
        category_id: CategoryId,
        current_name: String,
    },
    SelectingProductToMove {
        products: Vec<ProductEntry>,
    },
    SelectingNewCategoryForProduct {
        product_id: ProductId,
        categories: Vec<Category>,
    },
    SelectingProductToDelete {
        products: Vec<ProductEntry>,
    },
    SelectingProductToEdit {
        products: Vec<ProductEntry>,
    },
    ChoosingEditField {
        product_id: ProductId,
    },
    EditingProductName {
        product_id: ProductId,
    },
    EditingProductPhoto {
        product_id: ProductId,
    },
}

impl ConversationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationState::Idle)
    }
}

/// Process-wide conversation table, keyed by chat id
pub type ConversationStorage = InMemStorage<ConversationState>;

/// Type alias for one user's handle into the conversation table
pub type CatalogDialogue = Dialogue<ConversationState, ConversationStorage>;

/// Drop the user's conversation entry, returning them to idle.
///
/// Removing an absent entry is not an error here.
pub async fn reset_dialogue(dialogue: &CatalogDialogue) -> anyhow::Result<()> {
    if dialogue.get().await?.is_some() {
        dialogue.exit().await?;
    }
    Ok(())
}

/// Resolve a 1-based numeric reply against a list of `len` items.
///
/// Returns the 0-based index, or `None` for non-numeric or out-of-range input.
pub fn parse_selection(input: &str, len: usize) -> Option<usize> {
    let number: usize = input.trim().parse().ok()?;
    if (1..=len).contains(&number) {
        Some(number - 1)
    } else {
        None
    }
}

/// Validates a category name: non-empty, not a reserved button label, bounded
pub fn validate_category_name(name: &str) -> Result<String, NameError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }

    if [BACK, OTHER]
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(trimmed))
    {
        return Err(NameError::Reserved(trimmed.to_string()));
    }

    if trimmed.chars().count() > MAX_CATEGORY_NAME_CHARS {
        return Err(NameError::TooLong {
            max: MAX_CATEGORY_NAME_CHARS,
        });
    }

    Ok(trimmed.to_string())
}

/// Validates a product name input
pub fn validate_product_name(name: &str) -> Result<String, NameError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }

    if trimmed.chars().count() > MAX_PRODUCT_NAME_CHARS {
        return Err(NameError::TooLong {
            max: MAX_PRODUCT_NAME_CHARS,
        });
    }

    Ok(trimmed.to_string())
}
