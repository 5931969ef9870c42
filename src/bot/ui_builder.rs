//! UI Builder module for creating keyboards and formatting messages
//!
//! Everything here is pure rendering over data that was already fetched.
//! Button labels double as the text the engine receives when a reply-keyboard
//! button is pressed, so the constants below are also matched on input.

use chrono::NaiveDateTime;

use crate::localization::{t, t_args};
use crate::models::{CategorySummary, Product, ProductEntry, ProductId, Rating, UserSummary};
use crate::transport::{InlineButton, Keyboard};

// Main menu
pub const ADD_PRODUCT: &str = "➕ Add product";
pub const HELP: &str = "❔ Help";
pub const BROWSE_RECOMMENDED: &str = "✅ Buy";
pub const BROWSE_AVOIDED: &str = "❌ Don't buy";
pub const NOTIFICATIONS_ON: &str = "🔔";
pub const NOTIFICATIONS_OFF: &str = "🔕";

// Dialog controls
pub const BACK: &str = "Back";
pub const OTHER: &str = "Other";
pub const EDIT_NAME: &str = "Edit name";
pub const EDIT_PHOTO: &str = "Edit photo";

pub const PHOTO_CALLBACK_PREFIX: &str = "show_photo_";
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Maximum number of buttons per row in numeric pickers
pub const PICKER_ROW_WIDTH: usize = 3;

/// Returns true for any label of the main menu, bell included
pub fn is_main_menu_label(text: &str) -> bool {
    [
        ADD_PRODUCT,
        HELP,
        BROWSE_RECOMMENDED,
        BROWSE_AVOIDED,
        NOTIFICATIONS_ON,
        NOTIFICATIONS_OFF,
    ]
    .contains(&text)
}

/// Main menu; the bell shows the current notification preference
pub fn main_menu_keyboard(notifications_enabled: bool) -> Keyboard {
    let bell = if notifications_enabled {
        NOTIFICATIONS_ON
    } else {
        NOTIFICATIONS_OFF
    };
    Keyboard::Reply(vec![
        vec![ADD_PRODUCT.to_string(), HELP.to_string()],
        vec![BROWSE_RECOMMENDED.to_string(), BROWSE_AVOIDED.to_string()],
        vec![bell.to_string()],
    ])
}

/// Numeric picker for `count` items, three per row, followed by an optional
/// control row. An empty picker only offers "Back".
pub fn number_keyboard(count: usize, show_other: bool, show_back: bool) -> Keyboard {
    let numbers: Vec<String> = (1..=count).map(|n| n.to_string()).collect();
    let mut rows: Vec<Vec<String>> = numbers
        .chunks(PICKER_ROW_WIDTH)
        .map(|chunk| chunk.to_vec())
        .collect();

    let mut controls = Vec::new();
    if show_other {
        controls.push(OTHER.to_string());
    }
    if show_back {
        controls.push(BACK.to_string());
    }
    if !controls.is_empty() {
        rows.push(controls);
    }

    if rows.is_empty() {
        rows.push(vec![BACK.to_string()]);
    }
    Keyboard::Reply(rows)
}

pub fn back_keyboard() -> Keyboard {
    Keyboard::Reply(vec![vec![BACK.to_string()]])
}

pub fn rating_keyboard() -> Keyboard {
    Keyboard::Reply(vec![
        vec![
            Rating::Recommend.as_str().to_string(),
            Rating::Avoid.as_str().to_string(),
        ],
        vec![BACK.to_string()],
    ])
}

pub fn edit_field_keyboard() -> Keyboard {
    Keyboard::Reply(vec![
        vec![EDIT_NAME.to_string(), EDIT_PHOTO.to_string()],
        vec![BACK.to_string()],
    ])
}

/// Rating chosen from the rating keyboard, if `text` is one of its labels
pub fn parse_rating_label(text: &str) -> Option<Rating> {
    match text.trim() {
        t if t == Rating::Recommend.as_str() => Some(Rating::Recommend),
        t if t == Rating::Avoid.as_str() => Some(Rating::Avoid),
        _ => None,
    }
}

/// Human label of a rating as used in lists and notifications
pub fn rating_label(rating: Rating) -> &'static str {
    match rating {
        Rating::Recommend => BROWSE_RECOMMENDED,
        Rating::Avoid => BROWSE_AVOIDED,
    }
}

pub fn format_date(timestamp: &NaiveDateTime) -> String {
    timestamp.format(DATE_FORMAT).to_string()
}

/// Render items as a numbered list, one per line, starting at 1
pub fn numbered_list<T, F>(items: &[T], render: F) -> String
where
    F: Fn(&T) -> String,
{
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, render(item)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Category list with product counts, e.g. `1. Snacks [3]`
pub fn format_category_summaries(summaries: &[CategorySummary]) -> String {
    numbered_list(summaries, |c| format!("{} [{}]", c.name, c.product_count))
}

pub fn format_category_names<T: AsRef<str>>(names: &[T]) -> String {
    numbered_list(names, |name| AsRef::<str>::as_ref(name).to_string())
}

/// Product pick-list entry, e.g. `1. Chips (Snacks, 05.03.2024)`
pub fn format_product_entries(entries: &[ProductEntry]) -> String {
    numbered_list(entries, |p| {
        format!(
            "{} ({}, {})",
            p.name,
            p.category_name,
            format_date(&p.created_at)
        )
    })
}

pub fn format_users(users: &[UserSummary]) -> String {
    numbered_list(users, |u| format!("{} ({})", u.display_name, u.telegram_id))
}

/// Header prefixed to a picker body, separated by a blank line
pub fn with_list(header: &str, body: &str) -> String {
    if body.is_empty() {
        header.to_string()
    } else {
        format!("{header}\n\n{body}")
    }
}

/// One line of the browse output
pub fn product_line(product: &Product) -> String {
    t_args(
        "product-line",
        &[
            ("name", product.name.as_str()),
            ("date", format_date(&product.created_at).as_str()),
            ("author", product.author_name.as_str()),
        ],
    )
}

pub fn photo_token(product_id: ProductId) -> String {
    format!("{PHOTO_CALLBACK_PREFIX}{product_id}")
}

pub fn parse_photo_token(token: &str) -> Option<ProductId> {
    token.strip_prefix(PHOTO_CALLBACK_PREFIX)?.parse().ok()
}

/// Inline "show photo" action, only for products that have a photo
pub fn photo_keyboard(product: &Product) -> Option<Keyboard> {
    product.photo_ref.as_ref().map(|_| {
        Keyboard::Inline(vec![vec![InlineButton {
            label: t("photo-button"),
            token: photo_token(product.id),
        }]])
    })
}

pub fn photo_caption(product: &Product) -> String {
    t_args(
        "photo-caption",
        &[
            ("name", product.name.as_str()),
            ("category", product.category_name.as_str()),
            ("rating", rating_label(product.rating)),
            ("date", format_date(&product.created_at).as_str()),
            ("author", product.author_name.as_str()),
        ],
    )
}
