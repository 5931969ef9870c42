//! # Catalog Telegram Bot
//!
//! A Telegram bot where users file product recommendations ("buy" or "don't
//! buy") under categories, browse what others recommended and get notified
//! about new entries. A single administrator moderates users, categories and
//! entries.

pub mod bot;
pub mod catalog;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod errors;
pub mod localization;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod transport;
