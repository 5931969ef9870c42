use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::sync::LazyLock;
use tracing::{debug, warn};
use unic_langid::LanguageIdentifier;

/// Message catalog compiled into the binary
const EN_MESSAGES: &str = include_str!("../locales/en/main.ftl");

/// Localization manager for the catalog bot
pub struct LocalizationManager {
    bundle: FluentBundle<FluentResource>,
}

impl LocalizationManager {
    /// Create a new localization manager from the embedded English catalog
    pub fn new() -> Self {
        Self::from_source(EN_MESSAGES)
    }

    /// Build a manager from Fluent source. An entry that fails to parse is
    /// dropped as junk up to the next line that starts a new entry, and the
    /// number of such errors is logged. An unclosed placeable can therefore
    /// take the following entries with it.
    pub fn from_source(source: &str) -> Self {
        let locale: LanguageIdentifier = "en".parse().unwrap_or_default();
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        bundle.set_use_isolating(false);

        let resource = match FluentResource::try_new(source.to_string()) {
            Ok(resource) => resource,
            Err((resource, errors)) => {
                warn!(error_count = errors.len(), "Message catalog contains invalid entries");
                resource
            }
        };

        if let Err(errors) = bundle.add_resource(resource) {
            warn!(error_count = errors.len(), "Duplicate entries in message catalog");
        }

        Self { bundle }
    }

    /// Get a localized message
    pub fn get_message(&self, key: &str, args: Option<&FluentArgs>) -> String {
        let msg = match self.bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let mut errors = vec![];
        let value = self.bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            debug!(key, error_count = errors.len(), "Message formatted with errors");
        }

        value.into_owned()
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, FluentValue::from(*value));
        }
        self.get_message(key, Some(&fluent_args))
    }
}

impl Default for LocalizationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Global localization instance
static LOCALIZATION_MANAGER: LazyLock<LocalizationManager> =
    LazyLock::new(LocalizationManager::new);

/// Load the message catalog eagerly so parse problems are logged at startup
pub fn init_localization() {
    LazyLock::force(&LOCALIZATION_MANAGER);
}

/// Get the global localization manager
pub fn get_localization_manager() -> &'static LocalizationManager {
    &LOCALIZATION_MANAGER
}

/// Convenience function to get a localized message
pub fn t(key: &str) -> String {
    get_localization_manager().get_message(key, None)
}

/// Convenience function to get a localized message with arguments
pub fn t_args(key: &str, args: &[(&str, &str)]) -> String {
    get_localization_manager().get_message_with_args(key, args)
}
