//! # Notification Fan-out
//!
//! Tells subscribed users about a newly saved product. Delivery is best
//! effort: each recipient is attempted independently and failures are only
//! logged.

use tracing::{info, warn};

use crate::catalog::{self, CatalogStore};
use crate::localization::t_args;
use crate::transport::ChatTransport;

/// Outcome of one fan-out round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub failed: usize,
}

/// What a new-product notification is about
#[derive(Debug, Clone)]
pub struct ProductNotice<'a> {
    pub author_id: i64,
    pub author_name: &'a str,
    pub category_name: &'a str,
    pub product_name: &'a str,
    pub rating_label: &'a str,
}

impl ProductNotice<'_> {
    pub fn render(&self) -> String {
        t_args(
            "notification-new-product",
            &[
                ("category", self.category_name),
                ("name", self.product_name),
                ("rating", self.rating_label),
                ("author", self.author_name),
            ],
        )
    }
}

/// Send `notice` to every subscriber except its author.
///
/// Never fails: a store error yields no recipients and a delivery error only
/// counts against [`FanoutReport::failed`].
pub async fn notify_new_product(
    store: &dyn CatalogStore,
    transport: &dyn ChatTransport,
    notice: &ProductNotice<'_>,
) -> FanoutReport {
    let recipients = catalog::subscribers(store, notice.author_id).await;
    let text = notice.render();
    let mut report = FanoutReport::default();

    for recipient in recipients {
        if recipient == notice.author_id {
            continue;
        }
        match transport.send_text(recipient, &text, None).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                warn!(user_id = recipient, error = %e, "Failed to deliver product notification");
                report.failed += 1;
            }
        }
    }

    info!(
        author_id = notice.author_id,
        delivered = report.delivered,
        failed = report.failed,
        "Product notification fan-out finished"
    );
    report
}
