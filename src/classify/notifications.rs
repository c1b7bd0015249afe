// =============================================================================
// NOTIFICATION CATEGORIZER
// =============================================================================
// Buckets a flat notification list into the sections of the notification
// drawer. Sections come out in fixed declared order, empty ones dropped.
// =============================================================================

use serde::Serialize;

use super::{partition, Category, Section};
use crate::models::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Orders,
    Production,
    Stock,
    ActivityLogs,
    Other,
}

impl Category for NotificationCategory {
    const ORDER: &'static [Self] = &[
        NotificationCategory::Orders,
        NotificationCategory::Production,
        NotificationCategory::Stock,
        NotificationCategory::ActivityLogs,
        NotificationCategory::Other,
    ];

    fn title(&self) -> &'static str {
        match self {
            NotificationCategory::Orders => "Orders",
            NotificationCategory::Production => "Production",
            NotificationCategory::Stock => "Stock Alerts",
            NotificationCategory::ActivityLogs => "Activity Logs",
            NotificationCategory::Other => "Other",
        }
    }
}

const STOCK_TYPES: [&str; 3] = ["low_stock", "restock_request", "out_of_stock"];

/// Category of a single notification, first matching rule wins.
pub fn classify_notification(notification: &Notification) -> NotificationCategory {
    let module = notification.module.as_str();
    let kind = notification.kind.as_str();

    if notification.is_activity_log() {
        NotificationCategory::ActivityLogs
    } else if module == "orders" || kind == "order_alert" {
        NotificationCategory::Orders
    } else if module == "production" || kind == "production_request" {
        NotificationCategory::Production
    } else if STOCK_TYPES.contains(&kind) {
        NotificationCategory::Stock
    } else {
        NotificationCategory::Other
    }
}

/// Partition `list` into sections ordered
/// `[orders, production, stock, activity_logs, other]`.
pub fn categorize_notifications(list: &[Notification]) -> Vec<Section<NotificationCategory>> {
    partition(list, classify_notification)
}
