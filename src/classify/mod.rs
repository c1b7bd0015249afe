// =============================================================================
// CLASSIFY MODULE
// =============================================================================
// Pure derivations from entity snapshots to UI-facing classifications.
//
// Every function here is synchronous, total and side-effect free: no I/O, no
// logging, no metrics. Handlers load data, call into this module, then record
// whatever they need. Inputs are borrowed and never mutated, so running a
// classifier twice on the same slice gives identical output.
// =============================================================================

pub mod activity;
pub mod material;
pub mod notifications;
pub mod stage;
pub mod stock;

use serde::Serialize;

use crate::models::Notification;

pub use activity::{categorize_activity_logs, ActivityCategory};
pub use material::{resolve_material_health, Severity};
pub use notifications::{categorize_notifications, NotificationCategory};
pub use stage::{resolve_stage_progress, BatchStage, StageProgress};
pub use stock::resolve_stock_status;

// =============================================================================
// SECTION
// =============================================================================
/// A titled group of notifications produced by a categorizer.
///
/// `C` is the category enum of the categorizer that built it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section<C> {
    pub category: C,
    pub title: &'static str,
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

/// Implemented by the category enums so [`partition`] can build sections.
pub trait Category: Copy + Eq + 'static {
    /// Every variant, in declared order
    const ORDER: &'static [Self];

    fn title(&self) -> &'static str;
}

/// Stable partition of `list` into non-empty sections in `C::ORDER` order.
///
/// Each record is cloned into exactly one section; records keep their input
/// order within a section.
pub(crate) fn partition<C, F>(list: &[Notification], classify: F) -> Vec<Section<C>>
where
    C: Category,
    F: Fn(&Notification) -> C,
{
    let mut buckets: Vec<Vec<Notification>> = vec![Vec::new(); C::ORDER.len()];

    for notification in list {
        let category = classify(notification);
        // ORDER lists every variant, so the lookup always succeeds
        if let Some(index) = C::ORDER.iter().position(|c| *c == category) {
            buckets[index].push(notification.clone());
        }
    }

    C::ORDER
        .iter()
        .zip(buckets)
        .filter(|(_, notifications)| !notifications.is_empty())
        .map(|(category, notifications)| Section {
            category: *category,
            title: category.title(),
            unread_count: notifications.iter().filter(|n| n.is_unread()).count(),
            notifications,
        })
        .collect()
}

/// Unread total over a set of sections
pub fn total_unread<C>(sections: &[Section<C>]) -> usize {
    sections.iter().map(|s| s.unread_count).sum()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{Notification, NotificationStatus, RelatedData};
    use uuid::Uuid;

    /// Plain notification with the given type, module and unread flag
    pub fn notification(kind: &str, module: &str, unread: bool) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            module: module.to_string(),
            title: String::new(),
            message: String::new(),
            status: Some(if unread {
                NotificationStatus::Unread
            } else {
                NotificationStatus::Read
            }),
            related_data: None,
            created_at: None,
        }
    }

    /// Activity-log notification carrying an action and optional category
    pub fn activity(action: &str, category: Option<&str>, module: &str, unread: bool) -> Notification {
        let mut n = notification("activity", module, unread);
        n.related_data = Some(RelatedData {
            activity_log_id: Some(serde_json::json!(Uuid::new_v4().to_string())),
            action: Some(action.to_string()),
            action_category: category.map(str::to_string),
            extra: Default::default(),
        });
        n
    }
}
