// =============================================================================
// ACTIVITY LOG CATEGORIZER
// =============================================================================
// Buckets activity-log notifications by business domain using the audit
// action name, the action category and the owning module.
//
// NOTE: the material rule must run before the order rule. Purchase-order
// actions live under `orders` in some records and would otherwise be taken
// for customer orders.
//
// Unlike the notification categorizer, sections here are sorted by unread
// count then size, not by declared order.
// =============================================================================

use serde::Serialize;

use super::{partition, Category, Section};
use crate::models::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Material,
    Product,
    Order,
    Customer,
    Supplier,
    Production,
    Other,
}

impl Category for ActivityCategory {
    const ORDER: &'static [Self] = &[
        ActivityCategory::Material,
        ActivityCategory::Product,
        ActivityCategory::Order,
        ActivityCategory::Customer,
        ActivityCategory::Supplier,
        ActivityCategory::Production,
        ActivityCategory::Other,
    ];

    fn title(&self) -> &'static str {
        match self {
            ActivityCategory::Material => "Materials & Purchase Orders",
            ActivityCategory::Product => "Products",
            ActivityCategory::Order => "Orders",
            ActivityCategory::Customer => "Customers",
            ActivityCategory::Supplier => "Suppliers",
            ActivityCategory::Production => "Production & Recipes",
            ActivityCategory::Other => "Other Activity",
        }
    }
}

fn starts_with_any(action: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| action.starts_with(prefix))
}

/// Domain of a single activity-log record, first matching rule wins.
pub fn classify_activity(notification: &Notification) -> ActivityCategory {
    let action = notification.action();
    let category = notification.action_category();
    let module = notification.module.as_str();

    if matches!(category, "MATERIAL" | "PURCHASE_ORDER")
        || starts_with_any(action, &["MATERIAL_", "PURCHASE_ORDER_"])
        || module == "materials"
    {
        ActivityCategory::Material
    } else if category == "PRODUCT" || action.starts_with("PRODUCT_") || module == "products" {
        ActivityCategory::Product
    } else if category == "ORDER"
        || action.starts_with("ORDER_")
        || (module == "orders" && !action.starts_with("PURCHASE_ORDER"))
    {
        ActivityCategory::Order
    } else if category == "CLIENT" || starts_with_any(action, &["CLIENT_", "CUSTOMER_"]) {
        ActivityCategory::Customer
    } else if action.starts_with("SUPPLIER_") {
        ActivityCategory::Supplier
    } else if matches!(category, "RECIPE" | "PRODUCTION")
        || starts_with_any(action, &["RECIPE_", "PRODUCTION_"])
        || module == "production"
    {
        ActivityCategory::Production
    } else {
        ActivityCategory::Other
    }
}

/// Partition `list` into domain sections sorted by
/// `(unread_count desc, notifications.len() desc)`.
///
/// The sort is stable, so ties keep declared category order.
pub fn categorize_activity_logs(list: &[Notification]) -> Vec<Section<ActivityCategory>> {
    let mut sections = partition(list, classify_activity);
    sections.sort_by(|a, b| {
        b.unread_count
            .cmp(&a.unread_count)
            .then_with(|| b.notifications.len().cmp(&a.notifications.len()))
    });
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::fixtures::{activity, notification};
    use crate::models::RelatedData;
    use serde_json::json;

    fn classify(action: &str, category: Option<&str>, module: &str) -> ActivityCategory {
        classify_activity(&activity(action, category, module, false))
    }

    #[test]
    fn test_purchase_order_in_orders_module_is_material() {
        assert_eq!(
            classify("PURCHASE_ORDER_CREATE", None, "orders"),
            ActivityCategory::Material
        );
    }

    #[test]
    fn test_material_rules() {
        assert_eq!(classify("", Some("MATERIAL"), ""), ActivityCategory::Material);
        assert_eq!(classify("", Some("PURCHASE_ORDER"), ""), ActivityCategory::Material);
        assert_eq!(classify("MATERIAL_UPDATE", None, ""), ActivityCategory::Material);
        assert_eq!(classify("SOMETHING", None, "materials"), ActivityCategory::Material);
    }

    #[test]
    fn test_product_rules() {
        assert_eq!(classify("", Some("PRODUCT"), ""), ActivityCategory::Product);
        assert_eq!(classify("PRODUCT_DELETE", None, ""), ActivityCategory::Product);
        assert_eq!(classify("UPDATE", None, "products"), ActivityCategory::Product);
    }

    #[test]
    fn test_order_rules() {
        assert_eq!(classify("", Some("ORDER"), ""), ActivityCategory::Order);
        assert_eq!(classify("ORDER_SHIPPED", None, ""), ActivityCategory::Order);
        assert_eq!(classify("STATUS_CHANGE", None, "orders"), ActivityCategory::Order);
    }

    #[test]
    fn test_bare_purchase_order_action_in_orders_module_is_not_order() {
        // no trailing underscore: misses the material prefix but the order
        // rule still excludes it
        assert_eq!(classify("PURCHASE_ORDER", None, "orders"), ActivityCategory::Other);
    }

    #[test]
    fn test_customer_and_supplier_rules() {
        assert_eq!(classify("", Some("CLIENT"), ""), ActivityCategory::Customer);
        assert_eq!(classify("CLIENT_CREATE", None, ""), ActivityCategory::Customer);
        assert_eq!(classify("CUSTOMER_UPDATE", None, ""), ActivityCategory::Customer);
        assert_eq!(classify("SUPPLIER_CREATE", None, ""), ActivityCategory::Supplier);
    }

    #[test]
    fn test_production_rules() {
        assert_eq!(classify("", Some("RECIPE"), ""), ActivityCategory::Production);
        assert_eq!(classify("", Some("PRODUCTION"), ""), ActivityCategory::Production);
        assert_eq!(classify("RECIPE_UPDATE", None, ""), ActivityCategory::Production);
        assert_eq!(classify("PRODUCTION_START", None, ""), ActivityCategory::Production);
        assert_eq!(classify("STAGE_CHANGE", None, "production"), ActivityCategory::Production);
    }

    #[test]
    fn test_missing_related_data_is_other() {
        let n = crate::classify::fixtures::notification("activity", "", true);
        assert_eq!(classify_activity(&n), ActivityCategory::Other);
    }

    #[test]
    fn test_non_string_action_is_other() {
        let mut n = notification("activity", "orders", true);
        n.related_data = RelatedData::from_value(json!({
            "activity_log_id": 9,
            "action": 42,
            "action_category": ["ORDER"]
        }));

        assert!(n.is_activity_log());
        assert_eq!(classify_activity(&n), ActivityCategory::Other);
    }

    #[test]
    fn test_sections_sorted_by_unread_then_size() {
        let list = vec![
            activity("MATERIAL_UPDATE", None, "", false),
            activity("MATERIAL_UPDATE", None, "", false),
            activity("MATERIAL_UPDATE", None, "", false),
            activity("PRODUCT_CREATE", None, "", true),
            activity("SUPPLIER_CREATE", None, "", true),
            activity("SUPPLIER_UPDATE", None, "", false),
            activity("CLIENT_CREATE", None, "", false),
        ];

        let sections = categorize_activity_logs(&list);
        let order: Vec<_> = sections.iter().map(|s| s.category).collect();

        assert_eq!(
            order,
            vec![
                ActivityCategory::Supplier, // 1 unread, 2 items
                ActivityCategory::Product,  // 1 unread, 1 item
                ActivityCategory::Material, // 0 unread, 3 items
                ActivityCategory::Customer, // 0 unread, 1 item
            ]
        );
    }

    #[test]
    fn test_ties_keep_declared_order() {
        let list = vec![
            activity("SUPPLIER_CREATE", None, "", false),
            activity("PRODUCT_CREATE", None, "", false),
        ];

        let order: Vec<_> = categorize_activity_logs(&list)
            .iter()
            .map(|s| s.category)
            .collect();

        assert_eq!(order, vec![ActivityCategory::Product, ActivityCategory::Supplier]);
    }

    #[test]
    fn test_partition_and_idempotence() {
        let list = vec![
            activity("PURCHASE_ORDER_CREATE", None, "orders", true),
            activity("ORDER_CREATE", None, "orders", true),
            activity("RECIPE_UPDATE", None, "", false),
            activity("LOGIN", None, "", false),
        ];

        let first = categorize_activity_logs(&list);
        let second = categorize_activity_logs(&list);

        assert_eq!(first, second);
        let total: usize = first.iter().map(|s| s.notifications.len()).sum();
        assert_eq!(total, list.len());
        assert!(first.iter().all(|s| !s.notifications.is_empty()));
    }
}
