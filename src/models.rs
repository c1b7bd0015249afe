// =============================================================================
// MODELS MODULE
// =============================================================================
// Data structures shared by the database layer, the classifiers and the HTTP
// handlers.
//
// Entity records (Product, RawMaterial, ProductionBatch, Notification) are
// snapshots of backend-owned rows. Field names match the REST/DB contract
// exactly (snake_case). Missing numeric fields read as 0 and missing strings
// read as "", so a partial record always classifies into a default bucket
// instead of failing to parse.
// =============================================================================

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::classify::material::MaterialHealth;
use crate::classify::stage::StageProgress;
use crate::classify::Section;

// =============================================================================
// PRODUCT
// =============================================================================
/// A finished product tracked in stock.
///
/// `status` is kept as the raw string the backend returned. Use
/// [`Product::status_tag`] to read it as a typed [`ProductStatus`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    #[serde(default)]
    pub id: Uuid,

    #[serde(default)]
    pub sku: String,

    #[serde(default)]
    pub name: String,

    /// Units currently on hand
    #[serde(default)]
    pub current_stock: f64,

    /// Below this level the product counts as low stock
    #[serde(default)]
    pub min_stock_level: f64,

    /// One of the six status tags, or absent
    #[serde(default)]
    pub status: Option<String>,
}

impl Product {
    /// The stored status parsed into a tag. Unknown strings yield `None`.
    pub fn status_tag(&self) -> Option<ProductStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }
}

// -----------------------------------------------------------------------------
// PRODUCT STATUS
// -----------------------------------------------------------------------------
/// Stock/lifecycle status of a product.
///
/// Serialized in kebab-case: `in-stock`, `low-stock`, `out-of-stock`,
/// `active`, `inactive`, `discontinued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductStatus {
    InStock,
    LowStock,
    OutOfStock,
    Active,
    Inactive,
    Discontinued,
}

impl ProductStatus {
    pub const ALL: [ProductStatus; 6] = [
        ProductStatus::InStock,
        ProductStatus::LowStock,
        ProductStatus::OutOfStock,
        ProductStatus::Active,
        ProductStatus::Inactive,
        ProductStatus::Discontinued,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::InStock => "in-stock",
            ProductStatus::LowStock => "low-stock",
            ProductStatus::OutOfStock => "out-of-stock",
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::Discontinued => "discontinued",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown product status: {}", s))
    }
}

// =============================================================================
// RAW MATERIAL
// =============================================================================
/// A raw material with its stock thresholds. Units are not interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RawMaterial {
    #[serde(default)]
    pub id: Uuid,

    #[serde(default)]
    pub name: String,

    /// Display unit (kg, l, pcs...)
    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub current_stock: f64,

    /// Below this the material is low
    #[serde(default)]
    pub min_threshold: f64,

    /// From here up to `max_capacity` the stock is healthy
    #[serde(default)]
    pub reorder_point: f64,

    /// At or above this the material is overstocked
    #[serde(default)]
    pub max_capacity: f64,
}

// =============================================================================
// PRODUCTION BATCH
// =============================================================================
/// Persisted batch status. The four-step stage pipeline is separate and is
/// supplied by the caller (see `classify::stage`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Planned,
    /// The backend uses both spellings
    #[serde(alias = "in_production")]
    InProgress,
    Completed,
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Planned => "planned",
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Completed => "completed",
            BatchStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(BatchStatus::Planned),
            "in_progress" | "in_production" => Ok(BatchStatus::InProgress),
            "completed" => Ok(BatchStatus::Completed),
            "cancelled" => Ok(BatchStatus::Cancelled),
            other => Err(format!("unknown batch status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionBatch {
    pub id: Uuid,

    /// Human-readable batch number, e.g. "BATCH-2024-001"
    pub batch_number: String,

    pub product_id: Option<Uuid>,

    pub status: BatchStatus,

    #[serde(default)]
    pub planned_quantity: f64,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// NOTIFICATION
// =============================================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
    Dismissed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Unread => "unread",
            NotificationStatus::Read => "read",
            NotificationStatus::Dismissed => "dismissed",
        }
    }
}

impl FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(NotificationStatus::Unread),
            "read" => Ok(NotificationStatus::Read),
            "dismissed" => Ok(NotificationStatus::Dismissed),
            other => Err(format!("unknown notification status: {}", other)),
        }
    }
}

/// Extra data attached to a notification.
///
/// A present `activity_log_id` marks the record as an audit-trail event
/// rather than a user-facing alert. Keys this service does not read are kept
/// in `extra` so the record round-trips unchanged.
///
/// Built with [`RelatedData::from_value`], never strictly deserialized: the
/// column is free-form JSON written by several producers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelatedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_log_id: Option<Value>,

    /// Audit action name, e.g. "PURCHASE_ORDER_CREATE"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Audit action category, e.g. "MATERIAL", "CLIENT"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_category: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RelatedData {
    /// Read related data from raw JSON without ever failing.
    ///
    /// A non-object value yields `None`. A null `activity_log_id` counts as
    /// absent. A non-string `action`/`action_category` reads as absent and is
    /// kept in `extra` unchanged.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            return None;
        };

        let activity_log_id = map.remove("activity_log_id").filter(|v| !v.is_null());
        let action = take_string(&mut map, "action");
        let action_category = take_string(&mut map, "action_category");

        Some(Self {
            activity_log_id,
            action,
            action_category,
            extra: map,
        })
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            map.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

fn lenient_related_data<'de, D>(deserializer: D) -> Result<Option<RelatedData>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(RelatedData::from_value))
}

/// A notification or activity-log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub id: Uuid,

    /// Notification type, e.g. "order_alert", "low_stock"
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Owning module, e.g. "orders", "production", "materials"
    #[serde(default)]
    pub module: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub status: Option<NotificationStatus>,

    #[serde(default, deserialize_with = "lenient_related_data")]
    pub related_data: Option<RelatedData>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.status == Some(NotificationStatus::Unread)
    }

    /// True when the record carries `related_data.activity_log_id`.
    pub fn is_activity_log(&self) -> bool {
        self.related_data
            .as_ref()
            .map_or(false, |data| data.activity_log_id.is_some())
    }

    /// `related_data.action`, or "" when absent.
    pub fn action(&self) -> &str {
        self.related_data
            .as_ref()
            .and_then(|data| data.action.as_deref())
            .unwrap_or("")
    }

    /// `related_data.action_category`, or "" when absent.
    pub fn action_category(&self) -> &str {
        self.related_data
            .as_ref()
            .and_then(|data| data.action_category.as_deref())
            .unwrap_or("")
    }
}

// =============================================================================
// API RESPONSE STRUCTURES
// =============================================================================

/// A product together with its derived stock status
#[derive(Debug, Clone, Serialize)]
pub struct ProductStockView {
    #[serde(flatten)]
    pub product: Product,
    pub stock_status: ProductStatus,
}

/// A material together with its derived health band
#[derive(Debug, Clone, Serialize)]
pub struct MaterialHealthView {
    #[serde(flatten)]
    pub material: RawMaterial,
    pub health: MaterialHealth,
}

/// Product whose derived status is `low-stock` or `out-of-stock`
#[derive(Debug, Clone, Serialize)]
pub struct StockAlert {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub current_stock: f64,
    pub min_stock_level: f64,
    pub stock_status: ProductStatus,
}

/// A batch with the progress model for the stage the caller is viewing
#[derive(Debug, Clone, Serialize)]
pub struct BatchProgressResponse {
    pub batch: ProductionBatch,
    pub progress: StageProgress,
}

/// Categorized notifications plus the unread total across sections
#[derive(Debug, Clone, Serialize)]
pub struct SectionsResponse<C> {
    pub sections: Vec<Section<C>>,
    pub total_unread: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub total: usize,
    pub unread: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread: i64,

    /// Whether the value came from the Redis cache
    pub cached: bool,
}

// =============================================================================
// HEALTH CHECK RESPONSES
// =============================================================================

/// Simple health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Detailed readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub database: bool,
    pub redis: bool,
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_missing_numbers_default_to_zero() {
        let product: Product = serde_json::from_value(json!({ "name": "Widget" })).unwrap();

        assert_eq!(product.current_stock, 0.0);
        assert_eq!(product.min_stock_level, 0.0);
        assert_eq!(product.status, None);
    }

    #[test]
    fn test_product_status_tag_parsing() {
        let mut product: Product =
            serde_json::from_value(json!({ "status": "discontinued" })).unwrap();
        assert_eq!(product.status_tag(), Some(ProductStatus::Discontinued));

        product.status = Some("archived".to_string());
        assert_eq!(product.status_tag(), None);
    }

    #[test]
    fn test_product_status_serializes_kebab_case() {
        let value = serde_json::to_value(ProductStatus::OutOfStock).unwrap();
        assert_eq!(value, json!("out-of-stock"));

        for status in ProductStatus::ALL {
            assert_eq!(status.as_str().parse::<ProductStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_batch_status_accepts_both_in_progress_spellings() {
        let a: BatchStatus = serde_json::from_value(json!("in_production")).unwrap();
        let b: BatchStatus = serde_json::from_value(json!("in_progress")).unwrap();

        assert_eq!(a, BatchStatus::InProgress);
        assert_eq!(b, BatchStatus::InProgress);
        assert_eq!("in_production".parse::<BatchStatus>(), Ok(BatchStatus::InProgress));
    }

    #[test]
    fn test_notification_type_field_and_activity_detection() {
        let notification: Notification = serde_json::from_value(json!({
            "type": "system",
            "module": "materials",
            "status": "unread",
            "related_data": {
                "activity_log_id": 42,
                "action": "MATERIAL_UPDATE",
                "changed_by": "alice"
            }
        }))
        .unwrap();

        assert_eq!(notification.kind, "system");
        assert!(notification.is_unread());
        assert!(notification.is_activity_log());
        assert_eq!(notification.action(), "MATERIAL_UPDATE");
        assert_eq!(notification.action_category(), "");

        let related = notification.related_data.as_ref().unwrap();
        assert_eq!(related.extra.get("changed_by"), Some(&json!("alice")));
    }

    #[test]
    fn test_non_string_action_reads_as_absent() {
        let related =
            RelatedData::from_value(json!({ "activity_log_id": 1, "action": 42 })).unwrap();

        assert_eq!(related.activity_log_id, Some(json!(1)));
        assert_eq!(related.action, None);
        assert_eq!(related.action_category, None);
        assert_eq!(related.extra.get("action"), Some(&json!(42)));
    }

    #[test]
    fn test_non_object_related_data_is_dropped() {
        assert_eq!(RelatedData::from_value(json!("legacy-string")), None);
        assert_eq!(RelatedData::from_value(json!([1, 2])), None);

        let notification: Notification = serde_json::from_value(json!({
            "type": "order_alert",
            "related_data": "legacy-string"
        }))
        .unwrap();

        assert_eq!(notification.related_data, None);
        assert!(!notification.is_activity_log());
    }

    #[test]
    fn test_malformed_related_data_still_deserializes() {
        let notification: Notification = serde_json::from_value(json!({
            "type": "activity",
            "related_data": { "activity_log_id": 7, "action": 42, "action_category": false }
        }))
        .unwrap();

        assert!(notification.is_activity_log());
        assert_eq!(notification.action(), "");
        assert_eq!(notification.action_category(), "");
    }

    #[test]
    fn test_null_activity_log_id_is_not_an_activity_log() {
        let notification: Notification = serde_json::from_value(json!({
            "type": "low_stock",
            "related_data": { "activity_log_id": null }
        }))
        .unwrap();

        assert!(!notification.is_activity_log());
        assert!(!notification.is_unread());
    }
}
