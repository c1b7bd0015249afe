// =============================================================================
// HANDLERS MODULE
// =============================================================================
// HTTP request handlers.
//
// Each classification handler follows the same shape:
//   1. load a snapshot from PostgreSQL
//   2. narrow it to what the viewer may see (notifications only)
//   3. run the pure classifier from `crate::classify`
//   4. record metrics and return JSON
// =============================================================================

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::classify::{
    self, categorize_activity_logs, categorize_notifications, resolve_material_health,
    resolve_stage_progress, resolve_stock_status, ActivityCategory, BatchStage,
    NotificationCategory, StageProgress,
};
use crate::context::ViewerContext;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::*;
use crate::AppState;

// =============================================================================
// HEALTH CHECK ENDPOINTS
// =============================================================================

/// Liveness check
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check: database and Redis must both answer.
///
/// GET /ready
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadinessResponse>, StatusCode> {
    let db_healthy = state.db.health_check().await;

    let redis_healthy = redis::cmd("PING")
        .query_async::<_, String>(&mut state.redis.clone())
        .await
        .is_ok();

    let all_healthy = db_healthy && redis_healthy;
    let status = if all_healthy { "ready" } else { "not_ready" };

    let response = ReadinessResponse {
        status: status.to_string(),
        checks: ReadinessChecks {
            database: db_healthy,
            redis: redis_healthy,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}

// -----------------------------------------------------------------------------
// PATH HELPERS
// -----------------------------------------------------------------------------

fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid id: {}", raw)))
}

fn parse_stage(raw: &str) -> AppResult<BatchStage> {
    raw.parse().map_err(AppError::BadRequest)
}

// =============================================================================
// PRODUCT ENDPOINTS
// =============================================================================

/// All products with their derived stock status
///
/// GET /api/v1/products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<ProductStockView>>> {
    let start = Instant::now();

    let products = state.db.list_products().await?;
    metrics::record_db_query("select", start.elapsed().as_secs_f64());

    let views: Vec<ProductStockView> = products
        .into_iter()
        .map(|product| ProductStockView {
            stock_status: resolve_stock_status(&product),
            product,
        })
        .collect();

    let statuses: Vec<ProductStatus> = views.iter().map(|v| v.stock_status).collect();
    metrics::set_stock_status_counts(&statuses);
    metrics::record_classifications("stock", views.len());

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/products", 200, duration);

    Ok(Json(views))
}

/// One product with its derived stock status
///
/// GET /api/v1/products/:id
///
/// - 400 Bad Request: id is not a UUID
/// - 404 Not Found: no such product
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ProductStockView>> {
    let start = Instant::now();
    let id = parse_id(&id)?;

    let product = state.db.get_product(id).await?;
    metrics::record_db_query("select", start.elapsed().as_secs_f64());
    let product =
        product.ok_or_else(|| AppError::NotFound(format!("Product not found: {}", id)))?;

    metrics::record_classifications("stock", 1);
    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/products/:id", 200, duration);

    Ok(Json(ProductStockView {
        stock_status: resolve_stock_status(&product),
        product,
    }))
}

/// Products whose derived status is low-stock or out-of-stock, most urgent
/// (lowest stock) first.
///
/// GET /api/v1/products/alerts
pub async fn product_alerts(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<StockAlert>>> {
    let start = Instant::now();

    let products = state.db.list_products().await?;
    metrics::record_db_query("select", start.elapsed().as_secs_f64());

    let mut alerts: Vec<StockAlert> = products
        .into_iter()
        .filter_map(|product| {
            let stock_status = resolve_stock_status(&product);
            classify::stock::needs_restock(stock_status).then(|| StockAlert {
                id: product.id,
                sku: product.sku,
                name: product.name,
                current_stock: product.current_stock,
                min_stock_level: product.min_stock_level,
                stock_status,
            })
        })
        .collect();
    alerts.sort_by(|a, b| a.current_stock.total_cmp(&b.current_stock));

    tracing::debug!(alerts = alerts.len(), "Computed stock alerts");

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/products/alerts", 200, duration);

    Ok(Json(alerts))
}

// =============================================================================
// MATERIAL ENDPOINTS
// =============================================================================

/// All raw materials with their health band
///
/// GET /api/v1/materials
pub async fn list_materials(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<MaterialHealthView>>> {
    let start = Instant::now();

    let materials = state.db.list_materials().await?;
    metrics::record_db_query("select", start.elapsed().as_secs_f64());

    let views: Vec<MaterialHealthView> = materials
        .into_iter()
        .map(|material| MaterialHealthView {
            health: resolve_material_health(&material),
            material,
        })
        .collect();

    let severities: Vec<_> = views.iter().map(|v| v.health.severity).collect();
    metrics::set_material_health_counts(&severities);
    metrics::record_classifications("material", views.len());

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/materials", 200, duration);

    Ok(Json(views))
}

// =============================================================================
// PRODUCTION ENDPOINTS
// =============================================================================

/// GET /api/v1/production/batches
pub async fn list_batches(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<ProductionBatch>>> {
    let start = Instant::now();

    let batches = state.db.list_batches().await?;

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/production/batches", 200, duration);
    metrics::record_db_query("select", duration);

    Ok(Json(batches))
}

#[derive(Debug, Deserialize)]
pub struct StageParams {
    /// Stage the caller is viewing (default: planning)
    pub stage: Option<String>,
}

/// Progress model for a batch at the stage the caller is viewing.
///
/// The stage is not stored on the batch; the caller passes it.
///
/// GET /api/v1/production/batches/:id/progress?stage=machine
pub async fn batch_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<StageParams>,
) -> AppResult<Json<BatchProgressResponse>> {
    let start = Instant::now();
    let id = parse_id(&id)?;
    let stage = match params.stage.as_deref() {
        Some(raw) => parse_stage(raw)?,
        None => BatchStage::default(),
    };

    let batch = state
        .db
        .get_batch(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Production batch not found: {}", id)))?;

    tracing::debug!(
        batch = %batch.batch_number,
        status = batch.status.as_str(),
        stage = %stage,
        "Resolving batch progress"
    );

    let progress = resolve_stage_progress(stage);
    metrics::record_classifications("stage", 1);

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/production/batches/:id/progress", 200, duration);

    Ok(Json(BatchProgressResponse { batch, progress }))
}

/// GET /api/v1/production/stages/:stage
pub async fn stage_progress(Path(stage): Path<String>) -> AppResult<Json<StageProgress>> {
    let start = Instant::now();
    let stage = parse_stage(&stage)?;

    let progress = resolve_stage_progress(stage);
    metrics::record_classifications("stage", 1);

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/production/stages/:stage", 200, duration);

    Ok(Json(progress))
}

// =============================================================================
// NOTIFICATION ENDPOINTS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct NotificationParams {
    #[serde(default)]
    pub include_dismissed: bool,
}

/// Load the notification snapshot and narrow it to the viewer
async fn visible_notifications(
    state: &AppState,
    viewer: &ViewerContext,
    include_dismissed: bool,
) -> AppResult<Vec<Notification>> {
    let start = Instant::now();
    let all = state.db.list_notifications(include_dismissed).await?;
    metrics::record_db_query("select", start.elapsed().as_secs_f64());

    Ok(viewer.visible(&all))
}

/// Flat notification list for the viewer
///
/// GET /api/v1/notifications?include_dismissed=true
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<NotificationParams>,
) -> AppResult<Json<NotificationListResponse>> {
    let start = Instant::now();
    let viewer = ViewerContext::from_headers(&headers);

    let notifications = visible_notifications(&state, &viewer, params.include_dismissed).await?;
    let unread = notifications.iter().filter(|n| n.is_unread()).count();

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/notifications", 200, duration);

    Ok(Json(NotificationListResponse {
        total: notifications.len(),
        unread,
        notifications,
    }))
}

/// Notification drawer sections in fixed order
///
/// GET /api/v1/notifications/sections
pub async fn notification_sections(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<SectionsResponse<NotificationCategory>>> {
    let start = Instant::now();
    let viewer = ViewerContext::from_headers(&headers);

    let notifications = visible_notifications(&state, &viewer, false).await?;
    let sections = categorize_notifications(&notifications);
    metrics::record_classifications("notifications", notifications.len());

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/notifications/sections", 200, duration);

    Ok(Json(SectionsResponse {
        total_unread: classify::total_unread(&sections),
        sections,
    }))
}

/// Activity-log sections, busiest first
///
/// GET /api/v1/notifications/activity
pub async fn activity_sections(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<SectionsResponse<ActivityCategory>>> {
    let start = Instant::now();
    let viewer = ViewerContext::from_headers(&headers);

    let logs: Vec<Notification> = visible_notifications(&state, &viewer, false)
        .await?
        .into_iter()
        .filter(Notification::is_activity_log)
        .collect();

    let sections = categorize_activity_logs(&logs);
    metrics::record_classifications("activity", logs.len());

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/notifications/activity", 200, duration);

    Ok(Json(SectionsResponse {
        total_unread: classify::total_unread(&sections),
        sections,
    }))
}

fn unread_cache_key(viewer: &ViewerContext) -> String {
    format!("notifications:unread:{}", viewer.cache_key())
}

/// Unread count for the viewer, cached in Redis.
///
/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<UnreadCountResponse>> {
    let start = Instant::now();
    let viewer = ViewerContext::from_headers(&headers);
    let cache_key = unread_cache_key(&viewer);

    let cached: Option<i64> = redis::cmd("GET")
        .arg(&cache_key)
        .query_async(&mut state.redis.clone())
        .await
        .ok()
        .flatten();
    metrics::record_redis_operation("get", start.elapsed().as_secs_f64());

    if let Some(unread) = cached {
        let duration = start.elapsed().as_secs_f64();
        metrics::record_http_request("GET", "/api/v1/notifications/unread-count", 200, duration);
        return Ok(Json(UnreadCountResponse { unread, cached: true }));
    }

    let modules: Option<Vec<String>> = match viewer.role {
        crate::context::ViewerRole::Admin => None,
        crate::context::ViewerRole::Staff => Some(viewer.modules.iter().cloned().collect()),
    };
    let db_start = Instant::now();
    let unread = state.db.count_unread(modules.as_deref()).await?;
    metrics::record_db_query("select", db_start.elapsed().as_secs_f64());

    if modules.is_none() {
        metrics::set_unread_notifications(unread);
    }

    // A failed cache write only costs a recount next time
    let set_result: Result<(), redis::RedisError> = redis::cmd("SETEX")
        .arg(&cache_key)
        .arg(state.unread_cache_ttl_secs)
        .arg(unread)
        .query_async(&mut state.redis.clone())
        .await;
    if let Err(e) = set_result {
        tracing::warn!(key = %cache_key, error = %e, "Failed to cache unread count");
    }

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("GET", "/api/v1/notifications/unread-count", 200, duration);

    Ok(Json(UnreadCountResponse {
        unread,
        cached: false,
    }))
}

fn not_found_notification(id: Uuid) -> AppError {
    AppError::NotFound(format!("Notification not found: {}", id))
}

/// A notification outside the viewer's modules reads as missing, so writes
/// cannot be used to discover ids in other modules.
fn ensure_visible(
    viewer: &ViewerContext,
    id: Uuid,
    notification: Option<&Notification>,
) -> AppResult<()> {
    match notification {
        Some(n) if viewer.can_view_module(&n.module) => Ok(()),
        _ => Err(not_found_notification(id)),
    }
}

async fn update_notification_status(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
    status: NotificationStatus,
    endpoint: &str,
) -> AppResult<Json<Notification>> {
    let start = Instant::now();
    let id = parse_id(raw_id)?;
    let viewer = ViewerContext::from_headers(headers);

    tracing::info!(id = %id, status = status.as_str(), "Updating notification status");

    let existing = state.db.get_notification(id).await?;
    metrics::record_db_query("select", start.elapsed().as_secs_f64());
    ensure_visible(&viewer, id, existing.as_ref())?;

    let update_start = Instant::now();
    let notification = state
        .db
        .set_notification_status(id, status)
        .await?
        .ok_or_else(|| not_found_notification(id))?;
    metrics::record_db_query("update", update_start.elapsed().as_secs_f64());

    // Other viewers' cached counts expire with their TTL
    let redis_start = Instant::now();
    let admin_key = unread_cache_key(&ViewerContext::admin());
    let viewer_key = unread_cache_key(&viewer);
    let del_result: Result<(), redis::RedisError> = redis::cmd("DEL")
        .arg(&admin_key)
        .arg(&viewer_key)
        .query_async(&mut state.redis.clone())
        .await;
    if let Err(e) = del_result {
        tracing::warn!(
            admin_key = %admin_key,
            viewer_key = %viewer_key,
            error = %e,
            "Failed to invalidate unread count cache"
        );
    }
    metrics::record_redis_operation("delete", redis_start.elapsed().as_secs_f64());

    let duration = start.elapsed().as_secs_f64();
    metrics::record_http_request("POST", endpoint, 200, duration);

    Ok(Json(notification))
}

/// POST /api/v1/notifications/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<Notification>> {
    update_notification_status(
        &state,
        &headers,
        &id,
        NotificationStatus::Read,
        "/api/v1/notifications/:id/read",
    )
    .await
}

/// POST /api/v1/notifications/:id/dismiss
pub async fn dismiss(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<Notification>> {
    update_notification_status(
        &state,
        &headers,
        &id,
        NotificationStatus::Dismissed,
        "/api/v1/notifications/:id/dismiss",
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::fixtures;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_id("not-a-uuid"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_parse_stage() {
        assert_eq!(parse_stage("individual").unwrap(), BatchStage::Individual);
        assert!(matches!(parse_stage("Machine"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_ensure_visible_hides_other_modules() {
        let id = Uuid::new_v4();
        let material = fixtures::notification("material_low", "materials", true);
        let order = fixtures::notification("order_alert", "orders", true);
        let staff = ViewerContext::staff(["orders"]);

        assert!(matches!(
            ensure_visible(&staff, id, Some(&material)),
            Err(AppError::NotFound(_))
        ));
        assert!(ensure_visible(&staff, id, Some(&order)).is_ok());
        assert!(ensure_visible(&ViewerContext::admin(), id, Some(&material)).is_ok());
    }

    #[test]
    fn test_ensure_visible_missing_is_not_found() {
        let id = Uuid::new_v4();

        assert!(matches!(
            ensure_visible(&ViewerContext::admin(), id, None),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_unread_cache_key_per_viewer() {
        assert_eq!(
            unread_cache_key(&ViewerContext::admin()),
            "notifications:unread:admin"
        );
        assert_eq!(
            unread_cache_key(&ViewerContext::staff(["orders"])),
            "notifications:unread:staff:orders"
        );
    }
}
