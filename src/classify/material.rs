// =============================================================================
// MATERIAL STOCK HEALTH RESOLVER
// =============================================================================
// Maps a raw material's stock against its three thresholds to a severity band
// used to colour-code the materials table.
// =============================================================================

use serde::Serialize;

use crate::models::RawMaterial;

/// Severity band for material stock health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Ok,
    Info,
    Neutral,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::Warning,
        Severity::Ok,
        Severity::Info,
        Severity::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Ok => "ok",
            Severity::Info => "info",
            Severity::Neutral => "neutral",
        }
    }

    /// Icon name shown next to the message
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Critical => "alert-octagon",
            Severity::Warning => "alert-triangle",
            Severity::Ok => "check-circle",
            Severity::Info => "trending-up",
            Severity::Neutral => "info",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Severity::Critical => "Out of stock — immediate action required",
            Severity::Warning => "Low stock — reorder soon",
            Severity::Ok => "Stock level is healthy",
            Severity::Info => "Overstock — above maximum capacity",
            Severity::Neutral => "Stock level is normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialHealth {
    pub icon: &'static str,
    pub message: &'static str,
    pub severity: Severity,
}

impl From<Severity> for MaterialHealth {
    fn from(severity: Severity) -> Self {
        Self {
            icon: severity.icon(),
            message: severity.message(),
            severity,
        }
    }
}

/// Derive the health band of a raw material.
///
/// First match wins:
/// 1. `current_stock == 0` is critical
/// 2. `current_stock < min_threshold` is warning
/// 3. `reorder_point <= current_stock < max_capacity` is ok
/// 4. `current_stock >= max_capacity` is info (overstock)
/// 5. anything else (between `min_threshold` and `reorder_point`) is neutral
pub fn resolve_material_health(material: &RawMaterial) -> MaterialHealth {
    let stock = material.current_stock;

    let severity = if stock == 0.0 {
        Severity::Critical
    } else if stock < material.min_threshold {
        Severity::Warning
    } else if stock >= material.reorder_point && stock < material.max_capacity {
        Severity::Ok
    } else if stock >= material.max_capacity {
        Severity::Info
    } else {
        Severity::Neutral
    };

    severity.into()
}
