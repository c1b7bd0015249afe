// =============================================================================
// STOCK STATUS RESOLVER
// =============================================================================

use crate::models::{Product, ProductStatus};

/// Derive a product's stock status.
///
/// Rules, first match wins:
/// 1. stored status `inactive`/`discontinued` is returned unchanged
/// 2. `current_stock == 0` gives `out-of-stock`
/// 3. `current_stock < min_stock_level` gives `low-stock`
/// 4. otherwise `in-stock`
///
/// Any other stored status (including unknown strings) is ignored.
pub fn resolve_stock_status(product: &Product) -> ProductStatus {
    match product.status_tag() {
        Some(status @ (ProductStatus::Inactive | ProductStatus::Discontinued)) => status,
        _ if product.current_stock == 0.0 => ProductStatus::OutOfStock,
        _ if product.current_stock < product.min_stock_level => ProductStatus::LowStock,
        _ => ProductStatus::InStock,
    }
}

/// True for the statuses that warrant a stock alert.
pub fn needs_restock(status: ProductStatus) -> bool {
    matches!(status, ProductStatus::LowStock | ProductStatus::OutOfStock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn product(current_stock: f64, min_stock_level: f64, status: Option<&str>) -> Product {
        Product {
            id: Uuid::new_v4(),
            sku: "SKU-TEST".to_string(),
            name: "Test product".to_string(),
            current_stock,
            min_stock_level,
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn test_explicit_override_wins_over_stock() {
        assert_eq!(
            resolve_stock_status(&product(0.0, 10.0, Some("inactive"))),
            ProductStatus::Inactive
        );
        assert_eq!(
            resolve_stock_status(&product(500.0, 10.0, Some("discontinued"))),
            ProductStatus::Discontinued
        );
    }

    #[test]
    fn test_zero_stock_is_out_of_stock() {
        assert_eq!(resolve_stock_status(&product(0.0, 0.0, None)), ProductStatus::OutOfStock);
        assert_eq!(
            resolve_stock_status(&product(0.0, 5.0, Some("in-stock"))),
            ProductStatus::OutOfStock
        );
    }

    #[test]
    fn test_below_minimum_is_low_stock() {
        assert_eq!(
            resolve_stock_status(&product(4.0, 5.0, Some("active"))),
            ProductStatus::LowStock
        );
    }

    #[test]
    fn test_equal_to_minimum_is_in_stock() {
        assert_eq!(resolve_stock_status(&product(5.0, 5.0, None)), ProductStatus::InStock);
    }

    #[test]
    fn test_stale_stored_status_is_recomputed() {
        assert_eq!(
            resolve_stock_status(&product(50.0, 5.0, Some("out-of-stock"))),
            ProductStatus::InStock
        );
        assert_eq!(
            resolve_stock_status(&product(50.0, 5.0, Some("something-else"))),
            ProductStatus::InStock
        );
    }

    #[test]
    fn test_result_is_always_a_known_tag() {
        let statuses = [None, Some("inactive"), Some("discontinued"), Some("active"), Some("junk")];
        for status in statuses {
            for (stock, min) in [(0.0, 0.0), (1.0, 2.0), (2.0, 2.0), (9.0, 2.0)] {
                let resolved = resolve_stock_status(&product(stock, min, status));
                assert!(ProductStatus::ALL.contains(&resolved));
                if matches!(status, Some("inactive") | Some("discontinued")) {
                    assert_eq!(Some(resolved.as_str()), status);
                }
            }
        }
    }

    #[test]
    fn test_needs_restock() {
        assert!(needs_restock(ProductStatus::LowStock));
        assert!(needs_restock(ProductStatus::OutOfStock));
        assert!(!needs_restock(ProductStatus::InStock));
        assert!(!needs_restock(ProductStatus::Discontinued));
    }
}
