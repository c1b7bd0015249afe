// =============================================================================
// VIEWER CONTEXT
// =============================================================================
// Who is looking at the data, passed explicitly to whatever needs it.
//
// The gateway in front of this service authenticates the user and forwards
// two headers:
//   x-user-role:    "admin" | "staff"
//   x-user-modules: comma-separated module names, e.g. "orders,production"
//
// The classifiers never see this type. Handlers filter a snapshot with
// `ViewerContext::visible` first and hand the result to a classifier.
// =============================================================================

use std::collections::BTreeSet;

use axum::http::HeaderMap;

use crate::models::Notification;

pub const ROLE_HEADER: &str = "x-user-role";
pub const MODULES_HEADER: &str = "x-user-modules";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerRole {
    Admin,
    Staff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerContext {
    pub role: ViewerRole,
    pub modules: BTreeSet<String>,
}

impl ViewerContext {
    pub fn admin() -> Self {
        Self {
            role: ViewerRole::Admin,
            modules: BTreeSet::new(),
        }
    }

    pub fn staff<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role: ViewerRole::Staff,
            modules: modules.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the context from forwarded headers.
    ///
    /// No role header means the request did not pass through the gateway
    /// (local tools, health checks), which is treated as admin. Any role other
    /// than `admin` is staff.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let role = headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase());

        match role.as_deref() {
            None | Some("admin") => Self::admin(),
            Some(_) => {
                let modules = headers
                    .get(MODULES_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>();
                Self::staff(modules)
            }
        }
    }

    pub fn can_view_module(&self, module: &str) -> bool {
        match self.role {
            ViewerRole::Admin => true,
            // records without a module are global announcements
            ViewerRole::Staff => module.is_empty() || self.modules.contains(module),
        }
    }

    /// The records of `list` this viewer may see, in input order.
    pub fn visible(&self, list: &[Notification]) -> Vec<Notification> {
        list.iter()
            .filter(|n| self.can_view_module(&n.module))
            .cloned()
            .collect()
    }

    /// Stable key for per-viewer cache entries.
    pub fn cache_key(&self) -> String {
        match self.role {
            ViewerRole::Admin => "admin".to_string(),
            ViewerRole::Staff => {
                let modules: Vec<&str> = self.modules.iter().map(String::as_str).collect();
                format!("staff:{}", modules.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::fixtures::notification;
    use axum::http::HeaderValue;

    #[test]
    fn test_missing_headers_is_admin() {
        let ctx = ViewerContext::from_headers(&HeaderMap::new());
        assert_eq!(ctx, ViewerContext::admin());
        assert!(ctx.can_view_module("orders"));
    }

    #[test]
    fn test_staff_headers_are_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(ROLE_HEADER, HeaderValue::from_static("Staff"));
        headers.insert(MODULES_HEADER, HeaderValue::from_static(" orders, production ,,"));

        let ctx = ViewerContext::from_headers(&headers);

        assert_eq!(ctx.role, ViewerRole::Staff);
        assert!(ctx.can_view_module("orders"));
        assert!(ctx.can_view_module("production"));
        assert!(!ctx.can_view_module("materials"));
        assert!(ctx.can_view_module(""));
    }

    #[test]
    fn test_visible_filters_and_keeps_order() {
        let list = vec![
            notification("order_alert", "orders", true),
            notification("low_stock", "materials", true),
            notification("announcement", "", false),
        ];

        let ctx = ViewerContext::staff(["orders"]);
        let visible = ctx.visible(&list);

        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].id, list[0].id);
        assert_eq!(visible[1].id, list[2].id);
    }

    #[test]
    fn test_cache_key_is_stable_regardless_of_header_order() {
        let a = ViewerContext::staff(["production", "orders"]);
        let b = ViewerContext::staff(["orders", "production"]);

        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "staff:orders,production");
        assert_eq!(ViewerContext::admin().cache_key(), "admin");
    }
}
