//! # Waypoint
//!
//! A path-matching request router for API-gateway style events.
//!
//! ## Features
//!
//! - Segment trie per method with `{name}` wildcards, literal segments first
//! - Route groups with a shared base path and their own pre-handlers
//! - Ordered handler chains sharing one per-request context, with abort
//! - Central not-found hook
//! - Two context flavors: [`RestContext`] with parameter and body helpers,
//!   [`HttpContext`] with the raw request and response records
//!
//! ## Quick Start
//!
//! ```rust
//! use waypoint::{ApiRequest, Context};
//!
//! let mut router = waypoint::rest();
//!
//! router.pre(|c| c.set("greeting", "moin".to_string()));
//! router.get("/hello/{name}", |c| {
//!     let greeting = c.get::<String>("greeting").cloned().unwrap_or_default();
//!     let name = c.param("name").unwrap_or("stranger").to_string();
//!     c.text(200, format!("{} {}", greeting, name));
//! });
//!
//! let request = ApiRequest::new("GET", "/hello/jott").with_path_param("name", "jott");
//! let response = router.handle(request).unwrap();
//! assert_eq!(response.body, "moin jott");
//! ```
//!
//! ## Groups
//!
//! ```rust
//! use waypoint::{ApiRequest, Context};
//!
//! let mut router = waypoint::rest();
//! let mut admin = router.group("/admin");
//! admin.pre(|c| {
//!     if c.header("Authorization").is_none() {
//!         c.text(401, "unauthorized");
//!         c.abort();
//!     }
//! });
//! admin.get("/stats", |c| c.json(200, &waypoint::json!({ "users": 3 })));
//!
//! let response = router.handle(ApiRequest::new("GET", "/admin/stats")).unwrap();
//! assert_eq!(response.status_code, 401);
//! ```

pub mod context;
pub mod error;
pub mod handler;
pub mod http;
pub mod router;
pub mod server;
pub extern crate serde_json;

// Reexport serde_json
pub use serde_json::{json, Value};

pub use context::{Attributes, Context, HttpContext, RestContext};
pub use error::{RouteError, RouteMiss};
pub use handler::{Chain, Handler};
pub use http::{ApiRequest, ApiResponse, Method};
pub use router::{Group, HttpRouter, RestRouter, Router};
pub use server::{Server, ServerConfig};

/// A router whose handlers receive a [`RestContext`].
pub fn rest() -> RestRouter {
    Router::new()
}

/// A router whose handlers receive a [`HttpContext`].
pub fn http() -> HttpRouter {
    Router::new()
}
