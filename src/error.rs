use crate::http::ApiResponse;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route not found: {method} {path}")]
    NotFound { method: String, path: String },
    #[error("route path must not be empty")]
    EmptyPath,
    #[error("route method must not be empty")]
    EmptyMethod,
    #[error("path too long ({count} segments): {path}")]
    TooManySegments { path: String, count: usize },
}

impl RouteError {
    pub fn status_code(&self) -> u16 {
        match self {
            RouteError::NotFound { .. } => 404,
            RouteError::EmptyPath
            | RouteError::EmptyMethod
            | RouteError::TooManySegments { .. } => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RouteError::NotFound { .. })
    }
}

/// Returned by [`Router::handle`](crate::Router::handle) when no route
/// matched. The response is still usable: it is either what the installed
/// error handler produced or the default 404.
///
/// Displays as the wrapped [`RouteError`] and reports no further source.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RouteMiss {
    pub error: RouteError,
    pub response: ApiResponse,
}

impl RouteMiss {
    pub fn into_response(self) -> ApiResponse {
        self.response
    }
}

pub type RouteResult<T> = Result<T, RouteError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn miss_message_is_not_repeated_by_its_source() {
        let miss = RouteMiss {
            error: RouteError::NotFound {
                method: "GET".to_string(),
                path: "/nowhere".to_string(),
            },
            response: ApiResponse::not_found("route not found: GET /nowhere"),
        };

        assert_eq!(miss.to_string(), "route not found: GET /nowhere");
        assert!(miss.source().is_none());
        assert_eq!(miss.error.status_code(), 404);
    }

    #[test]
    fn configuration_errors_are_server_errors() {
        let err = RouteError::TooManySegments {
            path: "/a".to_string(),
            count: 256,
        };
        assert_eq!(err.to_string(), "path too long (256 segments): /a");
        assert_eq!(err.status_code(), 500);
        assert!(!err.is_not_found());
    }
}
