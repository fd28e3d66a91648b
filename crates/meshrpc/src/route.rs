//! # Routes
//!
//! A route names a remote procedure: `service.method` or `serverType.service.method`.
//!
//! ## Grammar
//!
//! - Segments are ASCII, separated by `.`, and none of them may be empty or blank.
//! - Two segments leave the server type empty, meaning "whatever role the target plays".
//! - Three segments name the server type explicitly.
//! - Any other segment count is rejected.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Errors produced while parsing a route string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// The string does not have 2 or 3 non-blank, ASCII, dot-separated segments.
    #[error("invalid route: '{0}'")]
    InvalidRoute(String),
}

pub type Result<T> = std::result::Result<T, RouteError>;

/// A parsed, immutable route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    server_type: String,
    service: String,
    method: String,
}

impl Route {
    /// Builds a route from parts, with the same segment rules as [`Route::parse`].
    ///
    /// `server_type` may be empty; `service` and `method` may not.
    pub fn new(
        server_type: impl Into<String>,
        service: impl Into<String>,
        method: impl Into<String>,
    ) -> Result<Self> {
        let route = Self {
            server_type: server_type.into(),
            service: service.into(),
            method: method.into(),
        };
        let server_type_ok = route.server_type.is_empty() || is_segment(&route.server_type);
        if !server_type_ok || !is_segment(&route.service) || !is_segment(&route.method) {
            return Err(RouteError::InvalidRoute(route.to_string()));
        }
        Ok(route)
    }

    /// Parses a dotted route string.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || RouteError::InvalidRoute(s.to_string());

        let parts: Vec<&str> = s.split('.').collect();
        if !parts.iter().copied().all(is_segment) {
            return Err(invalid());
        }

        match parts.as_slice() {
            [service, method] => Ok(Self {
                server_type: String::new(),
                service: service.to_string(),
                method: method.to_string(),
            }),
            [server_type, service, method] => Ok(Self {
                server_type: server_type.to_string(),
                service: service.to_string(),
                method: method.to_string(),
            }),
            _ => Err(invalid()),
        }
    }

    /// The server type, or `""` when the route did not name one.
    pub fn server_type(&self) -> &str {
        &self.server_type
    }

    /// Returns the server type only if the route names one.
    pub fn explicit_server_type(&self) -> Option<&str> {
        (!self.server_type.is_empty()).then_some(self.server_type.as_str())
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The `service.method` form used as the local handler key.
    pub fn short(&self) -> String {
        format!("{}.{}", self.service, self.method)
    }
}

/// A usable segment is ASCII, contains no `.` and is not blank.
fn is_segment(s: &str) -> bool {
    s.is_ascii() && !s.contains('.') && !s.trim().is_empty()
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.server_type.is_empty() {
            write!(f, "{}.{}", self.service, self.method)
        } else {
            write!(f, "{}.{}.{}", self.server_type, self.service, self.method)
        }
    }
}

impl std::str::FromStr for Route {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
