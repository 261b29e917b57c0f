//! # Bridge Client
//!
//! The bridge exposes a REST resource tree under `/api/<username>/`: `lights`, `groups`,
//! `config`, `schedules`, `scenes`, `sensors`, `rules` and so on. This module is the seam
//! between the shell and that tree.
//!
//! - [`Transport`]: one request against an already paired bridge
//! - [`Connector`]: what happens before a session exists (discovery, pairing, connecting)
//!
//! Production code uses [`http::HttpConnector`]; tests use [`memory::MemoryBridge`], which
//! serves canned responses and records every request it receives.
//!
//! ## Error Model
//!
//! The bridge answers most failures with HTTP 200 and a JSON array of error entries:
//!
//! ```json
//! [{"error": {"type": 101, "address": "", "description": "link button not pressed"}}]
//! ```
//!
//! [`check_response`] turns those into [`BridgeError::Remote`]. Anything that prevents a
//! response from arriving at all is a [`BridgeError::Connection`].

pub mod http;
pub mod memory;

use crate::config::Credentials;
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

/// HTTP verbs the bridge understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    /// Parses a method name case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "get" => Some(Method::Get),
            "put" => Some(Method::Put),
            "post" => Some(Method::Post),
            "delete" => Some(Method::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(self, Method::Put | Method::Post)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// The bridge answered, but reported a failure.
    #[error("{message}")]
    Remote { code: Option<u64>, message: String },

    /// No usable answer arrived (refused, unreachable, timed out).
    #[error("{0}")]
    Connection(String),
}

impl BridgeError {
    pub fn remote(code: Option<u64>, message: impl Into<String>) -> Self {
        BridgeError::Remote {
            code,
            message: message.into(),
        }
    }
}

/// Performs requests against one paired bridge. Paths are relative to `/api/<username>`.
pub trait Transport {
    fn request(
        &self,
        method: Method,
        path: &[String],
        body: Option<&Value>,
    ) -> Result<Value, BridgeError>;
}

/// Everything needed before a [`Transport`] exists.
pub trait Connector {
    type Transport: Transport;

    /// Lists bridges on the local network, as reported by the discovery service.
    fn discover(&self) -> Result<Value, BridgeError>;

    /// Asks the bridge at `address` for a new username. The bridge only grants one shortly
    /// after its link button was pressed.
    fn register(&self, address: &str, devicetype: &str) -> Result<String, BridgeError>;

    fn connect(&self, credentials: &Credentials) -> Self::Transport;
}

/// Converts error entries in a bridge response into a [`BridgeError::Remote`].
///
/// Descriptions of multiple errors are joined by newlines; the code is the `type` of the
/// first one.
pub fn check_response(value: Value) -> Result<Value, BridgeError> {
    let Some(entries) = value.as_array() else {
        return Ok(value);
    };
    let errors: Vec<&Value> = entries.iter().filter_map(|e| e.get("error")).collect();
    if errors.is_empty() {
        return Ok(value);
    }
    let code = errors[0].get("type").and_then(Value::as_u64);
    let message = errors
        .iter()
        .map(|e| {
            e.get("description")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| e.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n");
    Err(BridgeError::Remote { code, message })
}

/// Extracts the username from a successful registration response
/// (`[{"success": {"username": "..."}}]`).
pub fn username_from_registration(value: &Value) -> Result<String, BridgeError> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .find_map(|entry| entry.pointer("/success/username").and_then(Value::as_str))
        .map(String::from)
        .ok_or_else(|| {
            BridgeError::remote(None, format!("unexpected registration response: {value}"))
        })
}

/// The body sent when registering: `{"devicetype": "philipshue#<host>"}`.
pub fn registration_body(devicetype: &str) -> Value {
    json!({ "devicetype": devicetype })
}

/// The application/device name to register under.
pub fn default_devicetype() -> String {
    let host = std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "localhost".to_string());
    format!("philipshue#{}", host.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_response_passes_plain_values() {
        let value = json!({"1": {"name": "Lamp"}});
        assert_eq!(check_response(value.clone()), Ok(value));

        let success = json!([{"success": {"/lights/1/state/on": true}}]);
        assert_eq!(check_response(success.clone()), Ok(success));
    }

    #[test]
    fn test_check_response_extracts_errors() {
        let value = json!([
            {"error": {"type": 7, "address": "/lights/1/state/bri", "description": "invalid value, 300, for parameter, bri"}},
            {"success": {"/lights/1/state/on": true}},
            {"error": {"type": 6, "address": "/lights/1/state/foo", "description": "parameter, foo, not available"}}
        ]);
        assert_eq!(
            check_response(value),
            Err(BridgeError::Remote {
                code: Some(7),
                message: "invalid value, 300, for parameter, bri\nparameter, foo, not available"
                    .to_string(),
            })
        );
    }

    #[test]
    fn test_username_from_registration() {
        let value = json!([{"success": {"username": "abc123"}}]);
        assert_eq!(username_from_registration(&value), Ok("abc123".to_string()));
        assert!(username_from_registration(&json!({"nope": 1})).is_err());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("DELETE"), Some(Method::Delete));
        assert_eq!(Method::parse("put"), Some(Method::Put));
        assert_eq!(Method::parse("patch"), None);
        assert!(Method::Post.has_body());
        assert!(!Method::Get.has_body());
    }

    #[test]
    fn test_devicetype_prefix() {
        assert!(default_devicetype().starts_with("philipshue#"));
    }
}
