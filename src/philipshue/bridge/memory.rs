//! An in-memory bridge for tests.
//!
//! Responses are registered per method and path. Unregistered GETs fail the way the real
//! bridge does (`resource, /x, not available`); unregistered writes succeed and echo their
//! body as `success` entries. Every request is recorded.
//!
//! Clones share state, so a test can keep one handle while the session under test owns
//! another.

use super::{BridgeError, Connector, Method, Transport};
use crate::config::Credentials;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: Vec<String>,
    pub body: Option<Value>,
}

impl RecordedRequest {
    pub fn path_string(&self) -> String {
        self.path.join("/")
    }
}

#[derive(Debug, Default)]
struct State {
    responses: HashMap<(Method, String), Result<Value, BridgeError>>,
    discovery: Option<Result<Value, BridgeError>>,
    registrations: VecDeque<Result<String, BridgeError>>,
    registered: Vec<(String, String)>,
    requests: Vec<RecordedRequest>,
    connected: Option<Credentials>,
    offline: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBridge {
    state: Rc<RefCell<State>>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `value` for `method` on `path` (segments joined by `/`).
    pub fn with_response(self, method: Method, path: &str, value: Value) -> Self {
        self.state
            .borrow_mut()
            .responses
            .insert((method, path.to_string()), Ok(value));
        self
    }

    /// Makes `method` on `path` fail with `error`.
    pub fn with_error(self, method: Method, path: &str, error: BridgeError) -> Self {
        self.state
            .borrow_mut()
            .responses
            .insert((method, path.to_string()), Err(error));
        self
    }

    pub fn with_discovery(self, result: Result<Value, BridgeError>) -> Self {
        self.state.borrow_mut().discovery = Some(result);
        self
    }

    /// Queues the outcome of the next registration attempt.
    pub fn queue_registration(self, result: Result<String, BridgeError>) -> Self {
        self.state.borrow_mut().registrations.push_back(result);
        self
    }

    /// From now on every request fails with a connection error.
    pub fn go_offline(&self) {
        self.state.borrow_mut().offline = true;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.borrow().requests.len()
    }

    /// `(address, devicetype)` of every registration attempt.
    pub fn registrations(&self) -> Vec<(String, String)> {
        self.state.borrow().registered.clone()
    }

    /// Credentials of the most recent [`Connector::connect`] call.
    pub fn connected(&self) -> Option<Credentials> {
        self.state.borrow().connected.clone()
    }

    fn offline_error() -> BridgeError {
        BridgeError::Connection("connection refused".to_string())
    }
}

impl Transport for MemoryBridge {
    fn request(
        &self,
        method: Method,
        path: &[String],
        body: Option<&Value>,
    ) -> Result<Value, BridgeError> {
        let mut state = self.state.borrow_mut();
        state.requests.push(RecordedRequest {
            method,
            path: path.to_vec(),
            body: body.cloned(),
        });
        if state.offline {
            return Err(Self::offline_error());
        }

        let key = path.join("/");
        if let Some(result) = state.responses.get(&(method, key.clone())) {
            return result.clone();
        }
        match method {
            Method::Get => Err(BridgeError::remote(
                Some(3),
                format!("resource, /{key}, not available"),
            )),
            Method::Delete => Ok(json!([{ "success": format!("/{key} deleted") }])),
            Method::Put | Method::Post => {
                let entries = body
                    .and_then(Value::as_object)
                    .map(|fields| {
                        fields
                            .iter()
                            .map(|(field, value)| {
                                json!({ "success": { format!("/{key}/{field}"): value } })
                            })
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                Ok(Value::Array(entries))
            }
        }
    }
}

impl Connector for MemoryBridge {
    type Transport = MemoryBridge;

    fn discover(&self) -> Result<Value, BridgeError> {
        let state = self.state.borrow();
        if state.offline {
            return Err(Self::offline_error());
        }
        state.discovery.clone().unwrap_or_else(|| Ok(json!([])))
    }

    fn register(&self, address: &str, devicetype: &str) -> Result<String, BridgeError> {
        let mut state = self.state.borrow_mut();
        state
            .registered
            .push((address.to_string(), devicetype.to_string()));
        if state.offline {
            return Err(Self::offline_error());
        }
        state
            .registrations
            .pop_front()
            .unwrap_or_else(|| Err(BridgeError::remote(Some(101), "link button not pressed")))
    }

    fn connect(&self, credentials: &Credentials) -> MemoryBridge {
        self.state.borrow_mut().connected = Some(credentials.clone());
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_registered_responses_and_recording() {
        let bridge = MemoryBridge::new().with_response(
            Method::Get,
            "lights",
            json!({"1": {"name": "Lamp"}}),
        );
        let value = bridge.request(Method::Get, &path(&["lights"]), None).unwrap();
        assert_eq!(value["1"]["name"], "Lamp");

        let requests = bridge.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Get);
        assert_eq!(requests[0].path_string(), "lights");
    }

    #[test]
    fn test_unknown_get_is_remote_error() {
        let bridge = MemoryBridge::new();
        let err = bridge
            .request(Method::Get, &path(&["nothing"]), None)
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::remote(Some(3), "resource, /nothing, not available")
        );
    }

    #[test]
    fn test_writes_echo_success() {
        let bridge = MemoryBridge::new();
        let body = json!({"on": true});
        let value = bridge
            .request(Method::Put, &path(&["lights", "1", "state"]), Some(&body))
            .unwrap();
        assert_eq!(value, json!([{"success": {"/lights/1/state/on": true}}]));
    }

    #[test]
    fn test_offline_fails_every_request() {
        let bridge = MemoryBridge::new().with_response(Method::Get, "lights", json!({}));
        bridge.go_offline();
        assert!(matches!(
            bridge.request(Method::Get, &path(&["lights"]), None),
            Err(BridgeError::Connection(_))
        ));
        assert!(bridge.discover().is_err());
    }

    #[test]
    fn test_registration_queue() {
        let bridge = MemoryBridge::new().queue_registration(Ok("abc123".to_string()));
        assert_eq!(bridge.register("10.0.0.1", "philipshue#test"), Ok("abc123".to_string()));
        assert_eq!(
            bridge.register("10.0.0.1", "philipshue#test"),
            Err(BridgeError::remote(Some(101), "link button not pressed"))
        );
        assert_eq!(bridge.registrations().len(), 2);
    }

    #[test]
    fn test_connect_shares_state() {
        let bridge = MemoryBridge::new();
        let transport = bridge.connect(&Credentials::new("10.0.0.1", "u"));
        let _ = transport.request(Method::Get, &path(&["config"]), None);
        assert_eq!(bridge.request_count(), 1);
        assert_eq!(bridge.connected(), Some(Credentials::new("10.0.0.1", "u")));
    }
}
