use super::{
    check_response, registration_body, username_from_registration, BridgeError, Connector,
    Method, Transport,
};
use crate::config::Credentials;
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::error::Error as _;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DISCOVERY_URL: &str = "https://discovery.meethue.com/";

/// Talks to real bridges over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: Client,
    discovery_url: String,
}

impl HttpConnector {
    pub fn new() -> Result<Self, BridgeError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Applies to each request as a whole, body included.
    pub fn with_timeout(timeout: Duration) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(connection_error)?;
        Ok(Self {
            client,
            discovery_url: DISCOVERY_URL.to_string(),
        })
    }

    pub fn with_discovery_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_url = url.into();
        self
    }
}

impl Connector for HttpConnector {
    type Transport = HttpTransport;

    fn discover(&self) -> Result<Value, BridgeError> {
        send(&self.client, Method::Get, &self.discovery_url, None)
    }

    fn register(&self, address: &str, devicetype: &str) -> Result<String, BridgeError> {
        let body = registration_body(devicetype);
        let response = send(&self.client, Method::Post, &api_root(address), Some(&body))?;
        username_from_registration(&check_response(response)?)
    }

    fn connect(&self, credentials: &Credentials) -> HttpTransport {
        HttpTransport {
            client: self.client.clone(),
            base_url: format!(
                "{}/{}",
                api_root(&credentials.bridge_location),
                credentials.bridge_username
            ),
        }
    }
}

/// A bridge session rooted at `http://<address>/api/<username>`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Each segment is percent-encoded, so `/`, `?` and `#` inside a segment stay in it.
    fn url_for(&self, path: &[String]) -> Result<Url, BridgeError> {
        let base = &self.base_url;
        let invalid = |detail: &str| {
            BridgeError::Connection(format!("invalid bridge URL {base}: {detail}"))
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(&e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot hold a path"))?
            .extend(path);
        Ok(url)
    }
}

impl Transport for HttpTransport {
    fn request(
        &self,
        method: Method,
        path: &[String],
        body: Option<&Value>,
    ) -> Result<Value, BridgeError> {
        let url = self.url_for(path)?;
        send(&self.client, method, url.as_str(), body).and_then(check_response)
    }
}

/// `192.168.1.10` becomes `http://192.168.1.10/api`; explicit schemes are kept.
fn api_root(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.contains("://") {
        format!("{address}/api")
    } else {
        format!("http://{address}/api")
    }
}

fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<&Value>,
) -> Result<Value, BridgeError> {
    debug!(%method, url, "bridge request");
    let verb = match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    };
    let mut request = client.request(verb, url);
    if let Some(body) = body {
        request = request.json(body);
    }
    let response = request.send().map_err(connection_error)?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(BridgeError::remote(
            Some(u64::from(status.as_u16())),
            format!("Received response {} from {}", status.as_u16(), url),
        ));
    }
    // A body cut short by a dropped connection or a timeout is a transport failure; only a
    // body that arrived whole and does not parse is the bridge's fault.
    let bytes = response.bytes().map_err(connection_error)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| BridgeError::remote(None, format!("invalid JSON from {url}: {e}")))
}

/// Flattens a reqwest error and its sources into one message.
fn connection_error(err: reqwest::Error) -> BridgeError {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    BridgeError::Connection(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_api_root() {
        assert_eq!(api_root("192.168.1.10"), "http://192.168.1.10/api");
        assert_eq!(api_root(" 10.0.0.2/ "), "http://10.0.0.2/api");
        assert_eq!(api_root("https://bridge.local"), "https://bridge.local/api");
    }

    #[test]
    fn test_transport_urls() {
        let connector = HttpConnector::new().unwrap();
        let transport = connector.connect(&Credentials::new("10.0.0.2", "user"));
        assert_eq!(transport.base_url(), "http://10.0.0.2/api/user");
        assert_eq!(
            transport
                .url_for(&["lights".to_string(), "1".to_string()])
                .unwrap()
                .as_str(),
            "http://10.0.0.2/api/user/lights/1"
        );
    }

    #[test]
    fn test_segments_are_percent_encoded() {
        let connector = HttpConnector::new().unwrap();
        let transport = connector.connect(&Credentials::new("10.0.0.2", "user"));
        let path = ["lights", "x/y", "a?b", "c#d"].map(String::from);
        assert_eq!(
            transport.url_for(&path).unwrap().as_str(),
            "http://10.0.0.2/api/user/lights/x%2Fy/a%3Fb/c%23d"
        );
    }

    /// Accepts one connection, reads the request head, writes `response` and then holds the
    /// socket open for `linger` before closing it.
    fn serve_once(response: &'static str, linger: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            thread::sleep(linger);
        });
        address
    }

    fn get_lights(address: &str, timeout: Duration) -> Result<Value, BridgeError> {
        let connector = HttpConnector::with_timeout(timeout).unwrap();
        connector
            .connect(&Credentials::new(address, "user"))
            .request(Method::Get, &["lights".to_string()], None)
    }

    #[test]
    fn test_truncated_body_is_connection_error() {
        let address = serve_once(
            concat!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n",
                "Content-Length: 500\r\n\r\n{\"1\": ",
            ),
            Duration::ZERO,
        );
        let err = get_lights(&address, DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, BridgeError::Connection(_)), "{err:?}");
    }

    #[test]
    fn test_stalled_body_is_connection_error() {
        let address = serve_once(
            concat!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n",
                "Content-Length: 500\r\n\r\n{",
            ),
            Duration::from_secs(3),
        );
        let err = get_lights(&address, Duration::from_millis(300)).unwrap_err();
        assert!(matches!(err, BridgeError::Connection(_)), "{err:?}");
    }

    #[test]
    fn test_complete_non_json_body_is_remote_error() {
        let address = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 8\r\nConnection: close\r\n\r\nnot json",
            Duration::ZERO,
        );
        let err = get_lights(&address, DEFAULT_TIMEOUT).unwrap_err();
        let BridgeError::Remote { code, message } = err else {
            panic!("expected a remote error, got {err:?}");
        };
        assert_eq!(code, None);
        assert!(message.starts_with("invalid JSON from "), "{message}");
    }

    #[test]
    fn test_unreachable_bridge_is_connection_error() {
        let connector = HttpConnector::new().unwrap();
        // Port 1 on loopback refuses connections immediately.
        let transport = connector.connect(&Credentials::new("127.0.0.1:1", "user"));
        let err = transport
            .request(Method::Get, &["lights".to_string()], None)
            .unwrap_err();
        assert!(matches!(err, BridgeError::Connection(_)), "{err:?}");
    }
}
