//! HTTP client for the WebHDFS REST dialect.
//!
//! Every request is shaped
//! `scheme://host:port/webhdfs/v1<path>?[user.name=U&][delegation=T&]op=<OP>[&extra]`.
//! The `op` parameter selects behavior; the HTTP verb is fixed per op.

use reqwest::{Client, Method, Response, StatusCode};
use std::time::Duration;

use super::error::{classify, RemoteError};
use crate::config::HadoopConfig;

/// REST root under which every file path is addressed.
const API_ROOT: &str = "/webhdfs/v1";

/// HTTP client wrapper for WebHDFS communication.
///
/// Holds the base URL and the identity parameters appended to every request.
pub struct HdfsClient {
    client: Client,
    base_url: String,
    username: Option<String>,
    delegation: Option<String>,
}

impl HdfsClient {
    /// Create a new client for the configured NameNode.
    ///
    /// CREATE and APPEND answer with a 307 redirect to a DataNode; reqwest
    /// follows it and replays the (in-memory) request body.
    pub fn new(config: &HadoopConfig, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        let scheme = if config.ssl { "https" } else { "http" };
        Self {
            client,
            base_url: format!("{}://{}:{}{}", scheme, config.host, config.port, API_ROOT),
            username: config.username.clone().filter(|u| !u.is_empty()),
            delegation: config.delegation.clone().filter(|d| !d.is_empty()),
        }
    }

    /// Build the full request URL for `path` and `op` with extra parameters.
    pub fn url(&self, path: &str, op: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}{}?", self.base_url, encode_path(path));
        if let Some(ref user) = self.username {
            url.push_str(&format!("user.name={}&", urlencoding::encode(user)));
        }
        if let Some(ref token) = self.delegation {
            url.push_str(&format!("delegation={}&", urlencoding::encode(token)));
        }
        url.push_str("op=");
        url.push_str(op);
        for (name, value) in params {
            url.push_str(&format!("&{}={}", name, urlencoding::encode(value)));
        }
        url
    }

    /// Send one request and return the raw response, whatever its status.
    /// Only transport failures are reported as errors here.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        op: &str,
        params: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> Result<Response, RemoteError> {
        let url = self.url(path, op, params);
        log::trace!("{} {}", method, url);

        let mut builder = self.client.request(method, &url);
        if let Some(data) = body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(data);
        }

        Ok(builder.send().await?)
    }

    /// Send one request and return the response if its status matches
    /// `expected`; otherwise classify the error envelope.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        op: &str,
        params: &[(&str, String)],
        body: Option<Vec<u8>>,
        expected: StatusCode,
    ) -> Result<Response, RemoteError> {
        let resp = self.execute(method, path, op, params, body).await?;
        if resp.status() == expected {
            return Ok(resp);
        }
        Err(error_from_response(resp, op, path).await)
    }

    /// Send a request that answers `{"boolean": b}` and return `b`.
    pub async fn send_boolean(
        &self,
        method: Method,
        path: &str,
        op: &str,
        params: &[(&str, String)],
    ) -> Result<bool, RemoteError> {
        let resp = self
            .send(method, path, op, params, None, StatusCode::OK)
            .await?;
        let parsed: super::types::BooleanResponse = resp
            .json()
            .await
            .map_err(|e| RemoteError::Transport(format!("Failed to parse {} response: {}", op, e)))?;
        Ok(parsed.boolean)
    }
}

/// Consume a failed response and classify its error envelope.
pub async fn error_from_response(resp: Response, op: &str, path: &str) -> RemoteError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    log::debug!("{} {} failed ({}): {}", op, path, status, text);
    classify(op, status, &text)
}

/// Percent-encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Single-connection HTTP responder for exercising status handling.
#[cfg(test)]
pub(crate) mod test_server {
    use super::HdfsClient;
    use crate::config::HadoopConfig;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Bind 127.0.0.1:0, answer the first request with `status` and `body`,
    /// and return a client pointed at it plus a handle yielding the request
    /// line that was received.
    pub async fn respond_once(status: &str, body: &str) -> (HdfsClient, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request.lines().next().unwrap_or_default().to_string()
        });
        let config = HadoopConfig {
            ssl: false,
            host: "127.0.0.1".to_string(),
            port,
            username: Some("tester".to_string()),
            delegation: None,
        };
        (HdfsClient::new(&config, Duration::from_secs(5)), handle)
    }

    /// Read headers and any Content-Length body so the client never sees a
    /// reset while still writing.
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(username: Option<&str>, delegation: Option<&str>) -> HadoopConfig {
        HadoopConfig {
            ssl: false,
            host: "namenode".to_string(),
            port: 9870,
            username: username.map(str::to_string),
            delegation: delegation.map(str::to_string),
        }
    }

    #[test]
    fn test_url_with_username() {
        let client = HdfsClient::new(&config(Some("ming"), None), Duration::from_secs(5));
        assert_eq!(
            client.url("/a/b.txt", "GETFILESTATUS", &[]),
            "http://namenode:9870/webhdfs/v1/a/b.txt?user.name=ming&op=GETFILESTATUS"
        );
    }

    #[test]
    fn test_url_without_identity() {
        let client = HdfsClient::new(&config(None, None), Duration::from_secs(5));
        assert_eq!(
            client.url("/", "LISTSTATUS_BATCH", &[("startAfter", "x y".to_string())]),
            "http://namenode:9870/webhdfs/v1/?op=LISTSTATUS_BATCH&startAfter=x%20y"
        );
    }

    #[test]
    fn test_url_with_delegation_and_ssl() {
        let mut cfg = config(Some("ming"), Some("tok=="));
        cfg.ssl = true;
        let client = HdfsClient::new(&cfg, Duration::from_secs(5));
        assert_eq!(
            client.url("/d", "MKDIRS", &[("permission", "755".to_string())]),
            "https://namenode:9870/webhdfs/v1/d?user.name=ming&delegation=tok%3D%3D&op=MKDIRS&permission=755"
        );
    }

    #[test]
    fn test_empty_username_is_omitted() {
        let client = HdfsClient::new(&config(Some(""), None), Duration::from_secs(5));
        assert!(!client.url("/", "GETFILESTATUS", &[]).contains("user.name"));
    }

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(encode_path("/dir with space/f#1"), "/dir%20with%20space/f%231");
        assert_eq!(encode_path(""), "/");
    }

    // ── status handling ──

    #[tokio::test]
    async fn test_send_boolean_reports_false_verdict() {
        let (client, server) = test_server::respond_once("200 OK", r#"{"boolean":false}"#).await;
        let verdict = client
            .send_boolean(Method::PUT, "/d", "MKDIRS", &[])
            .await
            .unwrap();
        assert!(!verdict);
        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /webhdfs/v1/d?user.name=tester&op=MKDIRS"));
    }

    #[tokio::test]
    async fn test_send_classifies_error_envelope() {
        let body = r#"{"RemoteException":{"exception":"FileNotFoundException","javaClassName":"java.io.FileNotFoundException","message":"File does not exist: /gone"}}"#;
        let (client, _server) = test_server::respond_once("404 Not Found", body).await;
        let err = client
            .send(Method::GET, "/gone", "GETFILESTATUS", &[], None, StatusCode::OK)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound));
    }

    #[tokio::test]
    async fn test_send_unparseable_server_error_is_transport() {
        let (client, _server) =
            test_server::respond_once("500 Internal Server Error", "<html>proxy error</html>").await;
        let err = client
            .send(Method::PUT, "/d", "MKDIRS", &[], None, StatusCode::OK)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }
}
