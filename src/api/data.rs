//! File content operations: ranged read, create, append and truncate.
//!
//! The store has no arbitrary-offset overwrite; callers emulate it with
//! [`truncate`] followed by [`append`].

use reqwest::{Method, StatusCode};

use super::client::{error_from_response, HdfsClient};
use super::error::RemoteError;

/// Default read length and transfer buffer size in bytes.
pub const DEFAULT_BLOCK_SIZE: u32 = 4096;

/// Read up to `length` bytes starting at `offset`.
///
/// GET ?op=OPEN&offset=..&length=..&buffersize=... A `length` of zero uses
/// [`DEFAULT_BLOCK_SIZE`]. The store answers 403 for reads past the end of
/// the file; that status is reported as [`RemoteError::EndOfFile`] rather
/// than access-denied.
pub async fn open(
    client: &HdfsClient,
    path: &str,
    offset: u64,
    length: u32,
) -> Result<Vec<u8>, RemoteError> {
    let length = if length == 0 { DEFAULT_BLOCK_SIZE } else { length };
    let params = [
        ("offset", offset.to_string()),
        ("length", length.to_string()),
        ("buffersize", DEFAULT_BLOCK_SIZE.to_string()),
    ];
    let resp = client
        .execute(Method::GET, path, "OPEN", &params, None)
        .await?;
    match resp.status() {
        StatusCode::OK => {}
        StatusCode::FORBIDDEN => {
            log::debug!("OPEN {} at offset {}: past end of file", path, offset);
            return Err(RemoteError::EndOfFile);
        }
        _ => return Err(error_from_response(resp, "OPEN", path).await),
    }
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| RemoteError::Transport(format!("Failed to read OPEN response: {}", e)))?;
    Ok(bytes.to_vec())
}

/// Create an empty file with the given octal permission string.
///
/// PUT ?op=CREATE&permission=..&overwrite=false, success is 201.
pub async fn create(client: &HdfsClient, path: &str, permission: &str) -> Result<(), RemoteError> {
    let params = [
        ("permission", permission.to_string()),
        ("overwrite", "false".to_string()),
    ];
    client
        .send(Method::PUT, path, "CREATE", &params, Some(Vec::new()), StatusCode::CREATED)
        .await?;
    Ok(())
}

/// Append bytes to the end of a file.
///
/// POST ?op=APPEND with the data as the request body.
pub async fn append(client: &HdfsClient, path: &str, data: &[u8]) -> Result<(), RemoteError> {
    client
        .send(Method::POST, path, "APPEND", &[], Some(data.to_vec()), StatusCode::OK)
        .await?;
    Ok(())
}

/// Cut a file down to `new_length` bytes, discarding the tail.
///
/// POST ?op=TRUNCATE&newlength=... Returns the store's boolean verdict.
pub async fn truncate(client: &HdfsClient, path: &str, new_length: u64) -> Result<bool, RemoteError> {
    client
        .send_boolean(
            Method::POST,
            path,
            "TRUNCATE",
            &[("newlength", new_length.to_string())],
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::test_server::respond_once;

    // ── OPEN ──

    #[tokio::test]
    async fn test_open_returns_body_bytes() {
        let (client, server) = respond_once("200 OK", "hello").await;
        let bytes = open(&client, "/f.txt", 3, 0).await.unwrap();
        assert_eq!(bytes, b"hello");
        let request = server.await.unwrap();
        assert!(request.contains("op=OPEN&offset=3&length=4096&buffersize=4096"));
    }

    #[tokio::test]
    async fn test_open_forbidden_is_end_of_file() {
        let body = r#"{"RemoteException":{"exception":"IOException","javaClassName":"java.io.IOException","message":"Offset=100 out of the range [0, 5)"}}"#;
        let (client, _server) = respond_once("403 Forbidden", body).await;
        let err = open(&client, "/f.txt", 100, 10).await.unwrap_err();
        assert!(matches!(err, RemoteError::EndOfFile));
    }

    #[tokio::test]
    async fn test_open_missing_file_is_not_found() {
        let body = r#"{"RemoteException":{"exception":"FileNotFoundException","javaClassName":"java.io.FileNotFoundException","message":"File does not exist: /f.txt"}}"#;
        let (client, _server) = respond_once("404 Not Found", body).await;
        let err = open(&client, "/f.txt", 0, 10).await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound));
    }

    // ── CREATE ──

    #[tokio::test]
    async fn test_create_accepts_created() {
        let (client, server) = respond_once("201 Created", "").await;
        create(&client, "/new.txt", "644").await.unwrap();
        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /webhdfs/v1/new.txt?"));
        assert!(request.contains("op=CREATE&permission=644&overwrite=false"));
    }

    #[tokio::test]
    async fn test_create_rejects_plain_ok() {
        let (client, _server) = respond_once("200 OK", "").await;
        let err = create(&client, "/new.txt", "644").await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }

    // ── APPEND ──

    #[tokio::test]
    async fn test_append_unparseable_server_error_is_transport() {
        let (client, _server) =
            respond_once("500 Internal Server Error", "<html>gateway</html>").await;
        let err = append(&client, "/f.txt", b"data").await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }
}
