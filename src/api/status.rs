//! Metadata reads: single-record stat and paginated directory listing.

use reqwest::{Method, StatusCode};

use super::client::HdfsClient;
use super::error::RemoteError;
use super::types::{FileStatus, FileStatusResponse, ListStatusBatchResponse, ListingPage};

/// Fetch the metadata record for one path.
///
/// GET ?op=GETFILESTATUS. A missing path is [`RemoteError::NotFound`].
pub async fn get_file_status(client: &HdfsClient, path: &str) -> Result<FileStatus, RemoteError> {
    let resp = client
        .send(Method::GET, path, "GETFILESTATUS", &[], None, StatusCode::OK)
        .await?;
    let parsed: FileStatusResponse = resp
        .json()
        .await
        .map_err(|e| RemoteError::Transport(format!("Failed to parse GETFILESTATUS response: {}", e)))?;
    Ok(parsed.file_status)
}

/// Fetch one page of a directory listing.
///
/// GET ?op=LISTSTATUS_BATCH[&startAfter=<name>]. The cursor is the name of
/// the last entry of the previous page.
pub async fn list_status_batch(
    client: &HdfsClient,
    path: &str,
    start_after: Option<&str>,
) -> Result<ListingPage, RemoteError> {
    let params: Vec<(&str, String)> = match start_after {
        Some(cursor) if !cursor.is_empty() => vec![("startAfter", cursor.to_string())],
        _ => Vec::new(),
    };
    let resp = client
        .send(Method::GET, path, "LISTSTATUS_BATCH", &params, None, StatusCode::OK)
        .await?;
    let parsed: ListStatusBatchResponse = resp
        .json()
        .await
        .map_err(|e| RemoteError::Transport(format!("Failed to parse LISTSTATUS_BATCH response: {}", e)))?;
    Ok(ListingPage::from(parsed))
}
