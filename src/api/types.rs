//! Request and response types for the WebHDFS REST API.
//!
//! All structs use camelCase serialization to match the API's JSON format.

use serde::Deserialize;

/// A single file or directory record as reported by GETFILESTATUS and
/// LISTSTATUS_BATCH. Timestamps are milliseconds since the epoch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileStatus {
    /// Entry name relative to the listed directory (empty for GETFILESTATUS).
    pub path_suffix: String,
    /// "FILE", "DIRECTORY" or "SYMLINK".
    #[serde(rename = "type")]
    pub kind: String,
    pub length: u64,
    pub owner: String,
    pub group: String,
    /// Octal permission string, e.g. "755".
    pub permission: String,
    pub access_time: i64,
    pub modification_time: i64,
    pub block_size: u64,
    pub replication: u32,
    pub file_id: u64,
    pub children_num: u64,
    /// Link target (symlinks only).
    pub symlink: Option<String>,
}

/// Response from GET ?op=GETFILESTATUS.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileStatusResponse {
    pub file_status: FileStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileStatuses {
    #[serde(default)]
    pub file_status: Vec<FileStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PartialListing {
    pub file_statuses: FileStatuses,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub partial_listing: PartialListing,
    #[serde(default)]
    pub remaining_entries: u64,
}

/// Response from GET ?op=LISTSTATUS_BATCH.
#[derive(Debug, Deserialize)]
pub struct ListStatusBatchResponse {
    #[serde(rename = "DirectoryListing")]
    pub directory_listing: DirectoryListing,
}

/// One page of a directory listing plus the count of entries still on the
/// server after it.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub entries: Vec<FileStatus>,
    pub remaining: u64,
}

impl From<ListStatusBatchResponse> for ListingPage {
    fn from(resp: ListStatusBatchResponse) -> Self {
        Self {
            entries: resp.directory_listing.partial_listing.file_statuses.file_status,
            remaining: resp.directory_listing.remaining_entries,
        }
    }
}

/// `{"boolean": true}` returned by MKDIRS, TRUNCATE, DELETE and RENAME.
#[derive(Debug, Deserialize)]
pub struct BooleanResponse {
    pub boolean: bool,
}

#[derive(Debug, Deserialize)]
pub struct XAttr {
    pub name: String,
    /// Encoded value ("0x..." with `encoding=hex`); null when unset.
    pub value: Option<String>,
}

/// Response from GET ?op=GETXATTRS.
#[derive(Debug, Deserialize)]
pub struct XAttrsResponse {
    #[serde(rename = "XAttrs", default)]
    pub xattrs: Vec<XAttr>,
}

/// Response from GET ?op=LISTXATTRS. The names arrive as a JSON array
/// serialized into a string.
#[derive(Debug, Deserialize)]
pub struct XAttrNamesResponse {
    #[serde(rename = "XAttrNames")]
    pub xattr_names: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteException {
    #[serde(default)]
    pub exception: String,
    #[serde(default)]
    pub java_class_name: String,
    #[serde(default)]
    pub message: String,
}

/// Error envelope carried by every non-success response.
#[derive(Debug, Deserialize)]
pub struct RemoteExceptionEnvelope {
    #[serde(rename = "RemoteException")]
    pub remote_exception: RemoteException,
}

/// Flag for SETXATTR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XAttrSetFlag {
    Create,
    Replace,
}

impl XAttrSetFlag {
    pub fn as_param(self) -> &'static str {
        match self {
            XAttrSetFlag::Create => "CREATE",
            XAttrSetFlag::Replace => "REPLACE",
        }
    }
}
