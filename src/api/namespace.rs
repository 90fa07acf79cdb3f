//! Namespace mutations: mkdir, delete, rename, times, permission, symlink.

use reqwest::{Method, StatusCode};

use super::client::HdfsClient;
use super::error::RemoteError;

/// PUT ?op=MKDIRS&permission=...
pub async fn mkdirs(client: &HdfsClient, path: &str, permission: &str) -> Result<bool, RemoteError> {
    client
        .send_boolean(
            Method::PUT,
            path,
            "MKDIRS",
            &[("permission", permission.to_string())],
        )
        .await
}

/// DELETE ?op=DELETE&recursive=false. Non-empty directories are refused.
pub async fn delete(client: &HdfsClient, path: &str) -> Result<bool, RemoteError> {
    client
        .send_boolean(
            Method::DELETE,
            path,
            "DELETE",
            &[("recursive", "false".to_string())],
        )
        .await
}

/// PUT ?op=RENAME&destination=<absolute path>.
pub async fn rename(client: &HdfsClient, from: &str, to: &str) -> Result<bool, RemoteError> {
    client
        .send_boolean(Method::PUT, from, "RENAME", &[("destination", to.to_string())])
        .await
}

/// PUT ?op=SETTIMES. A value of -1 leaves that timestamp unchanged.
pub async fn set_times(
    client: &HdfsClient,
    path: &str,
    modification_ms: i64,
    access_ms: i64,
) -> Result<(), RemoteError> {
    let params = [
        ("modificationtime", modification_ms.to_string()),
        ("accesstime", access_ms.to_string()),
    ];
    client
        .send(Method::PUT, path, "SETTIMES", &params, None, StatusCode::OK)
        .await?;
    Ok(())
}

/// PUT ?op=SETPERMISSION&permission=<octal>.
pub async fn set_permission(client: &HdfsClient, path: &str, permission: &str) -> Result<(), RemoteError> {
    client
        .send(
            Method::PUT,
            path,
            "SETPERMISSION",
            &[("permission", permission.to_string())],
            None,
            StatusCode::OK,
        )
        .await?;
    Ok(())
}

/// PUT <link>?op=CREATESYMLINK&destination=<target>.
///
/// Most deployments disable symlinks; the refusal is classified like any
/// other remote error.
pub async fn create_symlink(client: &HdfsClient, target: &str, link: &str) -> Result<(), RemoteError> {
    let params = [
        ("destination", target.to_string()),
        ("createParent", "false".to_string()),
    ];
    client
        .send(Method::PUT, link, "CREATESYMLINK", &params, None, StatusCode::OK)
        .await?;
    Ok(())
}
