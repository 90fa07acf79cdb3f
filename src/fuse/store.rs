//! Synchronous view of the remote store used by the dispatcher.
//!
//! FUSE callbacks are synchronous, so [`BlockingStore`] drives the async
//! WebHDFS client on the shared tokio runtime and bounds every call with a
//! timeout. Tests substitute an in-memory implementation of [`RemoteStore`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::api::client::HdfsClient;
use crate::api::error::RemoteError;
use crate::api::types::{FileStatus, ListingPage, XAttrSetFlag};
use crate::api::{data, namespace, status, xattr};

/// One method per remote primitive. Boolean verdicts from the store are
/// already folded in: `false` surfaces as [`RemoteError::AccessDenied`].
pub trait RemoteStore: Send + Sync {
    fn stat(&self, path: &str) -> Result<FileStatus, RemoteError>;
    fn list(&self, path: &str, start_after: Option<&str>) -> Result<ListingPage, RemoteError>;
    fn read(&self, path: &str, offset: u64, length: u32) -> Result<Vec<u8>, RemoteError>;
    fn create(&self, path: &str, permission: &str) -> Result<(), RemoteError>;
    fn mkdir(&self, path: &str, permission: &str) -> Result<(), RemoteError>;
    fn append(&self, path: &str, data: &[u8]) -> Result<(), RemoteError>;
    fn truncate(&self, path: &str, new_length: u64) -> Result<(), RemoteError>;
    fn delete(&self, path: &str) -> Result<(), RemoteError>;
    fn rename(&self, from: &str, to: &str) -> Result<(), RemoteError>;
    fn set_times(&self, path: &str, modification_ms: i64, access_ms: i64) -> Result<(), RemoteError>;
    fn set_permission(&self, path: &str, permission: &str) -> Result<(), RemoteError>;
    fn create_symlink(&self, target: &str, link: &str) -> Result<(), RemoteError>;
    fn get_xattr(&self, path: &str, name: &str) -> Result<Vec<u8>, RemoteError>;
    fn list_xattrs(&self, path: &str) -> Result<Vec<String>, RemoteError>;
    fn set_xattr(
        &self,
        path: &str,
        name: &str,
        value: &[u8],
        flag: XAttrSetFlag,
    ) -> Result<(), RemoteError>;
    fn remove_xattr(&self, path: &str, name: &str) -> Result<(), RemoteError>;
}

/// Production store: the async client run to completion on a tokio runtime.
pub struct BlockingStore {
    client: Arc<HdfsClient>,
    rt: tokio::runtime::Handle,
    timeout: Duration,
}

impl BlockingStore {
    pub fn new(client: Arc<HdfsClient>, rt: tokio::runtime::Handle, timeout: Duration) -> Self {
        Self { client, rt, timeout }
    }

    /// Run an async future with a timeout on the tokio runtime.
    /// Expiry is reported as a transport failure.
    fn block_with_timeout<F, T>(&self, fut: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        let timeout = self.timeout;
        self.rt.block_on(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => Err(RemoteError::Transport(format!(
                    "Operation timed out after {:?}",
                    timeout
                ))),
            }
        })
    }
}

fn require(verdict: bool) -> Result<(), RemoteError> {
    if verdict {
        Ok(())
    } else {
        Err(RemoteError::AccessDenied)
    }
}

impl RemoteStore for BlockingStore {
    fn stat(&self, path: &str) -> Result<FileStatus, RemoteError> {
        self.block_with_timeout(status::get_file_status(&self.client, path))
    }

    fn list(&self, path: &str, start_after: Option<&str>) -> Result<ListingPage, RemoteError> {
        self.block_with_timeout(status::list_status_batch(&self.client, path, start_after))
    }

    fn read(&self, path: &str, offset: u64, length: u32) -> Result<Vec<u8>, RemoteError> {
        self.block_with_timeout(data::open(&self.client, path, offset, length))
    }

    fn create(&self, path: &str, permission: &str) -> Result<(), RemoteError> {
        self.block_with_timeout(data::create(&self.client, path, permission))
    }

    fn mkdir(&self, path: &str, permission: &str) -> Result<(), RemoteError> {
        require(self.block_with_timeout(namespace::mkdirs(&self.client, path, permission))?)
    }

    fn append(&self, path: &str, bytes: &[u8]) -> Result<(), RemoteError> {
        self.block_with_timeout(data::append(&self.client, path, bytes))
    }

    fn truncate(&self, path: &str, new_length: u64) -> Result<(), RemoteError> {
        require(self.block_with_timeout(data::truncate(&self.client, path, new_length))?)
    }

    fn delete(&self, path: &str) -> Result<(), RemoteError> {
        require(self.block_with_timeout(namespace::delete(&self.client, path))?)
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), RemoteError> {
        require(self.block_with_timeout(namespace::rename(&self.client, from, to))?)
    }

    fn set_times(&self, path: &str, modification_ms: i64, access_ms: i64) -> Result<(), RemoteError> {
        self.block_with_timeout(namespace::set_times(
            &self.client,
            path,
            modification_ms,
            access_ms,
        ))
    }

    fn set_permission(&self, path: &str, permission: &str) -> Result<(), RemoteError> {
        self.block_with_timeout(namespace::set_permission(&self.client, path, permission))
    }

    fn create_symlink(&self, target: &str, link: &str) -> Result<(), RemoteError> {
        self.block_with_timeout(namespace::create_symlink(&self.client, target, link))
    }

    fn get_xattr(&self, path: &str, name: &str) -> Result<Vec<u8>, RemoteError> {
        self.block_with_timeout(xattr::get_xattr(&self.client, path, name))
    }

    fn list_xattrs(&self, path: &str) -> Result<Vec<String>, RemoteError> {
        self.block_with_timeout(xattr::list_xattrs(&self.client, path))
    }

    fn set_xattr(
        &self,
        path: &str,
        name: &str,
        value: &[u8],
        flag: XAttrSetFlag,
    ) -> Result<(), RemoteError> {
        self.block_with_timeout(xattr::set_xattr(&self.client, path, name, value, flag))
    }

    fn remove_xattr(&self, path: &str, name: &str) -> Result<(), RemoteError> {
        self.block_with_timeout(xattr::remove_xattr(&self.client, path, name))
    }
}

/// Lazy sequence of directory pages.
///
/// Each step fetches one page after the name of the last entry seen. The
/// sequence ends after a page reporting no remaining entries, after an
/// empty page, or after the first error.
pub struct ListingPages<'a> {
    store: &'a dyn RemoteStore,
    path: &'a str,
    cursor: Option<String>,
    done: bool,
}

impl<'a> ListingPages<'a> {
    pub fn new(store: &'a dyn RemoteStore, path: &'a str) -> Self {
        Self {
            store,
            path,
            cursor: None,
            done: false,
        }
    }
}

impl Iterator for ListingPages<'_> {
    type Item = Result<Vec<FileStatus>, RemoteError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.store.list(self.path, self.cursor.as_deref()) {
            Ok(page) => {
                match page.entries.last() {
                    Some(last) if page.remaining > 0 => {
                        self.cursor = Some(last.path_suffix.clone());
                    }
                    _ => self.done = true,
                }
                if page.entries.is_empty() {
                    return None;
                }
                Some(Ok(page.entries))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_false_is_access_denied() {
        assert!(require(true).is_ok());
        assert!(matches!(require(false), Err(RemoteError::AccessDenied)));
    }

    #[test]
    fn test_block_with_timeout_expires_as_transport() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let config = crate::config::HadoopConfig {
            ssl: false,
            host: "127.0.0.1".to_string(),
            port: 9870,
            username: None,
            delegation: None,
        };
        let store = BlockingStore::new(
            Arc::new(HdfsClient::new(&config, Duration::from_secs(5))),
            rt.handle().clone(),
            Duration::from_millis(10),
        );
        let result: Result<(), RemoteError> = store.block_with_timeout(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        });
        assert!(matches!(result, Err(RemoteError::Transport(_))));
    }

    #[test]
    fn test_mkdir_false_verdict_is_access_denied() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let (client, server) = rt.block_on(crate::api::client::test_server::respond_once(
            "200 OK",
            r#"{"boolean":false}"#,
        ));
        let store = BlockingStore::new(Arc::new(client), rt.handle().clone(), Duration::from_secs(5));
        assert!(matches!(store.mkdir("/d", "755"), Err(RemoteError::AccessDenied)));
        let request = rt.block_on(server).unwrap();
        assert!(request.contains("op=MKDIRS&permission=755"));
    }
}
