//! FUSE filesystem module for hdfs-fuse.
//!
//! Mounts a WebHDFS namespace as a local filesystem. Node ids are the
//! store's file ids; the path cache maps them back to remote paths.
//!
//! The caches, store adapter and dispatcher are always available (they
//! don't depend on libfuse). The operations module and the mount function
//! require the `fuse` feature.

pub mod attr;
pub mod cache;
pub mod dispatcher;
pub mod error;
#[cfg(feature = "fuse")]
pub mod operations;
pub mod path_cache;
pub mod store;


#[cfg(feature = "fuse")]
use std::sync::Arc;
#[cfg(feature = "fuse")]
use std::time::Duration;

#[cfg(feature = "fuse")]
use fuser::MountOption;

#[cfg(feature = "fuse")]
use crate::config::Config;
#[cfg(feature = "fuse")]
use crate::state::FsState;

/// The mounted filesystem: the dispatcher plus the kernel cache TTL.
#[cfg(feature = "fuse")]
pub struct HdfsFs {
    pub dispatcher: dispatcher::Dispatcher,
    /// TTL for attribute and entry replies.
    pub attr_ttl: Duration,
}

#[cfg(feature = "fuse")]
impl HdfsFs {
    pub fn new(state: Arc<FsState>, attr_ttl: Duration) -> Self {
        Self {
            dispatcher: dispatcher::Dispatcher::new(state),
            attr_ttl,
        }
    }
}

#[cfg(feature = "fuse")]
fn mount_options(config: &Config) -> Vec<MountOption> {
    let mut options = vec![
        MountOption::FSName("hdfs".to_string()),
        MountOption::Subtype("webhdfs".to_string()),
        MountOption::RW,
    ];
    if config.allow_other {
        options.push(MountOption::AllowOther);
    }
    options
}

/// Mount the filesystem in the background.
///
/// The returned session keeps the mount alive; dropping it unmounts.
#[cfg(feature = "fuse")]
pub fn mount_filesystem(
    state: Arc<FsState>,
    config: &Config,
) -> Result<fuser::BackgroundSession, String> {
    let fs = HdfsFs::new(state, config.attr_timeout);
    let options = mount_options(config);

    log::info!(
        "Mounting hdfs://{}:{} at {}",
        config.hadoop.host,
        config.hadoop.port,
        config.mountpoint.display()
    );
    fuser::spawn_mount2(fs, &config.mountpoint, &options)
        .map_err(|e| format!("FUSE mount error: {}", e))
}
