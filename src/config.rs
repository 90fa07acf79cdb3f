//! Command-line and environment configuration.
//!
//! Every flag may also be supplied through an `HDFS_FUSE_*` environment
//! variable; `main` loads a `.env` file first so those can live on disk.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "hdfs-fuse", version, about = "Mount a WebHDFS store as a local filesystem")]
pub struct Args {
    /// Directory to mount the filesystem on
    #[arg(short = 'm', long, env = "HDFS_FUSE_MOUNTPOINT")]
    pub mountpoint: PathBuf,

    /// NameNode host
    #[arg(long, env = "HDFS_FUSE_HADOOP_HOST")]
    pub hadoop_host: String,

    /// NameNode HTTP port
    #[arg(long, env = "HDFS_FUSE_HADOOP_PORT")]
    pub hadoop_port: u16,

    /// Talk to the NameNode over HTTPS
    #[arg(long, env = "HDFS_FUSE_HADOOP_SSL", default_value_t = false)]
    pub hadoop_ssl: bool,

    /// Sent as `user.name` on every request
    #[arg(long, env = "HDFS_FUSE_HADOOP_USERNAME")]
    pub hadoop_username: Option<String>,

    /// Delegation token sent as `delegation` on every request
    #[arg(long, env = "HDFS_FUSE_HADOOP_DELEGATION")]
    pub hadoop_delegation: Option<String>,

    /// Seconds a failed lookup is remembered as absent
    #[arg(long, env = "HDFS_FUSE_NOT_EXIST_CACHE", default_value_t = 200)]
    pub not_exist_cache: u64,

    /// Seconds the kernel may cache attributes and entries
    #[arg(long, env = "HDFS_FUSE_ATTR_TIMEOUT", default_value_t = 10.0)]
    pub attr_timeout: f64,

    /// Seconds before a single remote request is abandoned
    #[arg(long, env = "HDFS_FUSE_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,

    /// Enable debug logging
    #[arg(long, env = "HDFS_FUSE_DEBUG", default_value_t = false)]
    pub debug: bool,

    /// Let users other than the mounting user access the filesystem
    #[arg(long, env = "HDFS_FUSE_ALLOW_OTHER", default_value_t = false)]
    pub allow_other: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Mount point does not exist: {0}")]
    MissingMountpoint(PathBuf),
    #[error("Mount point is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Hadoop host must not be empty")]
    EmptyHost,
    #[error("Hadoop port must not be zero")]
    ZeroPort,
    #[error("Invalid attribute timeout: {0}")]
    InvalidAttrTimeout(f64),
    #[error("Request timeout must not be zero")]
    ZeroRequestTimeout,
}

/// Connection settings for the NameNode.
#[derive(Debug, Clone)]
pub struct HadoopConfig {
    pub ssl: bool,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub delegation: Option<String>,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mountpoint: PathBuf,
    pub hadoop: HadoopConfig,
    pub negative_timeout: Duration,
    pub attr_timeout: Duration,
    pub request_timeout: Duration,
    pub debug: bool,
    pub allow_other: bool,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        if !args.mountpoint.exists() {
            return Err(ConfigError::MissingMountpoint(args.mountpoint));
        }
        if !args.mountpoint.is_dir() {
            return Err(ConfigError::NotADirectory(args.mountpoint));
        }
        if args.hadoop_host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if args.hadoop_port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if !args.attr_timeout.is_finite() || args.attr_timeout < 0.0 {
            return Err(ConfigError::InvalidAttrTimeout(args.attr_timeout));
        }
        if args.request_timeout == 0 {
            return Err(ConfigError::ZeroRequestTimeout);
        }

        Ok(Self {
            mountpoint: args.mountpoint,
            hadoop: HadoopConfig {
                ssl: args.hadoop_ssl,
                host: args.hadoop_host,
                port: args.hadoop_port,
                username: args.hadoop_username.filter(|u| !u.is_empty()),
                delegation: args.hadoop_delegation.filter(|d| !d.is_empty()),
            },
            negative_timeout: Duration::from_secs(args.not_exist_cache),
            attr_timeout: Duration::from_secs_f64(args.attr_timeout),
            request_timeout: Duration::from_secs(args.request_timeout),
            debug: args.debug,
            allow_other: args.allow_other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str], mountpoint: &str) -> Args {
        let mut argv = vec![
            "hdfs-fuse",
            "-m",
            mountpoint,
            "--hadoop-host",
            "namenode",
            "--hadoop-port",
            "9870",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let dir = std::env::temp_dir();
        let config = Config::from_args(parse(&[], dir.to_str().unwrap())).unwrap();
        assert_eq!(config.negative_timeout, Duration::from_secs(200));
        assert_eq!(config.attr_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(!config.hadoop.ssl);
        assert!(!config.allow_other);
        assert_eq!(config.hadoop.port, 9870);
    }

    #[test]
    fn test_identity_flags() {
        let dir = std::env::temp_dir();
        let args = parse(
            &["--hadoop-username", "ming", "--hadoop-delegation", "", "--hadoop-ssl"],
            dir.to_str().unwrap(),
        );
        let config = Config::from_args(args).unwrap();
        assert_eq!(config.hadoop.username.as_deref(), Some("ming"));
        assert!(config.hadoop.delegation.is_none());
        assert!(config.hadoop.ssl);
    }

    #[test]
    fn test_missing_mountpoint_rejected() {
        let args = parse(&[], "/nonexistent/hdfs-fuse-mount-point");
        assert!(matches!(
            Config::from_args(args),
            Err(ConfigError::MissingMountpoint(_))
        ));
    }

    #[test]
    fn test_negative_attr_timeout_rejected() {
        let dir = std::env::temp_dir();
        let args = parse(&["--attr-timeout=-1"], dir.to_str().unwrap());
        assert!(matches!(
            Config::from_args(args),
            Err(ConfigError::InvalidAttrTimeout(_))
        ));
    }
}
