//! Errors raised by the operation dispatcher and their errno mapping.

use thiserror::Error;

use crate::api::error::RemoteError;

#[derive(Debug, Error)]
pub enum FsError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("Unknown inode {0}")]
    Unresolvable(u64),
    #[error("Invalid file name")]
    InvalidName,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl FsError {
    /// The errno reported to the kernel for this failure.
    pub fn errno(&self) -> libc::c_int {
        match self {
            FsError::Unresolvable(_) => libc::ENOENT,
            FsError::InvalidName => libc::EINVAL,
            FsError::InvalidArgument(_) => libc::EINVAL,
            FsError::Remote(err) => match err {
                RemoteError::NotFound => libc::ENOENT,
                RemoteError::AlreadyExists => libc::EEXIST,
                RemoteError::AccessDenied => libc::EACCES,
                RemoteError::TryAgain => libc::EAGAIN,
                RemoteError::NotSupported => libc::ENOTSUP,
                RemoteError::NoSuchAttribute => no_attribute(),
                RemoteError::OutOfRange => libc::ERANGE,
                // Only reachable if a caller forgets to absorb EOF on read.
                RemoteError::EndOfFile => libc::EIO,
                RemoteError::Transport(_) => libc::EIO,
                RemoteError::Remote { .. } => libc::ENOSYS,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FsError::Remote(RemoteError::NotFound) | FsError::Unresolvable(_)
        )
    }
}

#[cfg(target_os = "macos")]
fn no_attribute() -> libc::c_int {
    libc::ENOATTR
}

#[cfg(not(target_os = "macos"))]
fn no_attribute() -> libc::c_int {
    libc::ENODATA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(FsError::from(RemoteError::NotFound).errno(), libc::ENOENT);
        assert_eq!(FsError::Unresolvable(7).errno(), libc::ENOENT);
        assert_eq!(FsError::from(RemoteError::AlreadyExists).errno(), libc::EEXIST);
        assert_eq!(FsError::from(RemoteError::AccessDenied).errno(), libc::EACCES);
        assert_eq!(FsError::from(RemoteError::TryAgain).errno(), libc::EAGAIN);
        assert_eq!(FsError::from(RemoteError::NotSupported).errno(), libc::ENOTSUP);
        assert_eq!(FsError::from(RemoteError::OutOfRange).errno(), libc::ERANGE);
        assert_eq!(
            FsError::from(RemoteError::Transport("reset".into())).errno(),
            libc::EIO
        );
        assert_eq!(FsError::InvalidArgument("x".into()).errno(), libc::EINVAL);
    }

    #[test]
    fn test_unknown_remote_exception_is_not_implemented() {
        let err = FsError::from(RemoteError::Remote {
            status: 400,
            exception: "IllegalArgumentException".into(),
            message: "bad".into(),
        });
        assert_eq!(err.errno(), libc::ENOSYS);
    }

    #[test]
    fn test_transport_is_never_not_found() {
        assert!(!FsError::from(RemoteError::Transport("timeout".into())).is_not_found());
        assert!(FsError::from(RemoteError::NotFound).is_not_found());
    }
}
