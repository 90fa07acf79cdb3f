//! Typed failures reported by the WebHDFS client.
//!
//! A non-success response carries a JSON envelope
//! `{"RemoteException":{"exception","javaClassName","message"}}`.
//! [`classify`] turns the status code plus that envelope into a
//! [`RemoteError`] kind. Transport failures (connection errors, timeouts,
//! unreadable bodies) are kept apart from remote-reported errors so they are
//! never mistaken for "not found".

use thiserror::Error;

use super::types::RemoteExceptionEnvelope;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("File not found")]
    NotFound,
    #[error("File exists")]
    AlreadyExists,
    #[error("Permission denied")]
    AccessDenied,
    #[error("End of file")]
    EndOfFile,
    #[error("Try again")]
    TryAgain,
    #[error("Operation not supported")]
    NotSupported,
    #[error("No such attribute")]
    NoSuchAttribute,
    #[error("Result out of range")]
    OutOfRange,
    /// A remote exception this client does not recognize.
    #[error("{exception} ({status}): {message}")]
    Remote {
        status: u16,
        exception: String,
        message: String,
    },
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

/// Ops whose failures may describe a missing or duplicate attribute.
const XATTR_OPS: [&str; 4] = ["GETXATTRS", "LISTXATTRS", "SETXATTR", "REMOVEXATTR"];

/// Classify a non-success response to `op` from its status code and raw
/// body.
///
/// A body that is not a RemoteException envelope is a protocol failure and
/// becomes [`RemoteError::Transport`], except for a bare 404 which some
/// proxies return without a body.
pub fn classify(op: &str, status: u16, body: &str) -> RemoteError {
    let envelope: RemoteExceptionEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            if status == 404 {
                return RemoteError::NotFound;
            }
            return RemoteError::Transport(format!(
                "Unparseable error response ({}): {}",
                status, e
            ));
        }
    };

    let exception = envelope.remote_exception.exception;
    let message = envelope.remote_exception.message;
    let lowered = message.to_ascii_lowercase();

    if exception == "FileNotFoundException" {
        return RemoteError::NotFound;
    }

    // xattr failures arrive as plain IOExceptions, so the message decides.
    if XATTR_OPS.contains(&op) {
        if lowered.contains("already exists") {
            return RemoteError::AlreadyExists;
        }
        if lowered.contains("does not exist")
            || lowered.contains("not found")
            || lowered.contains("no matching attributes")
        {
            return RemoteError::NoSuchAttribute;
        }
    }

    match exception.as_str() {
        "FileAlreadyExistsException" => return RemoteError::AlreadyExists,
        "AccessControlException" | "SecurityException" => return RemoteError::AccessDenied,
        "RetriableException" | "StandbyException" => return RemoteError::TryAgain,
        "UnsupportedOperationException" => return RemoteError::NotSupported,
        _ => {}
    }

    if lowered.contains("already exists") {
        return RemoteError::AlreadyExists;
    }

    match status {
        404 => RemoteError::NotFound,
        401 => RemoteError::AccessDenied,
        501 => RemoteError::NotSupported,
        503 => RemoteError::TryAgain,
        _ => RemoteError::Remote {
            status,
            exception,
            message,
        },
    }
}
