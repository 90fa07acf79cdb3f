//! WebHDFS REST client.
//!
//! Provides the HTTP client with identity parameters, typed error
//! classification, and one free async function per remote operation.

pub mod client;
pub mod data;
pub mod error;
pub mod namespace;
pub mod status;
pub mod types;
pub mod xattr;
