//! Extended attribute operations.
//!
//! Values travel hex-encoded (`0x` prefix) in both directions so arbitrary
//! bytes survive the query string and the JSON body.

use reqwest::{Method, StatusCode};

use super::client::HdfsClient;
use super::error::RemoteError;
use super::types::{XAttrNamesResponse, XAttrSetFlag, XAttrsResponse};

/// Fetch the raw value of one attribute.
///
/// GET ?op=GETXATTRS&xattr.name=..&encoding=hex.
pub async fn get_xattr(client: &HdfsClient, path: &str, name: &str) -> Result<Vec<u8>, RemoteError> {
    let params = [
        ("xattr.name", name.to_string()),
        ("encoding", "hex".to_string()),
    ];
    let resp = client
        .send(Method::GET, path, "GETXATTRS", &params, None, StatusCode::OK)
        .await?;
    let parsed: XAttrsResponse = resp
        .json()
        .await
        .map_err(|e| RemoteError::Transport(format!("Failed to parse GETXATTRS response: {}", e)))?;

    let attr = parsed
        .xattrs
        .into_iter()
        .find(|a| a.name == name)
        .ok_or(RemoteError::NoSuchAttribute)?;
    match attr.value {
        Some(encoded) => decode_value(&encoded),
        None => Ok(Vec::new()),
    }
}

/// List the attribute names present on a path.
///
/// GET ?op=LISTXATTRS. The response carries the names as a JSON array
/// serialized into a string.
pub async fn list_xattrs(client: &HdfsClient, path: &str) -> Result<Vec<String>, RemoteError> {
    let resp = client
        .send(Method::GET, path, "LISTXATTRS", &[], None, StatusCode::OK)
        .await?;
    let parsed: XAttrNamesResponse = resp
        .json()
        .await
        .map_err(|e| RemoteError::Transport(format!("Failed to parse LISTXATTRS response: {}", e)))?;
    parse_names(&parsed.xattr_names)
}

/// Create or replace one attribute.
///
/// PUT ?op=SETXATTR&xattr.name=..&xattr.value=0x..&flag=CREATE|REPLACE.
pub async fn set_xattr(
    client: &HdfsClient,
    path: &str,
    name: &str,
    value: &[u8],
    flag: XAttrSetFlag,
) -> Result<(), RemoteError> {
    let params = [
        ("xattr.name", name.to_string()),
        ("xattr.value", encode_value(value)),
        ("flag", flag.as_param().to_string()),
    ];
    client
        .send(Method::PUT, path, "SETXATTR", &params, None, StatusCode::OK)
        .await?;
    Ok(())
}

/// PUT ?op=REMOVEXATTR&xattr.name=...
pub async fn remove_xattr(client: &HdfsClient, path: &str, name: &str) -> Result<(), RemoteError> {
    client
        .send(
            Method::PUT,
            path,
            "REMOVEXATTR",
            &[("xattr.name", name.to_string())],
            None,
            StatusCode::OK,
        )
        .await?;
    Ok(())
}

fn encode_value(value: &[u8]) -> String {
    format!("0x{}", hex::encode(value))
}

fn decode_value(encoded: &str) -> Result<Vec<u8>, RemoteError> {
    let digits = encoded
        .strip_prefix("0x")
        .or_else(|| encoded.strip_prefix("0X"))
        .unwrap_or(encoded);
    hex::decode(digits)
        .map_err(|e| RemoteError::Transport(format!("Invalid hex xattr value: {}", e)))
}

fn parse_names(raw: &str) -> Result<Vec<String>, RemoteError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
        .map_err(|e| RemoteError::Transport(format!("Invalid XAttrNames list: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_value_is_prefixed_hex() {
        assert_eq!(encode_value(b"hello"), "0x68656c6c6f");
        assert_eq!(encode_value(&[]), "0x");
    }

    #[test]
    fn test_decode_value() {
        assert_eq!(decode_value("0x68656c6c6f").unwrap(), b"hello");
        assert_eq!(decode_value("0x00ff").unwrap(), vec![0x00, 0xff]);
        assert!(decode_value("0x").unwrap().is_empty());
        assert!(matches!(decode_value("0xzz"), Err(RemoteError::Transport(_))));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            parse_names(r#"["user.a","user.b"]"#).unwrap(),
            vec!["user.a".to_string(), "user.b".to_string()]
        );
        assert!(parse_names("[]").unwrap().is_empty());
        assert!(parse_names("").unwrap().is_empty());
    }
}
