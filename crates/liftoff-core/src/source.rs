//! Scheme resolution for artifact locations handed to the stager.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StoreUri {
    /// No scheme, or a `file:` scheme: `./lib/app.jar`, `file:///opt/app.jar`
    Local { path: PathBuf },
    /// Anything else is already in a store: `store://nn:8020/libs/app.jar`
    Store { scheme: String, uri: String },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("empty artifact location")]
    Empty,
    #[error("invalid artifact location: {0}")]
    InvalidUri(String),
}

impl StoreUri {
    pub fn parse(uri: &str) -> Result<Self, SourceError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(SourceError::Empty);
        }

        match scheme_of(uri) {
            None => Ok(StoreUri::Local { path: PathBuf::from(uri) }),
            Some(scheme) if scheme.starts_with("file") => {
                let rest = &uri[scheme.len() + 1..];
                // file:///abs, file://localhost/abs, file:/abs, file:rel
                let path = match rest.strip_prefix("//") {
                    Some(authority_and_path) => match authority_and_path.find('/') {
                        Some(idx) => &authority_and_path[idx..],
                        None => return Err(SourceError::InvalidUri(uri.to_string())),
                    },
                    None => rest,
                };
                Ok(StoreUri::Local { path: PathBuf::from(path) })
            }
            Some(scheme) => Ok(StoreUri::Store {
                scheme: scheme.to_string(),
                uri: uri.to_string(),
            }),
        }
    }
}

/// RFC 3986 scheme: a letter followed by letters, digits, `+`, `-` or `.`,
/// terminated by `:`. Single letters are treated as drive prefixes.
fn scheme_of(uri: &str) -> Option<&str> {
    let (candidate, _) = uri.split_once(':')?;
    let mut chars = candidate.chars();
    let first = chars.next()?;
    if candidate.len() < 2 || !first.is_ascii_alphabetic() {
        return None;
    }
    chars
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        .then_some(candidate)
}
