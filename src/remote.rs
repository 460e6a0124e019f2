//! Access-token injection for the backup remote.

use crate::error::ConfigError;

/// Split `scheme://authority/path` into its three parts.
///
/// The path keeps its leading slash and may be empty.
fn split_url(url: &str) -> Option<(&str, &str, &str)> {
    let (scheme, rest) = url.split_once("://")?;
    if scheme.is_empty()
        || !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        return None;
    }
    let (authority, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    Some((scheme, authority, path))
}

/// Drop any user-info already present in the authority.
fn host_part(authority: &str) -> &str {
    authority
        .rsplit_once('@')
        .map(|(_, host)| host)
        .unwrap_or(authority)
}

/// Check that `url` has the `scheme://host[/path]` shape required for token injection.
pub fn check_remote(url: &str) -> Result<(), ConfigError> {
    match split_url(url.trim()) {
        Some((_, authority, _)) if !host_part(authority).is_empty() => Ok(()),
        _ => Err(ConfigError::InvalidRemote(url.to_string())),
    }
}

/// Build the token-bearing push URL: `scheme://TOKEN@host/path`.
///
/// Existing user-info in `remote_url` is replaced by the token.
pub fn inject_token(remote_url: &str, token: &str) -> Result<String, ConfigError> {
    let url = remote_url.trim();
    let (scheme, authority, path) =
        split_url(url).ok_or_else(|| ConfigError::InvalidRemote(url.to_string()))?;
    let host = host_part(authority);
    if host.is_empty() {
        return Err(ConfigError::InvalidRemote(url.to_string()));
    }
    Ok(format!("{}://{}@{}{}", scheme, token, host, path))
}

/// Hide the user-info of a URL so it can be logged or printed.
pub fn redact_token(url: &str) -> String {
    match split_url(url) {
        Some((scheme, authority, path)) if authority.contains('@') => {
            format!("{}://***@{}{}", scheme, host_part(authority), path)
        }
        _ => url.to_string(),
    }
}
