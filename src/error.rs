//! Error types for cloudflare-update-dns.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cloudflare-update-dns.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// Everything that can stop a run, or a single record update.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// No config file at the given path.
    #[error(
        "Could not find a config file at {}. Either create a config.json in the working directory, or pass the \"-c\" option with the path to your config.",
        .0.display()
    )]
    ConfigMissing(PathBuf),

    /// The config file exists but could not be read or parsed.
    #[error(
        "Could not read config {}: {reason}. Please check that the path is valid, and the contents is valid JSON.",
        .path.display()
    )]
    ConfigUnreadable { path: PathBuf, reason: String },

    /// `API_KEY` or `ZONE_ID` is absent or empty.
    #[error("Your config is missing either an \"API_KEY\" or a \"ZONE_ID\". Please check and try again.")]
    ConfigIncomplete,

    /// The IP-echo service answered with an empty body.
    #[error("There was an error parsing the fetch IP response: {0}")]
    IpParse(String),

    /// Transport failure or non-success status from the IP-echo service.
    #[error("There was an error with the fetch IP request: {0}")]
    IpRequest(String),

    /// The record listing succeeded but had no usable `result` array.
    #[error("Could not parse JSON response for DNS records fetch: {0}")]
    ListParse(String),

    /// The record listing failed.
    #[error(
        "Something went wrong during the DNS records fetch ({0}). Please check your URL and/or API key and DNS Zone ID."
    )]
    ListUnknown(String),

    /// A single record could not be updated.
    #[error("Something went wrong with updating DNS record \"{name}\": {reason}")]
    UpdateUnknown { name: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        DdnsError::HttpClient(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_error_names_record() {
        let err = DdnsError::UpdateUnknown {
            name: "home.example.com".to_string(),
            reason: "HTTP 500".to_string(),
        };
        assert!(err.to_string().contains("\"home.example.com\""));
    }

    #[test]
    fn test_missing_config_mentions_option() {
        let err = DdnsError::ConfigMissing(PathBuf::from("/nowhere/config.json"));
        let msg = err.to_string();
        assert!(msg.contains("/nowhere/config.json"));
        assert!(msg.contains("-c"));
    }
}
