//! DNS record client: the provider-side half of an update run.

mod cloudflare;

pub use cloudflare::CloudflareClient;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// TTL value the provider interprets as "automatic".
pub const AUTO_TTL: u32 = 1;

/// A DNS record as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub proxiable: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub zone_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modified_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// RFC 3339 timestamp, or `None` for anything missing or malformed.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

/// Request body for overwriting a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecordUpdate {
    pub content: String,
    pub name: String,
    pub proxied: bool,
    #[serde(rename = "type")]
    pub record_type: String,
    pub comment: String,
    pub tags: Vec<String>,
    pub ttl: u32,
}

impl DnsRecordUpdate {
    /// Point `record` at `ip`, keeping its name, type, proxy flag and tags.
    ///
    /// The TTL is always reset to [`AUTO_TTL`] and the comment always
    /// replaced with one stamped with `timestamp` (Unix seconds).
    pub fn for_record(record: &DnsRecord, ip: &str, timestamp: i64) -> Self {
        Self {
            content: ip.to_string(),
            name: record.name.clone(),
            proxied: record.proxied,
            record_type: record.record_type.clone(),
            comment: update_comment(timestamp),
            tags: record.tags.clone(),
            ttl: AUTO_TTL,
        }
    }
}

/// Comment written on every updated record.
pub fn update_comment(timestamp: i64) -> String {
    format!(
        "Update by {} script on {}.",
        env!("CARGO_PKG_NAME"),
        timestamp
    )
}

/// The two provider operations an update run needs.
#[async_trait]
pub trait DnsRecordClient: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// List every record in the zone, in provider order.
    async fn list_records(&self, zone_id: &str, api_key: &str) -> Result<Vec<DnsRecord>>;

    /// Overwrite the mutable fields of one record.
    async fn update_record(
        &self,
        zone_id: &str,
        api_key: &str,
        record_id: &str,
        update: &DnsRecordUpdate,
    ) -> Result<()>;
}
