//! Cloudflare API v4 record client.

use super::{null_as_default, DnsRecord, DnsRecordClient, DnsRecordUpdate};
use crate::config::DEFAULT_BASE_URL;
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;

const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per page when listing a zone.
const PER_PAGE: u32 = 100;

/// Same set `encodeURIComponent` escapes: everything but alphanumerics and `-_.!~*'()`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Cloudflare DNS record client.
pub struct CloudflareClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CloudflareResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    errors: Vec<CloudflareError>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

/// Only the success flag, so a failure is seen whatever shape the rest has.
#[derive(Debug, Deserialize)]
struct ApiStatus {
    success: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CloudflareError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    page: u32,
    total_pages: u32,
}

impl CloudflareResponse {
    fn error_message(&self) -> Option<String> {
        self.errors.first().map(|e| match (e.message.is_empty(), e.code) {
            (false, Some(code)) => format!("{} (code {})", e.message, code),
            (false, None) => e.message.clone(),
            (true, Some(code)) => format!("error code {}", code),
            (true, None) => "unknown error".to_string(),
        })
    }
}

/// True when the body carries an explicit `success: false`.
fn reports_failure(body: &str) -> bool {
    serde_json::from_str::<ApiStatus>(body).is_ok_and(|s| s.success == Some(false))
}

fn error_detail(body: &str) -> Option<String> {
    serde_json::from_str::<CloudflareResponse>(body)
        .ok()
        .and_then(|r| r.error_message())
}

impl CloudflareClient {
    /// Create a client against the public Cloudflare API.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create with custom base URL (for testing or API proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(API_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `{base}/client/v4/zones/{zone_id}/dns_records`
    pub fn records_url(&self, zone_id: &str) -> String {
        format!(
            "{}/client/v4/zones/{}/dns_records",
            self.base_url,
            encode_segment(zone_id)
        )
    }

    /// `{base}/client/v4/zones/{zone_id}/dns_records/{record_id}`
    pub fn record_url(&self, zone_id: &str, record_id: &str) -> String {
        format!(
            "{}/{}",
            self.records_url(zone_id),
            encode_segment(record_id)
        )
    }

    fn request(&self, method: Method, url: &str, api_key: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .header(CONTENT_TYPE, "application/json")
    }

    async fn list_page(&self, url: &str, api_key: &str, page: u32) -> Result<CloudflareResponse> {
        tracing::debug!("GET {} (page {})", url, page);

        let response = self
            .request(Method::GET, url, api_key)
            .query(&[("page", page), ("per_page", PER_PAGE)])
            .send()
            .await
            .map_err(|e| DdnsError::ListUnknown(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DdnsError::ListUnknown(e.to_string()))?;

        if !status.is_success() {
            return Err(DdnsError::ListUnknown(match error_detail(&body) {
                Some(msg) => format!("HTTP {}: {}", status, msg),
                None => format!("HTTP {}", status),
            }));
        }

        if reports_failure(&body) {
            return Err(DdnsError::ListUnknown(
                error_detail(&body).unwrap_or_else(|| "API reported failure".to_string()),
            ));
        }

        serde_json::from_str(&body).map_err(|e| DdnsError::ListParse(e.to_string()))
    }
}

/// Percent-encode one path parameter.
fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

#[async_trait]
impl DnsRecordClient for CloudflareClient {
    fn name(&self) -> &'static str {
        "cloudflare"
    }

    async fn list_records(&self, zone_id: &str, api_key: &str) -> Result<Vec<DnsRecord>> {
        let url = self.records_url(zone_id);
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let response = self.list_page(&url, api_key, page).await?;

            // A server that ignores `page` would otherwise be asked forever.
            if let Some(info) = &response.result_info {
                if page > 1 && info.page != page {
                    tracing::warn!(
                        "Asked for page {} of the record listing but got page {}, stopping",
                        page,
                        info.page
                    );
                    break;
                }
            }

            let result = match response.result {
                Some(result @ serde_json::Value::Array(_)) => result,
                _ => {
                    return Err(DdnsError::ListParse(
                        "response has no `result` array".to_string(),
                    ))
                }
            };
            let batch: Vec<DnsRecord> =
                serde_json::from_value(result).map_err(|e| DdnsError::ListParse(e.to_string()))?;
            let fetched = batch.len();
            records.extend(batch);

            match response.result_info {
                Some(info) if page < info.total_pages && fetched > 0 => page += 1,
                _ => break,
            }
        }

        Ok(records)
    }

    async fn update_record(
        &self,
        zone_id: &str,
        api_key: &str,
        record_id: &str,
        update: &DnsRecordUpdate,
    ) -> Result<()> {
        let url = self.record_url(zone_id, record_id);
        tracing::debug!("PUT {} content={} ttl={}", url, update.content, update.ttl);

        let failed = |reason: String| DdnsError::UpdateUnknown {
            name: update.name.clone(),
            reason,
        };

        let response = self
            .request(Method::PUT, &url, api_key)
            .json(update)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        // A 2xx with an unreadable or non-JSON body still counts as success.
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(failed(match error_detail(&body) {
                Some(msg) => format!("HTTP {}: {}", status, msg),
                None => format!("HTTP {}", status),
            }));
        }

        if reports_failure(&body) {
            return Err(failed(
                error_detail(&body).unwrap_or_else(|| "API reported failure".to_string()),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod url_tests {
    use super::*;

    #[test]
    fn test_records_url() {
        let client = CloudflareClient::with_base_url("https://api.example.test/").unwrap();
        assert_eq!(
            client.records_url("zone-123"),
            "https://api.example.test/client/v4/zones/zone-123/dns_records"
        );
    }

    #[test]
    fn test_path_parameters_are_encoded() {
        let client = CloudflareClient::with_base_url("https://api.example.test").unwrap();
        assert_eq!(
            client.record_url("a/b", "id?x=1 #"),
            "https://api.example.test/client/v4/zones/a%2Fb/dns_records/id%3Fx%3D1%20%23"
        );
    }

    #[test]
    fn test_unreserved_characters_kept() {
        assert_eq!(encode_segment("Az09-_.!~*'()"), "Az09-_.!~*'()");
    }
}
