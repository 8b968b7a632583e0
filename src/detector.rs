//! Public IP detection.

use crate::config::DEFAULT_IP_SERVICE;
use crate::error::{DdnsError, Result};
use std::net::IpAddr;
use std::time::Duration;

const DETECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves the caller's external IP from a plain-text echo service.
pub struct IpDetector {
    client: reqwest::Client,
    service: String,
}

impl IpDetector {
    /// Create a detector against the default echo service.
    pub fn new() -> Result<Self> {
        Self::with_service(DEFAULT_IP_SERVICE)
    }

    /// Create a detector against a custom echo service.
    pub fn with_service(service: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DETECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            service: service.into(),
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Fetch the external IP as text, trimmed of surrounding whitespace.
    ///
    /// One attempt only. The body is not validated beyond being non-empty.
    pub async fn detect(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.service)
            .send()
            .await
            .map_err(|e| DdnsError::IpRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DdnsError::IpRequest(format!(
                "HTTP {} from {}",
                status, self.service
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| DdnsError::IpRequest(e.to_string()))?;
        let ip = text.trim();

        if ip.is_empty() {
            return Err(DdnsError::IpParse(format!(
                "empty response from {}",
                self.service
            )));
        }

        if ip.parse::<IpAddr>().is_err() {
            tracing::warn!("{} returned {:?}, which is not an IP literal", self.service, ip);
        }

        tracing::debug!("Detected IP {} from {}", ip, self.service);
        Ok(ip.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn detector_for(server: &MockServer) -> IpDetector {
        IpDetector::with_service(format!("{}/ip", server.uri())).unwrap()
    }

    #[test]
    fn test_default_service() {
        let detector = IpDetector::new().unwrap();
        assert_eq!(detector.service(), DEFAULT_IP_SERVICE);
    }

    #[tokio::test]
    async fn test_detect_returns_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.7"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let ip = detector_for(&mock_server).detect().await.unwrap();
        assert_eq!(ip, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_detect_trims_whitespace() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  2001:db8::1\n"))
            .mount(&mock_server)
            .await;

        let ip = detector_for(&mock_server).detect().await.unwrap();
        assert_eq!(ip, "2001:db8::1");
    }

    #[tokio::test]
    async fn test_detect_empty_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&mock_server)
            .await;

        let result = detector_for(&mock_server).detect().await;
        assert!(matches!(result, Err(DdnsError::IpParse(_))));
    }

    #[tokio::test]
    async fn test_detect_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = detector_for(&mock_server).detect().await;
        assert!(matches!(result, Err(DdnsError::IpRequest(_))));
    }

    #[tokio::test]
    async fn test_detect_connection_refused() {
        // Nothing listens on the discard port.
        let detector = IpDetector::with_service("http://127.0.0.1:9/").unwrap();
        let result = detector.detect().await;
        assert!(matches!(result, Err(DdnsError::IpRequest(_))));
    }
}
