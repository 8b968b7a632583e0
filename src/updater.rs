//! Update orchestration: load config, resolve the IP once, list the zone,
//! then rewrite each record in provider order.

use crate::config::Config;
use crate::detector::IpDetector;
use crate::error::Result;
use crate::providers::{CloudflareClient, DnsRecord, DnsRecordClient, DnsRecordUpdate};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Result of updating a single record.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// Record name.
    pub name: String,
    /// Record type (A, AAAA, ...).
    pub record_type: String,
    /// Whether the update was successful.
    pub success: bool,
    /// Error message if failed.
    pub error: Option<String>,
    /// When the update was attempted.
    pub timestamp: DateTime<Utc>,
}

/// Summary of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// IP every record was pointed at.
    pub ip: String,
    /// Number of records listed in the zone.
    pub fetched: usize,
    /// One entry per attempted update, in processing order.
    pub outcomes: Vec<RecordOutcome>,
}

impl RunReport {
    pub fn updated(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.updated()
    }
}

/// Drives one update run against a zone.
pub struct Updater {
    config: Config,
    detector: IpDetector,
    client: Box<dyn DnsRecordClient>,
}

impl Updater {
    pub fn new(config: Config, detector: IpDetector, client: Box<dyn DnsRecordClient>) -> Self {
        Self {
            config,
            detector,
            client,
        }
    }

    /// Wire up the IP detector and Cloudflare client the config points at.
    pub fn from_config(config: Config) -> Result<Self> {
        let detector = IpDetector::with_service(config.ip_service.clone())?;
        let client = CloudflareClient::with_base_url(config.base_url.clone())?;
        Ok(Self::new(config, detector, Box::new(client)))
    }

    /// Resolve the IP, list the zone and update every record.
    ///
    /// IP and listing failures abort the run. A failed record update is
    /// logged and recorded in the report, and the next record is processed.
    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("Fetching external IP from {}...", self.detector.service());
        let ip = self.detector.detect().await?;
        tracing::info!("External IP is {}", ip);

        tracing::info!("Fetching records from {}...", self.client.name());
        let records = self
            .client
            .list_records(&self.config.zone_id, &self.config.api_key)
            .await?;
        tracing::info!("Finished fetching {} record(s).", records.len());

        let mut report = RunReport {
            ip,
            fetched: records.len(),
            outcomes: Vec::with_capacity(records.len()),
        };

        if records.is_empty() {
            tracing::info!("There were no records to update.");
            return Ok(report);
        }

        // One at a time: providers rate-limit bursts.
        for record in &records {
            let outcome = self.update_one(record, &report.ip).await;
            report.outcomes.push(outcome);
        }

        if report.failed() == 0 {
            tracing::info!("All records updated!");
        } else {
            tracing::warn!(
                "Updated {} of {} record(s), {} failed.",
                report.updated(),
                report.fetched,
                report.failed()
            );
        }

        Ok(report)
    }

    async fn update_one(&self, record: &DnsRecord, ip: &str) -> RecordOutcome {
        tracing::info!("Attempting to update record \"{}\"...", record.name);

        let timestamp = Utc::now();
        let update = DnsRecordUpdate::for_record(record, ip, timestamp.timestamp());
        let result = self
            .client
            .update_record(
                &self.config.zone_id,
                &self.config.api_key,
                &record.id,
                &update,
            )
            .await;

        let error = match result {
            Ok(()) => {
                tracing::info!("Successfully updated record \"{}\"!", record.name);
                None
            }
            Err(e) => {
                tracing::error!("{}", e);
                Some(e.to_string())
            }
        };

        RecordOutcome {
            name: record.name.clone(),
            record_type: record.record_type.clone(),
            success: error.is_none(),
            error,
            timestamp,
        }
    }
}

/// Run a full update using the config file at `config_path`.
///
/// The config is loaded before any network client is built, so a bad
/// config never causes a request.
pub async fn run(config_path: &Path) -> Result<RunReport> {
    tracing::info!("Loading config from {}...", config_path.display());
    let config = Config::load_from(config_path)?;
    tracing::info!("Successfully loaded config!");

    Updater::from_config(config)?.run().await
}
