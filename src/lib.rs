//! # cloudflare-update-dns
//!
//! Points every DNS record in a Cloudflare zone at the caller's current
//! public IP address.
//!
//! ## How a run works
//!
//! 1. Load `API_KEY` and `ZONE_ID` from a JSON (or TOML) config file
//! 2. Ask a plain-text echo service for the external IP, once
//! 3. List every record in the zone
//! 4. Overwrite each record in turn with the new IP, an automatic TTL and a
//!    timestamped comment; a failed record is reported and skipped
//!
//! Runs are stateless and meant to be triggered by an external scheduler.
//!
//! ## Usage
//!
//! ```bash
//! # Use ./config.json (or the user/system config dir)
//! cloudflare-update-dns
//!
//! # Use an explicit config
//! cloudflare-update-dns -c /path/to/config.json
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod providers;
pub mod updater;

pub use config::Config;
pub use detector::IpDetector;
pub use error::{DdnsError, Result};
pub use updater::{run, RunReport, Updater};
