use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Everything the pipeline needs to know about the one venue it scrapes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VenueProfile {
    /// Prefix for generated event ids.
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Tz,
    pub base_url: String,
    pub listing_path: String,
    pub event_path_prefix: String,
    /// Substring identifying links to the venue's ticketing site.
    pub ticket_host: String,
    pub source_tag: String,
    pub base_categories: Vec<String>,
}

impl VenueProfile {
    pub fn fortune_sound() -> Self {
        Self {
            id: "fortunesound".to_string(),
            name: "Fortune Sound Club".to_string(),
            address: "147 East Pender Street, Vancouver, BC, V6A 1T6, Canada".to_string(),
            city: "Vancouver".to_string(),
            state: "BC".to_string(),
            country: "Canada".to_string(),
            latitude: 49.280528,
            longitude: -123.100751,
            timezone: chrono_tz::America::Vancouver,
            base_url: "https://www.fortunesoundclub.com".to_string(),
            listing_path: "/events".to_string(),
            event_path_prefix: "/events/".to_string(),
            ticket_host: "on.fortunesoundclub.com".to_string(),
            source_tag: "FortuneSound".to_string(),
            base_categories: vec![
                "music".to_string(),
                "concert".to_string(),
                "nightlife".to_string(),
            ],
        }
    }

    pub fn listing_url(&self) -> String {
        self.page_url(&self.listing_path)
    }

    pub fn page_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Default for VenueProfile {
    fn default() -> Self {
        Self::fortune_sound()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RequestHeaders {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
}

impl Default for RequestHeaders {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrapeConfig {
    pub venue: VenueProfile,
    pub request_delay_ms: u64,
    pub headers: RequestHeaders,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            venue: VenueProfile::default(),
            request_delay_ms: 1000,
            headers: RequestHeaders::default(),
        }
    }
}

impl ScrapeConfig {
    /// Built-in defaults when no path is given, otherwise the JSON file layered over them.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => read_config(path),
            None => Ok(Self::default()),
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

fn read_config(path: &Path) -> Result<ScrapeConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("unable to read config {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid config {}", path.display()))
}
