use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::VenueProfile;
use crate::models::{Coordinates, Event, Venue};
use crate::scraping::base;
use crate::utils;

const DEFAULT_CATEGORY: &str = "music";
const DEFAULT_SEASON: &str = "year-round";
const NAIVE_TIMESTAMP_PATTERNS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("unable to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid event json in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unable to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// GeoJSON point; `coordinates` is `[longitude, latitude]`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [lng, lat],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConsumerVenue {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub location: Option<GeoPoint>,
}

/// Event shape expected by the app database.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConsumerEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<DateTime<FixedOffset>>,
    #[serde(rename = "endDate")]
    pub end_date: Option<DateTime<FixedOffset>>,
    pub season: String,
    pub category: String,
    pub categories: Vec<String>,
    pub venue: ConsumerVenue,
    pub url: Option<String>,
    #[serde(rename = "ticketUrl")]
    pub ticket_url: Option<String>,
    #[serde(rename = "sourceUrl")]
    pub source_url: String,
    pub source: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConvertedBatch {
    pub events: Vec<ConsumerEvent>,
    pub count: usize,
    pub source: String,
    pub processed_at: DateTime<Utc>,
}

/// Truthiness test carried over from the upstream data: zero and NaN count as missing.
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

fn location(coordinates: Option<&Coordinates>) -> Option<GeoPoint> {
    let coordinates = coordinates?;
    let lat = present(coordinates.lat)?;
    let lng = present(coordinates.lng)?;
    Some(GeoPoint::new(lat, lng))
}

fn parse_naive_timestamp(text: &str) -> Option<NaiveDateTime> {
    NAIVE_TIMESTAMP_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(text.trim(), pattern).ok())
}

fn or_default(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Remaps canonical records into [`ConsumerEvent`]s, filling gaps from a venue profile.
pub struct Normalizer {
    defaults: VenueProfile,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(VenueProfile::fortune_sound())
    }
}

impl Normalizer {
    pub fn new(defaults: VenueProfile) -> Self {
        Self { defaults }
    }

    fn venue(&self, venue: Option<&Venue>) -> ConsumerVenue {
        let defaults = &self.defaults;
        match venue {
            Some(venue) => ConsumerVenue {
                name: or_default(&venue.name, &defaults.name),
                address: or_default(&venue.address, &defaults.address),
                city: or_default(&venue.city, &defaults.city),
                state: or_default(&venue.state, &defaults.state),
                country: or_default(&venue.country, &defaults.country),
                location: location(venue.coordinates.as_ref()),
            },
            None => ConsumerVenue {
                name: defaults.name.clone(),
                address: defaults.address.clone(),
                city: defaults.city.clone(),
                state: defaults.state.clone(),
                country: defaults.country.clone(),
                location: None,
            },
        }
    }

    /// Total: every missing field has a default. `converted_at` stamps both
    /// bookkeeping timestamps.
    pub fn convert(&self, event: &Event, converted_at: DateTime<Utc>) -> ConsumerEvent {
        let title = event.display_title().to_string();
        let id = if event.id.is_empty() {
            base::event_id(&self.defaults, &title, event.start_date.as_ref())
        } else {
            event.id.clone()
        };
        let category = if event.category.is_empty() {
            event
                .categories
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
        } else {
            event.category.clone()
        };

        ConsumerEvent {
            id,
            title,
            description: event.description.clone(),
            image: event.image.clone(),
            start_date: event.start_date,
            end_date: event.end_date,
            season: or_default(&event.season, DEFAULT_SEASON),
            category,
            categories: event.categories.clone(),
            venue: self.venue(event.venue.as_ref()),
            url: event.official_website.clone(),
            ticket_url: event.ticket_url.clone(),
            source_url: or_default(&event.source_url, &self.defaults.listing_url()),
            source: self.defaults.source_tag.clone(),
            active: true,
            created_at: converted_at,
            updated_at: converted_at,
        }
    }

    /// Rewrites offset-less `startDate`/`endDate` strings (as written by older
    /// producers) into RFC 3339 in the venue timezone. Unreadable values become null.
    fn localize_timestamps(&self, record: &mut Value) {
        for key in ["startDate", "endDate"] {
            let Some(slot) = record.get_mut(key) else {
                continue;
            };
            let Some(text) = slot.as_str().map(str::to_string) else {
                continue;
            };
            if DateTime::parse_from_rfc3339(&text).is_ok() {
                continue;
            }
            *slot = match parse_naive_timestamp(&text)
                .and_then(|naive| base::to_timezone_datetime(naive, self.defaults.timezone))
            {
                Some(dt) => Value::String(dt.to_rfc3339()),
                None => {
                    tracing::warn!(field = key, value = %text, "dropping unreadable timestamp");
                    Value::Null
                }
            };
        }
    }

    /// Reads a JSON array of canonical records from `input` and writes the
    /// wrapped consumer batch to `output`. Returns the number of events written.
    pub fn convert_batch(&self, input: &Path, output: &Path) -> Result<usize, NormalizeError> {
        let raw = fs::read_to_string(input).map_err(|source| NormalizeError::Read {
            path: input.to_path_buf(),
            source,
        })?;
        let parse_error = |source| NormalizeError::Parse {
            path: input.to_path_buf(),
            source,
        };
        let records: Vec<Value> = serde_json::from_str(&raw).map_err(parse_error)?;
        let events = records
            .into_iter()
            .map(|mut record| {
                self.localize_timestamps(&mut record);
                serde_json::from_value::<Event>(record)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(parse_error)?;
        tracing::info!(count = events.len(), path = %input.display(), "loaded events");

        let processed_at = Utc::now();
        let converted: Vec<ConsumerEvent> = events
            .iter()
            .map(|event| self.convert(event, processed_at))
            .collect();
        let batch = ConvertedBatch {
            count: converted.len(),
            events: converted,
            source: self.defaults.source_tag.clone(),
            processed_at,
        };

        utils::write_json_pretty(output, &batch).map_err(|source| NormalizeError::Write {
            path: output.to_path_buf(),
            source,
        })?;
        tracing::info!(count = batch.count, path = %output.display(), "wrote converted events");
        Ok(batch.count)
    }
}
