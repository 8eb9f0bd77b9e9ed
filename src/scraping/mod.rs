pub mod base;
pub mod classify;
pub mod dates;
pub mod squarespace_html;

use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::models::Event;
use crate::utils;

pub use squarespace_html::Extractor;

/// Source of raw page HTML. The live implementation is [`base::HttpFetcher`].
pub trait PageFetcher {
    fn fetch_html(&self, url: &str) -> Result<String>;
}

/// Why a single event page was skipped. The batch keeps going after any of these.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },
}

/// Writes the records as a bare, pretty-printed JSON array, replacing `path`.
pub fn persist(events: &[Event], path: &Path) -> Result<()> {
    utils::write_json_pretty(path, events)
        .with_context(|| format!("unable to write events to {}", path.display()))?;
    tracing::info!(count = events.len(), path = %path.display(), "saved events");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Venue;

    #[test]
    fn persist_writes_bare_array() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("events.json");
        std::fs::write(&path, "stale").expect("seed file");

        let event = Event {
            id: "fortunesound-a-0".into(),
            title: "A".into(),
            venue: Some(Venue::default()),
            ..Event::default()
        };
        persist(&[event.clone()], &path).expect("persist");

        let raw = std::fs::read_to_string(&path).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        let items = value.as_array().expect("top level array");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "fortunesound-a-0");
        assert!(items[0]["startDate"].is_null());

        let back: Vec<Event> = serde_json::from_str(&raw).expect("round trip");
        assert_eq!(back, vec![event]);
    }

    #[test]
    fn persist_empty_list() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("events.json");
        persist(&[], &path).expect("persist");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "[]");
    }
}
