use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

/// Reads an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Canonical event record written by the extractor and read back by the normalizer.
///
/// Every field defaults on read so that hand-edited or partial files still load.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Event {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String, // <venue>-<slugged title>-<unix start or 0>
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    pub image: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<DateTime<FixedOffset>>,
    #[serde(rename = "endDate")]
    pub end_date: Option<DateTime<FixedOffset>>,
    #[serde(deserialize_with = "null_as_default")]
    pub season: String,
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub location: String,
    pub venue: Option<Venue>,
    #[serde(rename = "sourceURL", deserialize_with = "null_as_default")]
    pub source_url: String,
    #[serde(rename = "officialWebsite")]
    pub official_website: Option<String>,
    #[serde(rename = "ticketURL")]
    pub ticket_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Venue {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(deserialize_with = "null_as_default")]
    pub country: String,
    pub coordinates: Option<Coordinates>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl Event {
    pub fn display_title(&self) -> &str {
        if !self.title.is_empty() {
            &self.title
        } else if !self.name.is_empty() {
            &self.name
        } else {
            "Untitled Event"
        }
    }
}
