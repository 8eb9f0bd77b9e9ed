use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use scraper::{ElementRef, Html, Selector};

use super::{classify, PageFetcher};
use crate::config::{RequestHeaders, VenueProfile};
use crate::models::{Coordinates, Event, Venue};

pub fn clean_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// Each non-empty text node under `element`, trimmed, in document order.
pub fn text_segments(element: ElementRef<'_>) -> Vec<String> {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(inner_text)
        .filter(|text| !text.is_empty())
}

pub fn first_attr(document: &Html, selector: &Selector, attr: &str) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}

pub fn absolute_url(base: &str, href: Option<String>) -> Option<String> {
    let href = href?;
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href);
    }
    let base_url = reqwest::Url::parse(base).ok()?;
    base_url.join(&href).ok().map(|u| u.to_string())
}

/// Lowercases and replaces every non-alphanumeric character with `-`, one for one.
pub fn slug(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Blocking session reused for every request in a run.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(headers: &RequestHeaders) -> Result<Self> {
        let mut defaults = HeaderMap::new();
        defaults.insert(
            USER_AGENT,
            HeaderValue::from_str(&headers.user_agent).context("invalid user agent header")?,
        );
        defaults.insert(
            ACCEPT,
            HeaderValue::from_str(&headers.accept).context("invalid accept header")?,
        );
        defaults.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&headers.accept_language)
                .context("invalid accept-language header")?,
        );

        let client = Client::builder()
            .default_headers(defaults)
            .cookie_store(true)
            .build()
            .context("unable to build http client")?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request failed for {url}"))?;
        let response = response
            .error_for_status()
            .with_context(|| format!("non-success status for {url}"))?;
        response
            .text()
            .with_context(|| format!("unable to read response body for {url}"))
    }
}

pub fn to_timezone_datetime(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<FixedOffset>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.fixed_offset()),
        LocalResult::Ambiguous(dt, _) => Some(dt.fixed_offset()),
        LocalResult::None => None,
    }
}

pub fn event_id(venue: &VenueProfile, title: &str, start: Option<&DateTime<FixedOffset>>) -> String {
    let stamp = start
        .map(|dt| dt.timestamp().to_string())
        .unwrap_or_else(|| "0".to_string());
    format!("{}-{}-{}", venue.id, slug(title), stamp)
}

pub fn venue_record(venue: &VenueProfile) -> Venue {
    Venue {
        name: venue.name.clone(),
        address: venue.address.clone(),
        city: venue.city.clone(),
        state: venue.state.clone(),
        country: venue.country.clone(),
        coordinates: Some(Coordinates {
            lat: Some(venue.latitude),
            lng: Some(venue.longitude),
        }),
    }
}

/// Fields scraped from one event page, before derived values are filled in.
#[derive(Debug, Default, Clone)]
pub struct PageFields {
    pub title: String,
    pub description: String,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub ticket_url: Option<String>,
    pub image_url: Option<String>,
}

pub fn build_event(venue: &VenueProfile, page_url: &str, fields: PageFields) -> Event {
    let categories = classify::categories(
        &venue.base_categories,
        &fields.title,
        &fields.description,
    );
    let category = categories.first().cloned().unwrap_or_default();
    let season = classify::season(fields.start.as_ref());

    Event {
        id: event_id(venue, &fields.title, fields.start.as_ref()),
        name: fields.title.clone(),
        title: fields.title,
        description: fields.description,
        image: fields.image_url,
        date: fields.start.map(|dt| dt.to_rfc3339()),
        start_date: fields.start,
        end_date: fields.end,
        season: season.to_string(),
        category,
        categories,
        location: venue.name.clone(),
        venue: Some(venue_record(venue)),
        source_url: venue.listing_url(),
        official_website: Some(page_url.to_string()),
        ticket_url: fields.ticket_url,
    }
}
