use std::thread;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::base::{self, PageFields};
use super::{dates, ExtractError, PageFetcher};
use crate::config::{ScrapeConfig, VenueProfile};
use crate::models::Event;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("squarespace link selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1").expect("squarespace title selector"));
static DATE_META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".eventitem-meta-date").expect("squarespace date selector"));
static CONTENT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".sqs-html-content").expect("squarespace content selector"));
static DESCRIPTION_PART_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, h2, h3, h4").expect("squarespace description selector"));
static CONTENT_IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".sqs-block-image img[data-src]").expect("squarespace content image selector")
});
static ANY_IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[data-src]").expect("squarespace image selector"));

type Timestamp = DateTime<FixedOffset>;

const UNKNOWN_TITLE: &str = "Unknown Event";
const TICKET_LINK_TEXT: &str = "buy tickets";

/// Scrapes a single venue's Squarespace events collection: one listing page
/// plus one detail page per event.
pub struct Extractor<F> {
    fetcher: F,
    config: ScrapeConfig,
}

impl<F: PageFetcher> Extractor<F> {
    pub fn new(fetcher: F, config: ScrapeConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn venue(&self) -> &VenueProfile {
        &self.config.venue
    }

    /// Absolute URLs of every event page linked from the listing, first-seen order.
    /// A listing fetch failure is fatal for the run.
    pub fn discover_event_urls(&self) -> Result<Vec<String>> {
        let listing_url = self.venue().listing_url();
        let html = self.fetcher.fetch_html(&listing_url)?;
        let urls: Vec<String> = self
            .parse_listing(&html)
            .into_iter()
            .map(|path| self.venue().page_url(&path))
            .collect();
        tracing::info!(count = urls.len(), "found event links");
        Ok(urls)
    }

    pub fn extract_event(&self, url: &str) -> Result<Event, ExtractError> {
        tracing::info!(url, "scraping event");
        let html = self
            .fetcher
            .fetch_html(url)
            .map_err(|err| ExtractError::Fetch {
                url: url.to_string(),
                message: format!("{err:#}"),
            })?;
        Ok(self.parse_event_page(url, &html))
    }

    /// Discovers and extracts every event, pausing between requests.
    /// Pages that fail are logged and left out of the result.
    pub fn run_batch(&self) -> Result<Vec<Event>> {
        let urls = self.discover_event_urls()?;
        let total = urls.len();
        let mut events = Vec::with_capacity(total);

        for (index, url) in urls.iter().enumerate() {
            thread::sleep(self.config.request_delay());
            tracing::info!(index = index + 1, total, url = %url, "processing event");
            match self.extract_event(url) {
                Ok(event) => events.push(event),
                Err(err) => tracing::error!(error = %err, "skipping event"),
            }
        }

        tracing::info!(
            scraped = events.len(),
            skipped = total - events.len(),
            venue = %self.venue().name,
            "batch complete"
        );
        Ok(events)
    }

    /// Raw hrefs under the event prefix, excluding the bare prefix, deduplicated.
    pub(crate) fn parse_listing(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let prefix = self.venue().event_path_prefix.as_str();
        let mut paths: Vec<String> = Vec::new();

        for link in document.select(&LINK_SELECTOR) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if !href.starts_with(prefix) || href == prefix {
                continue;
            }
            if !paths.iter().any(|seen| seen == href) {
                paths.push(href.to_string());
            }
        }

        paths
    }

    pub(crate) fn parse_event_page(&self, url: &str, html: &str) -> Event {
        let document = Html::parse_document(html);
        let venue = self.venue();

        let title = base::first_text(&document, &TITLE_SELECTOR)
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        let (start, end) = self.event_times(&document);

        let fields = PageFields {
            title,
            description: description(&document),
            start,
            end,
            ticket_url: base::absolute_url(url, self.ticket_link(&document)),
            image_url: base::absolute_url(url, image_source(&document)),
        };
        base::build_event(venue, url, fields)
    }

    /// Start and end from the date meta blocks. Needs four text segments:
    /// start date, start time, end date, end time.
    fn event_times(&self, document: &Html) -> (Option<Timestamp>, Option<Timestamp>) {
        let segments: Vec<String> = document
            .select(&DATE_META_SELECTOR)
            .flat_map(base::text_segments)
            .collect();
        if segments.len() < 4 {
            return (None, None);
        }

        let tz = self.venue().timezone;
        (
            dates::parse_date_time(&segments[0], &segments[1], tz),
            dates::parse_date_time(&segments[2], &segments[3], tz),
        )
    }

    fn ticket_link(&self, document: &Html) -> Option<String> {
        let by_text = document.select(&LINK_SELECTOR).find(|link| {
            base::inner_text(*link)
                .to_lowercase()
                .contains(TICKET_LINK_TEXT)
        });
        let ticket_host = self.venue().ticket_host.as_str();
        by_text
            .or_else(|| {
                document.select(&LINK_SELECTOR).find(|link| {
                    link.value()
                        .attr("href")
                        .is_some_and(|href| href.contains(ticket_host))
                })
            })
            .and_then(|link| link.value().attr("href"))
            .map(str::to_string)
    }
}

fn description(document: &Html) -> String {
    let Some(content) = document.select(&CONTENT_SELECTOR).next() else {
        return String::new();
    };
    content
        .select(&DESCRIPTION_PART_SELECTOR)
        .map(base::inner_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn image_source(document: &Html) -> Option<String> {
    base::first_attr(document, &CONTENT_IMAGE_SELECTOR, "data-src")
        .or_else(|| base::first_attr(document, &ANY_IMAGE_SELECTOR, "data-src"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use anyhow::anyhow;
    use chrono::{Datelike, Timelike};

    const LISTING_URL: &str = "https://www.fortunesoundclub.com/events";
    const EVENT_URL: &str = "https://www.fortunesoundclub.com/events/techno-night";

    const LISTING_HTML: &str = r#"
    <html><body>
        <nav><a href="/events/">All events</a><a href="/about">About</a></nav>
        <article class="eventlist-event">
            <a href="/events/techno-night" class="eventlist-column-thumbnail"><img data-src="/thumb.jpg"></a>
            <h1 class="eventlist-title"><a href="/events/techno-night">Techno Night</a></h1>
        </article>
        <article class="eventlist-event">
            <a href="/events/jazz-brunch">Jazz Brunch</a>
            <a href="/events/jazz-brunch">View Event</a>
        </article>
        <article class="eventlist-event">
            <a href="https://elsewhere.example/events/other">Elsewhere</a>
            <a href="/events/hip-hop-friday">Hip Hop Friday</a>
            <a href="/events/techno-night">Techno Night again</a>
        </article>
        <a>no target</a>
    </body></html>
    "#;

    const EVENT_HTML: &str = r#"
    <html><body>
        <header><img data-src="https://images.example/logo.png"></header>
        <article class="eventitem">
            <h1 class="eventitem-title">  Techno   Night </h1>
            <ul class="eventitem-meta event-meta-date-time">
                <li class="eventitem-meta-item eventitem-meta-date">
                    <time class="event-date">Friday, June 272025</time>
                    <time class="event-time-12hr-start">10:00 p.m.</time>
                </li>
                <li class="eventitem-meta-item eventitem-meta-date">
                    <time class="event-date">Saturday, June 28, 2025</time>
                    <time class="event-time-12hr-end">3:00 a.m.</time>
                </li>
            </ul>
            <div class="sqs-html-content">
                <h2>All night long</h2>
                <p>Warehouse sounds in Chinatown.</p>
                <p>   </p>
                <h4>19+ with ID</h4>
            </div>
            <div class="sqs-block-image"><img data-src="https://images.example/flyer.jpg" alt="flyer"></div>
            <a href="https://on.fortunesoundclub.com/e/other">Guestlist</a>
            <a href="https://on.fortunesoundclub.com/e/techno-night"><span>BUY TICKETS</span></a>
        </article>
    </body></html>
    "#;

    const SPARSE_HTML: &str = r#"
    <html><body>
        <ul><li class="eventitem-meta-date"><time>Friday, June 27, 2025</time><time>10:00 p.m.</time></li></ul>
        <a href="/contact">Contact</a>
    </body></html>
    "#;

    struct FakeSite {
        pages: HashMap<String, String>,
    }

    impl FakeSite {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
            }
        }
    }

    impl PageFetcher for FakeSite {
        fn fetch_html(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("404 for {url}"))
        }
    }

    fn quiet_config() -> ScrapeConfig {
        ScrapeConfig {
            request_delay_ms: 0,
            ..ScrapeConfig::default()
        }
    }

    fn extractor(pages: &[(&str, &str)]) -> Extractor<FakeSite> {
        Extractor::new(FakeSite::new(pages), quiet_config())
    }

    #[test]
    fn listing_links_are_unique_and_ordered() {
        let scraper = extractor(&[]);
        assert_eq!(
            scraper.parse_listing(LISTING_HTML),
            vec![
                "/events/techno-night".to_string(),
                "/events/jazz-brunch".to_string(),
                "/events/hip-hop-friday".to_string(),
            ]
        );
    }

    #[test]
    fn discover_returns_absolute_urls() {
        let scraper = extractor(&[(LISTING_URL, LISTING_HTML)]);
        let urls = scraper.discover_event_urls().expect("discover");
        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], EVENT_URL);
    }

    #[test]
    fn discover_without_links_is_empty() {
        let scraper = extractor(&[(LISTING_URL, SPARSE_HTML)]);
        assert!(scraper.discover_event_urls().expect("discover").is_empty());
    }

    #[test]
    fn discover_propagates_listing_failure() {
        let scraper = extractor(&[]);
        assert!(scraper.discover_event_urls().is_err());
        assert!(scraper.run_batch().is_err());
    }

    #[test]
    fn parses_event_page() {
        let scraper = extractor(&[]);
        let event = scraper.parse_event_page(EVENT_URL, EVENT_HTML);

        assert_eq!(event.title, "Techno Night");
        assert_eq!(event.name, "Techno Night");
        assert_eq!(
            event.description,
            "All night long\nWarehouse sounds in Chinatown.\n19+ with ID"
        );
        assert_eq!(
            event.ticket_url.as_deref(),
            Some("https://on.fortunesoundclub.com/e/techno-night")
        );
        assert_eq!(
            event.image.as_deref(),
            Some("https://images.example/flyer.jpg")
        );
        assert_eq!(event.official_website.as_deref(), Some(EVENT_URL));

        let start = event.start_date.expect("start parsed");
        assert_eq!((start.year(), start.month(), start.day()), (2025, 6, 27));
        assert_eq!(start.hour(), 22);
        let end = event.end_date.expect("end parsed");
        assert_eq!((end.day(), end.hour()), (28, 3));

        assert_eq!(event.season, "summer");
        assert_eq!(
            event.categories,
            vec!["music", "concert", "nightlife", "electronic"]
        );
        assert_eq!(event.category, "music");
        assert_eq!(
            event.id,
            format!("fortunesound-techno-night-{}", start.timestamp())
        );
        assert_eq!(event.date, Some(start.to_rfc3339()));
    }

    #[test]
    fn sparse_page_uses_fallbacks() {
        let scraper = extractor(&[]);
        let event = scraper.parse_event_page(EVENT_URL, SPARSE_HTML);

        assert_eq!(event.title, "Unknown Event");
        assert_eq!(event.description, "");
        assert_eq!(event.start_date, None);
        assert_eq!(event.end_date, None);
        assert_eq!(event.ticket_url, None);
        assert_eq!(event.image, None);
        assert_eq!(event.season, "year-round");
        assert_eq!(event.id, "fortunesound-unknown-event-0");
    }

    #[test]
    fn unparseable_dates_are_absent() {
        let html = r#"
        <h1>Mystery Show</h1>
        <div class="eventitem-meta-date"><span>Date TBA</span><span>late</span></div>
        <div class="eventitem-meta-date"><span>soon</span><span>later</span></div>
        <img data-src="/fallback.png">
        "#;
        let event = extractor(&[]).parse_event_page(EVENT_URL, html);
        assert_eq!(event.start_date, None);
        assert_eq!(event.end_date, None);
        assert_eq!(
            event.image.as_deref(),
            Some("https://www.fortunesoundclub.com/fallback.png")
        );
    }

    #[test]
    fn ticket_link_falls_back_to_ticket_host() {
        let html = r#"
        <h1>Show</h1>
        <a href="/about">About us</a>
        <a href="https://on.fortunesoundclub.com/e/show">Get in</a>
        "#;
        let event = extractor(&[]).parse_event_page(EVENT_URL, html);
        assert_eq!(
            event.ticket_url.as_deref(),
            Some("https://on.fortunesoundclub.com/e/show")
        );
    }

    #[test]
    fn extract_event_reports_fetch_failure() {
        let scraper = extractor(&[]);
        match scraper.extract_event(EVENT_URL) {
            Err(ExtractError::Fetch { url, .. }) => assert_eq!(url, EVENT_URL),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[test]
    fn batch_skips_failed_pages() {
        let scraper = extractor(&[
            (LISTING_URL, LISTING_HTML),
            (EVENT_URL, EVENT_HTML),
            (
                "https://www.fortunesoundclub.com/events/hip-hop-friday",
                "<h1>Hip Hop Friday</h1>",
            ),
        ]);
        let events = scraper.run_batch().expect("batch");

        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Techno Night", "Hip Hop Friday"]);
        assert_eq!(events[1].categories.last().map(String::as_str), Some("hip-hop"));
    }

    #[test]
    fn request_delay_comes_from_config() {
        let config = ScrapeConfig::default();
        assert_eq!(config.request_delay(), Duration::from_secs(1));
    }
}
