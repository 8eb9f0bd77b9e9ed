use chrono::{DateTime, Datelike, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;

/// Genre rules in priority order. Only the first matching rule contributes a tag.
static GENRE_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)hip.?hop|rap", "hip-hop"),
        (r"(?i)jazz", "jazz"),
        (r"(?i)electronic|dj|dance|edm|house|techno", "electronic"),
    ]
    .into_iter()
    .map(|(pattern, tag)| (Regex::new(pattern).expect("valid genre regex"), tag))
    .collect()
});

/// Base tags followed by at most one genre tag inferred from title and description.
pub fn categories(base: &[String], title: &str, description: &str) -> Vec<String> {
    let mut tags = base.to_vec();
    let haystack = format!("{} {}", title, description);
    if let Some((_, tag)) = GENRE_RULES.iter().find(|(re, _)| re.is_match(&haystack)) {
        tags.push(tag.to_string());
    }
    tags
}

pub fn season(start: Option<&DateTime<FixedOffset>>) -> &'static str {
    match start.map(|dt| dt.month()) {
        Some(3..=5) => "spring",
        Some(6..=8) => "summer",
        Some(9..=11) => "fall",
        Some(_) => "winter",
        None => "year-round",
    }
}
