//! Front-matter parsing

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::Serialize;

/// Marker line that opens and closes a front-matter block
pub const DELIMITER: &str = "---";

/// Front-matter data from a document
///
/// A flat, ordered `key: value` mapping. Values are kept as strings; nothing
/// here is ever rejected, malformed lines are carried along as opaque keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrontMatter {
    fields: IndexMap<String, String>,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> (Self, &str) {
        let mut lines = content.split_inclusive('\n');

        match lines.next() {
            Some(first) if is_delimiter(first) => {
                let mut offset = first.len();
                let mut fields = IndexMap::new();

                for line in lines {
                    offset += line.len();
                    if is_delimiter(line) {
                        return (Self { fields }, &content[offset..]);
                    }
                    parse_field(line, &mut fields);
                }

                // No closing ---, treat as no front-matter
                tracing::debug!("Unterminated front-matter block, treating it as body text");
                (Self::default(), content)
            }
            _ => (Self::default(), content),
        }
    }

    /// Look up a raw value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over fields in source order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Name of the layout this document asks for
    pub fn layout(&self) -> Option<&str> {
        self.get("layout").filter(|v| !v.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").filter(|v| !v.is_empty())
    }

    /// Documents are published unless they say `published: false`
    pub fn published(&self) -> bool {
        !matches!(self.get("published"), Some("false") | Some("no"))
    }

    /// Parse the `date` field into a DateTime
    pub fn date(&self) -> Option<DateTime<Local>> {
        self.get("date").and_then(parse_date_string)
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

/// Parse one `key: value` line into the mapping
fn parse_field(line: &str, fields: &mut IndexMap<String, String>) {
    let trimmed = line.trim();

    // Skip empty lines and comments
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return;
    }

    match trimmed.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            fields.insert(key.trim().to_string(), unquote(value.trim()).to_string());
        }
        _ => {
            fields.insert(trimmed.to_string(), String::new());
        }
    }
}

/// Strip one pair of matching surrounding quotes
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Parse a date string in various formats
fn parse_date_string(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return dt.and_local_timezone(Local).earliest();
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0)?.and_local_timezone(Local).earliest();
        }
    }

    // Try RFC 3339 / ISO 8601
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Local))
}
