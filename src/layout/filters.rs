//! Tera filters available to layouts

use std::collections::HashMap;
use tera::{Tera, Value};

use crate::config::SiteConfig;
use crate::helpers::{full_url_for, url_for};

/// Register all custom filters
pub(super) fn register(tera: &mut Tera, config: &SiteConfig) {
    let relative = config.clone();
    tera.register_filter(
        "relative_url",
        move |value: &Value, _args: &HashMap<String, Value>| {
            let path = tera::try_get_value!("relative_url", "value", String, value);
            Ok(Value::String(url_for(&relative, &path)))
        },
    );

    let absolute = config.clone();
    tera.register_filter(
        "absolute_url",
        move |value: &Value, _args: &HashMap<String, Value>| {
            let path = tera::try_get_value!("absolute_url", "value", String, value);
            Ok(Value::String(full_url_for(&absolute, &path)))
        },
    );

    tera.register_filter("strip_html", strip_html_filter);
    tera.register_filter("truncate_chars", truncate_chars_filter);
    tera.register_filter("date_format", date_format_filter);
}

/// Tera filter: strip HTML tags
fn strip_html_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    Ok(Value::String(result))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    if s.chars().count() <= length {
        Ok(Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(Value::String(format!("{}{}", truncated.trim_end(), omission)))
    }
}

/// Tera filter: reformat a `YYYY-MM-DD` date with a strftime pattern
fn date_format_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "%B %d, %Y".to_string(),
    };

    match chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
        Ok(date) => Ok(Value::String(date.format(&format).to_string())),
        // Not a plain date: return as-is
        Err(_) => Ok(Value::String(s)),
    }
}
