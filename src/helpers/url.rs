//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::SiteConfig;

/// Characters escaped inside a single URL path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Generate a URL with the baseurl prefix
///
/// # Examples
/// ```ignore
/// url_for(&config, "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    if is_external(path) {
        return path.to_string();
    }

    let base = config.baseurl.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/about/") // -> "https://example.com/blog/about/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    if is_external(path) {
        return path.to_string();
    }
    format!("{}{}", config.url.trim_end_matches('/'), url_for(config, path))
}

/// Percent-encode each segment of a relative URL path
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_external(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, baseurl: &str) -> SiteConfig {
        SiteConfig {
            url: url.to_string(),
            baseurl: baseurl.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_url_for() {
        let config = config("https://example.com", "/blog");
        assert_eq!(url_for(&config, "/css/style.css"), "/blog/css/style.css");
        assert_eq!(url_for(&config, ""), "/blog/");
        assert_eq!(url_for(&config, "https://cdn.example.com/a.js"), "https://cdn.example.com/a.js");

        let root = SiteConfig::default();
        assert_eq!(url_for(&root, "about/"), "/about/");
    }

    #[test]
    fn test_full_url_for() {
        let config = config("https://example.com/", "/blog/");
        assert_eq!(full_url_for(&config, "/about/"), "https://example.com/blog/about/");
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("posts/my post/"), "posts/my%20post/");
        assert_eq!(encode_path("posts/café.html"), "posts/caf%C3%A9.html");
    }
}
