//! Utility functions and helpers.

pub mod html;
pub mod http;

use url::Url;

use crate::error::Result;

/// Parse a base URL so that relative joins append to its path.
pub fn base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    Ok(Url::parse(&format!("{trimmed}/"))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_joins_under_path() {
        let base = base_url("https://example.com/api").unwrap();
        assert_eq!(
            base.join("g/catalog.json").unwrap().as_str(),
            "https://example.com/api/g/catalog.json"
        );

        let base = base_url("https://a.4cdn.org/").unwrap();
        assert_eq!(
            base.join("g/thread/1.json").unwrap().as_str(),
            "https://a.4cdn.org/g/thread/1.json"
        );
    }

    #[test]
    fn test_base_url_rejects_garbage() {
        assert!(base_url("not a url").is_err());
    }
}
