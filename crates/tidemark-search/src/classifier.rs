//! Query classification.
//!
//! Domain detection is deliberately conservative: a query is a domain only
//! if it is a single token shaped like `label.tld`, optionally with a scheme,
//! `www.`, port, path, query or fragment. A bare word is never a domain.

use once_cell::sync::Lazy;
use regex::Regex;

pub use tidemark_core::extract_domain;

static DOMAIN_QUERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:[a-z][a-z0-9+.-]*://)?(?:www\.)?(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}\.?(?::\d{1,5})?(?:[/?#]\S*)?$",
    )
    .expect("domain pattern is valid")
});

/// What kind of search a request is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryClass {
    /// No query text and no tag filter: newest-first browsing.
    DefaultBrowse,
    /// The query is a bare domain, carried in canonical form.
    Domain(String),
    /// Anything else, including tag filters without query text.
    General,
}

impl QueryClass {
    pub fn is_search(&self) -> bool {
        !matches!(self, QueryClass::DefaultBrowse)
    }
}

/// Classify a query. `has_tags` is whether the request filters by tag.
pub fn classify(query: &str, has_tags: bool) -> QueryClass {
    let query = query.trim();
    if query.is_empty() {
        return if has_tags {
            QueryClass::General
        } else {
            QueryClass::DefaultBrowse
        };
    }

    if is_domain_query(query) {
        if let Some(domain) = extract_domain(query) {
            return QueryClass::Domain(domain);
        }
    }
    QueryClass::General
}

/// Whether the query looks like a bare domain or a URL.
pub fn is_domain_query(query: &str) -> bool {
    DOMAIN_QUERY.is_match(query.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_domain_query() {
        assert!(is_domain_query("example.com"));
        assert!(is_domain_query("https://www.example.com/path?x=1#y"));
        assert!(is_domain_query("blog.example.co.uk"));
        assert!(is_domain_query("EXAMPLE.COM/"));
        assert!(is_domain_query("localhost.dev:8080"));
        assert!(!is_domain_query("just some words"));
        assert!(!is_domain_query("example"));
        assert!(!is_domain_query("rust 1.75"));
        assert!(!is_domain_query("v1.2"));
        assert!(!is_domain_query(""));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("   ", false), QueryClass::DefaultBrowse);
        assert_eq!(classify("", true), QueryClass::General);
        assert_eq!(
            classify("https://www.GitHub.com/rust-lang", false),
            QueryClass::Domain("github.com".to_string())
        );
        assert_eq!(classify("async rust patterns", false), QueryClass::General);
        assert_eq!(classify("rust", true), QueryClass::General);
    }

    #[test]
    fn test_is_search() {
        assert!(!QueryClass::DefaultBrowse.is_search());
        assert!(QueryClass::General.is_search());
        assert!(QueryClass::Domain("a.io".into()).is_search());
    }
}
