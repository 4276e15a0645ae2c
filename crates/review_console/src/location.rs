//! Restart hint a caller may mirror into its own URL for deep-linking.
//!
//! The console never reads or writes a URL itself; callers translate between a
//! [`ConsoleLocation`] and whatever address bar they own.

use serde::Serialize;
use shared::domain::ReviewStatus;
use url::{form_urlencoded, Url};

const TAB_KEY: &str = "tab";
const PAGE_KEY: &str = "page";
const QUERY_KEY: &str = "q";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleLocation {
    pub tab: ReviewStatus,
    pub page: u32,
    pub query: String,
}

impl Default for ConsoleLocation {
    fn default() -> Self {
        Self {
            tab: ReviewStatus::Pending,
            page: 1,
            query: String::new(),
        }
    }
}

impl ConsoleLocation {
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        self.append_pairs(&mut serializer);
        serializer.finish()
    }

    /// Unknown keys are ignored; malformed values fall back to the defaults.
    pub fn from_query_string(raw: &str) -> Self {
        let mut location = Self::default();
        for (key, value) in form_urlencoded::parse(raw.trim_start_matches('?').as_bytes()) {
            location.absorb(&key, &value);
        }
        location
    }

    pub fn from_url(url: &Url) -> Self {
        let mut location = Self::default();
        for (key, value) in url.query_pairs() {
            location.absorb(&key, &value);
        }
        location
    }

    /// Rewrites this location's keys on `url`, keeping unrelated query pairs.
    pub fn apply_to(&self, url: &mut Url) {
        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !matches!(key.as_ref(), TAB_KEY | PAGE_KEY | QUERY_KEY))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &retained {
            pairs.append_pair(key, value);
        }
        pairs.append_pair(TAB_KEY, self.tab.slug());
        pairs.append_pair(PAGE_KEY, &self.page.to_string());
        if !self.query.is_empty() {
            pairs.append_pair(QUERY_KEY, &self.query);
        }
    }

    fn append_pairs(&self, serializer: &mut form_urlencoded::Serializer<'_, String>) {
        serializer.append_pair(TAB_KEY, self.tab.slug());
        serializer.append_pair(PAGE_KEY, &self.page.to_string());
        if !self.query.is_empty() {
            serializer.append_pair(QUERY_KEY, &self.query);
        }
    }

    fn absorb(&mut self, key: &str, value: &str) {
        match key {
            TAB_KEY => {
                if let Ok(tab) = value.parse() {
                    self.tab = tab;
                }
            }
            PAGE_KEY => {
                if let Ok(page) = value.parse::<u32>() {
                    if page >= 1 {
                        self.page = page;
                    }
                }
            }
            QUERY_KEY => self.query = value.to_string(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_query_only_when_present() {
        let location = ConsoleLocation {
            tab: ReviewStatus::Approved,
            page: 2,
            query: String::new(),
        };
        assert_eq!(location.to_query_string(), "tab=approved&page=2");

        let searching = ConsoleLocation {
            query: "linear algebra".to_string(),
            ..location
        };
        assert_eq!(
            searching.to_query_string(),
            "tab=approved&page=2&q=linear+algebra"
        );
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let location = ConsoleLocation::from_query_string("?tab=archived&page=-3&q=calc");
        assert_eq!(location.tab, ReviewStatus::Pending);
        assert_eq!(location.page, 1);
        assert_eq!(location.query, "calc");

        let zero = ConsoleLocation::from_query_string("page=0");
        assert_eq!(zero.page, 1);
    }

    #[test]
    fn apply_to_keeps_unrelated_pairs() {
        let mut url = Url::parse("https://example.test/admin/materials?lang=en&page=9")
            .expect("valid url");
        let location = ConsoleLocation {
            tab: ReviewStatus::Rejected,
            page: 3,
            query: "physics".to_string(),
        };

        location.apply_to(&mut url);

        assert_eq!(url.query(), Some("lang=en&tab=rejected&page=3&q=physics"));
        assert_eq!(ConsoleLocation::from_url(&url), location);
    }
}
