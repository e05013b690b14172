//! Core data type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current navigation location, split the way a browser exposes it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    /// Path component, always starting with `/`
    pub pathname: String,
    /// Query string including the leading `?`, or empty
    pub search: String,
}

impl Location {
    pub fn new(pathname: impl Into<String>, search: impl Into<String>) -> Self {
        let pathname = pathname.into();
        let search = search.into();
        let search = if search.is_empty() || search.starts_with('?') {
            search
        } else {
            format!("?{}", search)
        };

        Self { pathname, search }
    }

    /// Split a `path?query` string into a location
    pub fn parse(path_and_query: &str) -> Self {
        match path_and_query.split_once('?') {
            Some((path, query)) if !query.is_empty() => Self::new(path, format!("?{}", query)),
            Some((path, _)) => Self::new(path, ""),
            None => Self::new(path_and_query, ""),
        }
    }

    /// Path followed by the query string, exactly as navigated to
    pub fn path_and_query(&self) -> String {
        format!("{}{}", self.pathname, self.search)
    }

    /// Look up the first value of a query parameter, percent-decoded
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.search
            .trim_start_matches('?')
            .split('&')
            .filter(|pair| !pair.is_empty())
            .find_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                if decode_component(key)? == name {
                    decode_component(value)
                } else {
                    None
                }
            })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pathname, self.search)
    }
}

fn decode_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

/// Options accepted by [`crate::Navigator::navigate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one
    pub replace: bool,
}

impl NavigateOptions {
    pub fn replace() -> Self {
        Self { replace: true }
    }

    pub fn push() -> Self {
        Self { replace: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_path_and_query() {
        let location = Location::parse("/projects?x=1");
        assert_eq!(location.pathname, "/projects");
        assert_eq!(location.search, "?x=1");
        assert_eq!(location.path_and_query(), "/projects?x=1");

        let bare = Location::parse("/dashboard?");
        assert_eq!(bare.search, "");
    }

    #[test]
    fn test_new_adds_question_mark() {
        let location = Location::new("/tasks", "page=2");
        assert_eq!(location.search, "?page=2");
    }

    #[test]
    fn test_query_param_decodes_value() {
        let location = Location::parse("/auth?returnTo=%2Fprojects%3Fx%3D1&mode=a+b");
        assert_eq!(
            location.query_param("returnTo"),
            Some("/projects?x=1".to_string())
        );
        assert_eq!(location.query_param("mode"), Some("a b".to_string()));
        assert_eq!(location.query_param("missing"), None);
    }
}
