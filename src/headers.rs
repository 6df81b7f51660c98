use std::collections::HashMap;
use std::collections::hash_map;

/// Request headers, hashed by the lowercased name.
///
/// The original casing of the name is kept next to the value. Inserting
/// a name that only differs in case overwrites the previous entry, so
/// the last occurrence on the wire wins.
#[derive(Debug, Clone)]
pub struct HeaderMap {
    map: HashMap<String, (String, String)>,
}

impl HeaderMap {
    pub fn new() -> HeaderMap {
        HeaderMap { map: HashMap::new() }
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.map.insert(name.to_ascii_lowercase(),
                        (name.to_string(), value.to_string()));
    }

    /// Case-insensitive lookup returning the header value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(&name.to_ascii_lowercase())
            .map(|&(_, ref value)| value.as_str())
    }

    /// Iterates over `(original-cased name, value)` pairs.
    pub fn iter(&self) -> Iter {
        Iter { inner: self.map.values() }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

pub struct Iter<'a> {
    inner: hash_map::Values<'a, String, (String, String)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);
    fn next(&mut self) -> Option<(&'a str, &'a str)> {
        self.inner.next().map(|&(ref name, ref value)| {
            (name.as_str(), value.as_str())
        })
    }
}

/// True if a comma-separated header value contains the token,
/// case-insensitive, ignoring surrounding whitespace.
pub fn has_token(value: &str, token: &str) -> bool {
    value.split(',').any(|t| t.trim().eq_ignore_ascii_case(token))
}

#[cfg(test)]
mod test {
    use super::{HeaderMap, has_token};

    #[test]
    fn case_insensitive_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(headers.get("content-length"), None);
    }

    #[test]
    fn last_write_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Custom", "one");
        headers.insert("x-custom", "two");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X-Custom"), Some("two"));
        // the later casing is the one kept
        assert_eq!(headers.iter().next(), Some(("x-custom", "two")));
    }

    #[test]
    fn token_scan() {
        assert!(has_token("upgrade", "upgrade"));
        assert!(has_token("keep-alive, Upgrade", "upgrade"));
        assert!(has_token("  UPGRADE  ", "upgrade"));
        assert!(!has_token("upgraded", "upgrade"));
        assert!(!has_token("keep-alive", "upgrade"));
    }
}
