/// Ordered header collection with case-insensitive names.
///
/// Names keep the spelling they were inserted with; lookups ignore ASCII
/// case. Duplicates are allowed, [`get`](Headers::get) returns the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append a header, keeping any existing ones with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replace every header named `name` with a single one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).next()
    }

    pub fn get_all<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether any `name` header lists `token` in its comma-separated value,
    /// compared case-insensitively (`Connection: keep-alive, Upgrade`).
    pub fn contains_token(&self, name: &str, token: &str) -> bool {
        self.get_all(name)
            .flat_map(|v| v.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    }

    /// Remove every header named `name`; returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");

        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert!(headers.contains("CONTENT-TYPE"));
    }

    #[test]
    fn set_replaces_duplicates() {
        let mut headers = Headers::new();
        headers.insert("X-A", "1");
        headers.insert("x-a", "2");
        headers.set("X-A", "3");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-a"), Some("3"));
    }

    #[test]
    fn values_outlive_the_lookup_name() {
        let headers: Headers = [("Host", "device"), ("X-Tag", "a"), ("x-tag", "b")]
            .into_iter()
            .collect();

        let host = {
            let name = String::from("host");
            headers.get(&name)
        };
        let tags: Vec<&str> = {
            let name = "X-TAG".to_ascii_lowercase();
            headers.get_all(&name).collect()
        };

        assert_eq!(host, Some("device"));
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn token_lists() {
        let headers: Headers = [("Connection", "keep-alive, Upgrade")].into_iter().collect();

        assert!(headers.contains_token("connection", "upgrade"));
        assert!(headers.contains_token("Connection", "Keep-Alive"));
        assert!(!headers.contains_token("Connection", "close"));
    }
}
