use sha2::{Digest, Sha256};

/// Stable identifier for a discovered URL: lowercase SHA-256 hex digest.
///
/// Used as the primary key of the links table so that re-discovering a URL
/// maps to the same row.
pub fn hash_url(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = hash_url("https://example.com/news/a");
        let b = hash_url("https://example.com/news/a");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn distinct_urls_distinct_hashes() {
        assert_ne!(
            hash_url("https://example.com/news/a"),
            hash_url("https://example.com/news/b")
        );
    }
}
