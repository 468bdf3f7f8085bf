use std::ops::RangeInclusive;

/// A keyed row payload - represents one second-level entry of the document
#[derive(Debug, Clone)]
pub struct Entry {
    /// The payload's own hash, or a synthesized fallback key
    pub key: String,

    /// The original payload text, validated but otherwise untouched
    pub value: String,

    /// Whether `key` was synthesized rather than read from the payload
    pub synthesized: bool,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Entry {
            key: key.into(),
            value: value.into(),
            synthesized: false,
        }
    }

    pub fn synthesized(key: impl Into<String>, value: impl Into<String>) -> Self {
        Entry {
            key: key.into(),
            value: value.into(),
            synthesized: true,
        }
    }

    /// The payload text exactly as it will appear in the document
    pub fn payload(&self) -> &str {
        &self.value
    }
}

/// Configuration for the transformation process
#[derive(Debug, Clone)]
pub struct ManifestConfig {
    /// Column that holds each row's JSON payload
    pub payload_column: String,

    /// Payload field used as the entry key
    pub hash_field: String,

    /// Prefix for synthesized keys
    pub fallback_prefix: String,

    /// Inclusive range the numeric part of a synthesized key is drawn from
    pub fallback_range: RangeInclusive<u32>,

    /// Search for a free key when a synthesized key is already used in a table.
    /// When false, colliding rows silently replace each other.
    pub unique_fallback_keys: bool,
}

impl ManifestConfig {
    /// Number of distinct synthesized keys the configured range allows
    pub fn fallback_capacity(&self) -> u64 {
        let (start, end) = (*self.fallback_range.start(), *self.fallback_range.end());
        if end < start {
            0
        } else {
            u64::from(end - start) + 1
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        ManifestConfig {
            payload_column: String::from("json"),
            hash_field: String::from("hash"),
            fallback_prefix: String::from("g"),
            fallback_range: 10000..=99999,
            unique_fallback_keys: true,
        }
    }
}
