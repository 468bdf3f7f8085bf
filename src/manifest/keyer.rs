use crate::manifest::document::TableEntries;
use crate::manifest::error::{ManifestError, ManifestResult};
use crate::manifest::types::{Entry, ManifestConfig};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::ops::RangeInclusive;

/// Assigns a document key to each row payload.
///
/// The payload's own hash is preferred; rows without one get a synthesized
/// key drawn from the injected random source.
pub struct EntryKeyer<R> {
    rng: R,
    hash_field: String,
    fallback_prefix: String,
    fallback_range: RangeInclusive<u32>,
    fallback_capacity: u64,
    unique_fallback_keys: bool,
}

impl<R: Rng> EntryKeyer<R> {
    pub fn new(rng: R, config: &ManifestConfig) -> Self {
        EntryKeyer {
            rng,
            hash_field: config.hash_field.clone(),
            fallback_prefix: config.fallback_prefix.clone(),
            fallback_range: config.fallback_range.clone(),
            fallback_capacity: config.fallback_capacity(),
            unique_fallback_keys: config.unique_fallback_keys,
        }
    }

    /// Key one payload destined for `table`.
    ///
    /// The payload must be a JSON object. Its text is kept as-is; only the
    /// hash field is inspected.
    pub fn key(&mut self, payload: String, table: &TableEntries) -> ManifestResult<Entry> {
        let parsed = parse_payload(&payload).map_err(|e| malformed(table, e.to_string()))?;
        let object = parsed
            .as_object()
            .ok_or_else(|| malformed(table, "payload is not a JSON object"))?;

        match embedded_hash(object, &self.hash_field) {
            Some(hash) => Ok(Entry::new(hash, payload)),
            None => {
                let key = self.fallback_key(table)?;
                Ok(Entry::synthesized(key, payload))
            }
        }
    }

    /// Draw a synthesized key. When unique keys are enabled, a drawn key that
    /// the table already holds is advanced by one, wrapping at the range end.
    fn fallback_key(&mut self, table: &TableEntries) -> ManifestResult<String> {
        if self.fallback_capacity == 0 {
            return Err(self.exhausted(table));
        }

        let start = *self.fallback_range.start();
        let drawn = self.rng.gen_range(self.fallback_range.clone());
        if !self.unique_fallback_keys {
            return Ok(format!("{}{}", self.fallback_prefix, drawn));
        }

        let mut offset = u64::from(drawn - start);
        for _ in 0..self.fallback_capacity {
            // offset < capacity, so start + offset stays within the range
            let candidate = format!("{}{}", self.fallback_prefix, u64::from(start) + offset);
            if !table.contains_key(&candidate) {
                return Ok(candidate);
            }
            offset = (offset + 1) % self.fallback_capacity;
        }

        Err(self.exhausted(table))
    }

    fn exhausted(&self, table: &TableEntries) -> ManifestError {
        ManifestError::FallbackKeysExhausted {
            table: table.name().to_string(),
            available: self.fallback_capacity,
        }
    }
}

/// Parse a whole payload. Nesting depth is not capped, so any syntactically
/// valid document is accepted.
fn parse_payload(payload: &str) -> serde_json::Result<Value> {
    let mut deserializer = serde_json::Deserializer::from_str(payload);
    deserializer.disable_recursion_limit();
    let value = Value::deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(value)
}

/// Read a usable hash from a payload object.
///
/// Non-empty strings are used verbatim and integers by their decimal text.
/// Anything else counts as no hash.
pub fn embedded_hash(object: &Map<String, Value>, field: &str) -> Option<String> {
    match object.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

fn malformed(table: &TableEntries, reason: impl Into<String>) -> ManifestError {
    ManifestError::MalformedPayload {
        table: table.name().to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn seeded() -> EntryKeyer<StdRng> {
        EntryKeyer::new(StdRng::seed_from_u64(7), &ManifestConfig::default())
    }

    /// A source that always yields the bottom of any range
    fn stuck(config: &ManifestConfig) -> EntryKeyer<StepRng> {
        EntryKeyer::new(StepRng::new(0, 0), config)
    }

    fn assert_fallback_shape(key: &str) {
        assert_eq!(key.len(), 6, "unexpected key {}", key);
        assert!(key.starts_with('g'));
        let n: u32 = key[1..].parse().unwrap();
        assert!((10000..=99999).contains(&n));
    }

    #[test]
    fn test_string_hash_used_verbatim() {
        let table = TableEntries::new("T");
        let entry = seeded()
            .key(r#"{"hash":"a1","x":1}"#.to_string(), &table)
            .unwrap();

        assert_eq!(entry.key, "a1");
        assert_eq!(entry.payload(), r#"{"hash":"a1","x":1}"#);
        assert!(!entry.synthesized);
    }

    #[test]
    fn test_numeric_hash_used() {
        let table = TableEntries::new("DestinyItemDefinition");
        let entry = seeded()
            .key(r#"{"hash":3628991658,"index":12}"#.to_string(), &table)
            .unwrap();

        assert_eq!(entry.key, "3628991658");
    }

    #[test]
    fn test_missing_hash_synthesizes_key() {
        let table = TableEntries::new("T");
        let entry = seeded().key(r#"{"y":2}"#.to_string(), &table).unwrap();

        assert!(entry.synthesized);
        assert_fallback_shape(&entry.key);
        assert_eq!(entry.payload(), r#"{"y":2}"#);
    }

    #[test]
    fn test_unusable_hash_values_synthesize_key() {
        let table = TableEntries::new("T");
        let mut keyer = seeded();

        for payload in [
            r#"{"hash":""}"#,
            r#"{"hash":null}"#,
            r#"{"hash":true}"#,
            r#"{"hash":1.5}"#,
            r#"{"hash":{"nested":"x"}}"#,
        ] {
            let entry = keyer.key(payload.to_string(), &table).unwrap();
            assert!(entry.synthesized, "{} should not be keyed by hash", payload);
            assert_fallback_shape(&entry.key);
        }
    }

    #[test]
    fn test_embedded_hash_lookup() {
        let object = json!({"hash": "abc", "other": 1});
        assert_eq!(embedded_hash(object.as_object().unwrap(), "hash").as_deref(), Some("abc"));
        assert_eq!(embedded_hash(object.as_object().unwrap(), "missing"), None);
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let table = TableEntries::new("Broken");
        let err = seeded().key(r#"{"hash":"a1","x":"#.to_string(), &table).unwrap_err();

        match err {
            ManifestError::MalformedPayload { table, .. } => assert_eq!(table, "Broken"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_deeply_nested_payload_accepted() {
        let table = TableEntries::new("T");
        let payload = format!(
            r#"{{"hash":"deep","v":{}{}}}"#,
            "[".repeat(200),
            "]".repeat(200)
        );

        let entry = seeded().key(payload.clone(), &table).unwrap();
        assert_eq!(entry.key, "deep");
        assert_eq!(entry.payload(), payload);
    }

    #[test]
    fn test_padded_payload_unchanged() {
        let table = TableEntries::new("T");
        let payload = " {\"hash\":\"ws\",\"x\":1}\n";

        let entry = seeded().key(payload.to_string(), &table).unwrap();
        assert_eq!(entry.key, "ws");
        assert_eq!(entry.payload(), payload);
    }

    #[test]
    fn test_trailing_garbage_is_malformed() {
        let table = TableEntries::new("T");
        let err = seeded().key(r#"{"hash":"a"} {}"#.to_string(), &table).unwrap_err();
        assert!(matches!(err, ManifestError::MalformedPayload { .. }));
    }

    #[test]
    fn test_non_object_payload_is_malformed() {
        let table = TableEntries::new("T");
        let err = seeded().key("[1,2,3]".to_string(), &table).unwrap_err();
        assert!(matches!(err, ManifestError::MalformedPayload { .. }));
    }

    #[test]
    fn test_same_seed_same_keys() {
        let table = TableEntries::new("T");
        let mut a = seeded();
        let mut b = seeded();

        for _ in 0..10 {
            let ka = a.key("{}".to_string(), &table).unwrap().key;
            let kb = b.key("{}".to_string(), &table).unwrap().key;
            assert_eq!(ka, kb);
        }
    }

    #[test]
    fn test_unique_keys_step_past_collisions() {
        let mut table = TableEntries::new("T");
        let mut keyer = stuck(&ManifestConfig::default());

        for _ in 0..3 {
            let entry = keyer.key(r#"{"y":2}"#.to_string(), &table).unwrap();
            table.insert(entry);
        }

        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["g10000", "g10001", "g10002"]);
    }

    #[test]
    fn test_unique_keys_avoid_real_hashes() {
        let mut table = TableEntries::new("T");
        let mut keyer = stuck(&ManifestConfig::default());

        let hashed = keyer.key(r#"{"hash":"g10000"}"#.to_string(), &table).unwrap();
        table.insert(hashed);
        let fallback = keyer.key("{}".to_string(), &table).unwrap();

        assert_eq!(fallback.key, "g10001");
    }

    #[test]
    fn test_fallback_search_wraps_to_range_start() {
        let config = ManifestConfig {
            fallback_range: 10..=12,
            ..ManifestConfig::default()
        };
        // Always draws the top of a three-key range
        let mut keyer = EntryKeyer::new(StepRng::new(0xAAAA_AAAB, 0), &config);
        let mut table = TableEntries::new("T");

        let first = keyer.key("{}".to_string(), &table).unwrap();
        assert_eq!(first.key, "g12");
        table.insert(first);

        let second = keyer.key("{}".to_string(), &table).unwrap();
        assert_eq!(second.key, "g10");
    }

    #[test]
    fn test_legacy_keys_collide() {
        let config = ManifestConfig {
            unique_fallback_keys: false,
            ..ManifestConfig::default()
        };
        let mut table = TableEntries::new("T");
        let mut keyer = stuck(&config);

        let first = keyer.key(r#"{"n":1}"#.to_string(), &table).unwrap();
        table.insert(first);
        let second = keyer.key(r#"{"n":2}"#.to_string(), &table).unwrap();
        assert_eq!(second.key, "g10000");

        let replaced = table.insert(second);
        assert_eq!(replaced.unwrap(), r#"{"n":1}"#);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_exhausted_range() {
        let config = ManifestConfig {
            fallback_range: 1..=2,
            ..ManifestConfig::default()
        };
        let mut table = TableEntries::new("Tiny");
        let mut keyer = stuck(&config);

        for _ in 0..2 {
            let entry = keyer.key("{}".to_string(), &table).unwrap();
            table.insert(entry);
        }
        let err = keyer.key("{}".to_string(), &table).unwrap_err();

        match err {
            ManifestError::FallbackKeysExhausted { table, available } => {
                assert_eq!(table, "Tiny");
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
