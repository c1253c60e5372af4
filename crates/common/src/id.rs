//! ID generation utilities.

use rand::Rng;
use ulid::Ulid;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// Used for surveys, questions, audits and responses.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a numeric category ID.
    ///
    /// A random fraction scaled by the current epoch milliseconds. Category ids
    /// only need to be unique within their survey, not ordered.
    #[must_use]
    pub fn generate_category_id(&self) -> String {
        let now_ms = chrono::Utc::now().timestamp_millis().max(1) as f64;
        let fraction: f64 = rand::thread_rng().r#gen();
        // +1 so the id is never "0"
        let scaled = fraction.mul_add(now_ms, 1.0).floor() as u64;
        scaled.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), 26);
        assert_eq!(id2.len(), 26);
        assert_ne!(id1, id2);
        assert_eq!(id1, id1.to_lowercase());
    }

    #[test]
    fn test_generate_category_id_is_numeric() {
        let id_gen = IdGenerator::new();
        let id = id_gen.generate_category_id();

        assert!(!id.is_empty());
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_category_ids_differ() {
        let id_gen = IdGenerator::new();
        let ids: std::collections::HashSet<String> =
            (0..64).map(|_| id_gen.generate_category_id()).collect();

        // 64 draws over a ~1.7e12 range; a collision here means the generator is broken
        assert!(ids.len() >= 63);
    }
}
