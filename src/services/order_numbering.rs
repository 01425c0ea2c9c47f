use crate::errors::ServiceError;
use chrono::{NaiveDate, Utc};
use rand::rngs::OsRng;
use rand::RngCore;

/// Random bytes in an order number suffix (12 hex characters).
const SUFFIX_BYTES: usize = 6;

/// Produces order numbers of the form `{PREFIX}-{YYYYMMDD}-{SUFFIX}`.
///
/// Uniqueness comes from 48 bits of OS randomness per call, so no counter
/// state is shared between processes. The date segment keeps numbers
/// sortable by day.
#[derive(Debug, Clone)]
pub struct OrderNumberGenerator {
    prefix: String,
}

impl OrderNumberGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Order number stamped with today's UTC date.
    pub fn next(&self) -> Result<String, ServiceError> {
        self.next_for(Utc::now().date_naive())
    }

    pub fn next_for(&self, date: NaiveDate) -> Result<String, ServiceError> {
        let mut suffix = [0u8; SUFFIX_BYTES];
        OsRng.try_fill_bytes(&mut suffix).map_err(|e| {
            ServiceError::InternalError(format!("random source unavailable: {e}"))
        })?;

        Ok(format!(
            "{}-{}-{}",
            self.prefix,
            date.format("%Y%m%d"),
            hex::encode_upper(suffix)
        ))
    }
}

impl Default for OrderNumberGenerator {
    fn default() -> Self {
        Self::new("ORD")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn format_has_prefix_date_and_hex_suffix() {
        let generator = OrderNumberGenerator::new("POS");
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let number = generator.next_for(date).unwrap();

        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "POS");
        assert_eq!(parts[1], "20260307");
        assert_eq!(parts[2].len(), 12);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn hundred_thousand_numbers_are_distinct() {
        let generator = OrderNumberGenerator::default();
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let mut seen = HashSet::with_capacity(100_000);
        for _ in 0..100_000 {
            assert!(seen.insert(generator.next_for(date).unwrap()));
        }
    }

    #[test]
    fn numbers_sort_by_date() {
        let generator = OrderNumberGenerator::default();
        let earlier = generator
            .next_for(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap())
            .unwrap();
        let later = generator
            .next_for(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .unwrap();
        assert!(earlier < later);
    }
}
