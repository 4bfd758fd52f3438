//! Cache hits stamped with their write time.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// A decoded cache hit and the wall-clock time its entry was written.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    cached_at: DateTime<Utc>,
}

impl<T> CacheRead<T> {
    pub fn new(value: T, cached_at: DateTime<Utc>) -> Self {
        Self { value, cached_at }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// How long ago the entry was written. Clock skew reads as zero.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_of_old_entry() {
        let read = CacheRead::new(1u8, Utc::now() - chrono::Duration::seconds(5));
        let age = read.age();
        assert!(age >= Duration::from_secs(4));
        assert!(age <= Duration::from_secs(10));
        assert_eq!(read.into_value(), 1);
    }

    #[test]
    fn test_future_stamp_reads_as_zero() {
        let read = CacheRead::new((), Utc::now() + chrono::Duration::minutes(1));
        assert_eq!(read.age(), Duration::ZERO);
    }
}
