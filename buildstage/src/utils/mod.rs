//! Utility functions for timestamps and run identifiers.

pub mod timestamps;

pub use timestamps::{
    changelog_date, file_stamp, format_iso8601, iso_timestamp, now_utc, parse_file_stamp,
    Timestamp,
};

/// Generates a random run identifier.
#[must_use]
pub fn generate_run_id() -> uuid::Uuid {
    uuid::Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_run_id_is_v4() {
        let id = generate_run_id();
        assert_eq!(id.get_version_num(), 4);
    }

    #[test]
    fn test_generate_run_id_is_unique() {
        assert_ne!(generate_run_id(), generate_run_id());
    }
}
