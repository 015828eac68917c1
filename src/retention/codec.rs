//! Backup filename codec
//!
//! Maps a (database, date) pair to its dump filename and back. Backup files
//! are named `{database}_{date}{extension}`, e.g. `app_2024-03-11.dump`.
//! Decoding is strict: anything that doesn't match exactly is treated as a
//! foreign file and ignored, so unrelated files can live in the same
//! directory without breaking pruning.

use chrono::NaiveDate;

/// Bidirectional mapping between (database, date) pairs and dump filenames.
///
/// Construct one from the configured date format (strftime syntax) and file
/// extension. The config loader validates the format string, so `encode`
/// never fails for a validated configuration.
#[derive(Debug, Clone)]
pub struct FilenameCodec {
    date_format: String,
    extension: String,
}

impl FilenameCodec {
    pub fn new(date_format: &str, extension: &str) -> Self {
        Self {
            date_format: date_format.to_string(),
            extension: extension.to_string(),
        }
    }

    /// Render the dump filename for a database and backup date.
    pub fn encode(&self, database: &str, date: NaiveDate) -> String {
        format!(
            "{}_{}{}",
            database,
            date.format(&self.date_format),
            self.extension
        )
    }

    /// Parse a directory entry back into a backup date.
    ///
    /// Returns `None` for anything that is not a backup file of this
    /// database: wrong prefix, wrong extension, or a date slice that does
    /// not round-trip through the configured format. The round-trip check
    /// rejects lenient parses (`2024-3-1` under `%Y-%m-%d`) and works for
    /// variable-width formats where a length check would not.
    pub fn decode(&self, database: &str, candidate: &str) -> Option<NaiveDate> {
        let rest = candidate.strip_prefix(database)?;
        let rest = rest.strip_prefix('_')?;
        let date_str = rest.strip_suffix(self.extension.as_str())?;

        let date = NaiveDate::parse_from_str(date_str, &self.date_format).ok()?;
        if date.format(&self.date_format).to_string() != date_str {
            return None;
        }
        Some(date)
    }

    /// Decode every entry of a directory listing, dropping foreign files.
    pub fn decode_all(&self, database: &str, candidates: &[String]) -> Vec<NaiveDate> {
        candidates
            .iter()
            .filter_map(|candidate| self.decode(database, candidate))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_codec() -> FilenameCodec {
        FilenameCodec::new("%Y-%m-%d", ".dump")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_encode_default_format() {
        let codec = default_codec();
        assert_eq!(
            codec.encode("app", date(2024, 3, 11)),
            "app_2024-03-11.dump"
        );
    }

    #[test]
    fn test_round_trip() {
        let codec = default_codec();
        for d in [
            date(2024, 1, 1),
            date(2024, 2, 29),
            date(1999, 12, 31),
            date(2024, 3, 11),
        ] {
            let encoded = codec.encode("mydb", d);
            assert_eq!(codec.decode("mydb", &encoded), Some(d));
        }
    }

    #[test]
    fn test_rejects_unparseable_date() {
        let codec = default_codec();
        assert_eq!(codec.decode("mydb", "mydb_notadate.dump"), None);
        assert_eq!(codec.decode("mydb", "mydb_2024-13-40.dump"), None);
    }

    #[test]
    fn test_rejects_unrelated_file() {
        let codec = default_codec();
        assert_eq!(codec.decode("mydb", "unrelated_file.txt"), None);
        assert_eq!(codec.decode("mydb", ".gitkeep"), None);
        assert_eq!(codec.decode("mydb", ""), None);
    }

    #[test]
    fn test_rejects_wrong_extension() {
        let codec = default_codec();
        assert_eq!(codec.decode("mydb", "mydb_2024-03-11.sql"), None);
        assert_eq!(codec.decode("mydb", "mydb_2024-03-11.dump.tmp"), None);
    }

    #[test]
    fn test_rejects_wrong_database_prefix() {
        let codec = default_codec();
        assert_eq!(codec.decode("mydb", "otherdb_2024-03-11.dump"), None);
        // A file for a database whose name extends ours is not ours either.
        assert_eq!(codec.decode("my", "my_db_2024-03-11.dump"), None);
    }

    #[test]
    fn test_rejects_lenient_date_spelling() {
        let codec = default_codec();
        // chrono would happily parse these, but they don't round-trip.
        assert_eq!(codec.decode("mydb", "mydb_2024-3-1.dump"), None);
        assert_eq!(codec.decode("mydb", "mydb_2024-03-011.dump"), None);
    }

    #[test]
    fn test_database_name_with_underscores() {
        let codec = default_codec();
        let encoded = codec.encode("my_app_db", date(2024, 3, 11));
        assert_eq!(encoded, "my_app_db_2024-03-11.dump");
        assert_eq!(codec.decode("my_app_db", &encoded), Some(date(2024, 3, 11)));
    }

    #[test]
    fn test_variable_width_format() {
        // %-d renders without zero padding, so filenames vary in length.
        let codec = FilenameCodec::new("%Y-%m-%-d", ".dump");
        let short = codec.encode("app", date(2024, 3, 4));
        let long = codec.encode("app", date(2024, 3, 14));
        assert_eq!(short, "app_2024-03-4.dump");
        assert_eq!(long, "app_2024-03-14.dump");
        assert_eq!(codec.decode("app", &short), Some(date(2024, 3, 4)));
        assert_eq!(codec.decode("app", &long), Some(date(2024, 3, 14)));
        // Zero-padded spelling no longer round-trips under this format.
        assert_eq!(codec.decode("app", "app_2024-03-04.dump"), None);
    }

    #[test]
    fn test_custom_extension() {
        let codec = FilenameCodec::new("%Y-%m-%d", ".pgdump");
        let encoded = codec.encode("app", date(2024, 3, 11));
        assert_eq!(encoded, "app_2024-03-11.pgdump");
        assert_eq!(codec.decode("app", &encoded), Some(date(2024, 3, 11)));
        assert_eq!(codec.decode("app", "app_2024-03-11.dump"), None);
    }

    #[test]
    fn test_decode_all_filters_foreign_files() {
        let codec = default_codec();
        let listing = vec![
            "app_2024-03-11.dump".to_string(),
            "app_2024-03-10.dump".to_string(),
            "app_notadate.dump".to_string(),
            "unrelated_file.txt".to_string(),
            "otherdb_2024-03-11.dump".to_string(),
        ];
        let dates = codec.decode_all("app", &listing);
        assert_eq!(dates, vec![date(2024, 3, 11), date(2024, 3, 10)]);
    }
}
