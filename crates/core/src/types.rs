/// All timestamps are UTC, serialized as RFC 3339.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
