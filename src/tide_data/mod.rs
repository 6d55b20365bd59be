pub mod cache;
pub mod cleaner;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod request;
pub mod selector;
pub mod source;
pub mod stitcher;

#[cfg(test)]
pub(crate) mod testing;

/// Timestamp column of raw frames, `YYYY-MM-DD HH:MM` in GMT.
pub const TIMESTAMP_COLUMN: &str = "Date Time";
/// Date half of the timestamp in clean frames.
pub const DATE_COLUMN: &str = "Date";
/// Time half of the timestamp in clean frames.
pub const TIME_COLUMN: &str = "Time";
