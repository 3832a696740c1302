// Re-export the Database struct and other public items
mod core;
mod feed_record;
mod options;
mod schema;

pub use self::core::Database;
pub use self::feed_record::{FeedRecord, FeedRecordSummary};
