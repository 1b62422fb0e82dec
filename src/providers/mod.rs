pub mod ecb;

pub use ecb::{FeedParseError, ParsedFeed, parse_feed};
