//! Content-addressed, write-once response cache on the local filesystem.

pub mod key;
pub mod matcher;
pub mod store;

pub use key::CacheKey;
pub use matcher::{MatcherSet, ResponseMatcher, StatusPattern};
pub use store::FileCache;
