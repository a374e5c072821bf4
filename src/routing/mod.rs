mod matcher;
mod registry;
mod rule;

pub use matcher::RequestMatcher;
pub use registry::{Registry, CATCH_ALL};
pub use rule::Rule;
