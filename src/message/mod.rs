pub mod body;
pub mod headers;
mod request;
mod response;

pub use body::BoxBody;
pub use request::{ProcessingRequest, Request};
pub use response::Response;
