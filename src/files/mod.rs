mod content;
mod file;
mod location;
mod validator;

pub use content::ResponseContent;
pub use file::{mime_for, File};
pub use location::FolderLocation;
pub use validator::RequestPathValidator;
