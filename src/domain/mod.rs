pub mod item;
pub mod site;
pub mod status;

pub use item::Item;
pub use site::{normalize_domain, validate_domain};
pub use status::ImageStatus;
