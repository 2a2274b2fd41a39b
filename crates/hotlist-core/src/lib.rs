#![forbid(unsafe_code)]

pub mod errors;
pub mod event;
pub mod list;
pub mod schema;
pub mod settings;
pub mod templates;
pub mod traits;
pub mod types;
