pub mod checklist;
pub mod config;
pub mod dom;
pub mod harness;
pub mod lessons;
pub mod model;
pub mod page;
pub mod playground;
pub mod record;
pub mod site;
pub mod store;
pub mod todo;
#[cfg(feature = "web")]
pub mod web_storage;
