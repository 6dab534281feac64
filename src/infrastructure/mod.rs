pub mod config;
pub mod document_store;
pub mod error;
pub mod identity;
pub mod logging;
pub mod rest_store;
pub mod sqlite_store;
