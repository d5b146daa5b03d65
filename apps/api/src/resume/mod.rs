pub mod extract;
pub mod fields;
pub mod handlers;
pub mod ingest;
pub mod store;
