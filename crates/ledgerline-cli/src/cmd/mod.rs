pub mod ingest;
pub mod show_config;
