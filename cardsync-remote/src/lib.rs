pub mod client;
pub mod config;
pub mod types;

pub use client::HttpCollectionService;
pub use config::RemoteConfig;
pub use types::BackupResponse;
