pub mod command_client;
pub mod config;
pub mod index;
pub mod lock;
pub mod registration;
pub mod replication;
pub mod service;

pub use index::Store;
pub use registration::Registration;
pub use service::Service;
