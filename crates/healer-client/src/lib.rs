pub mod api;
mod http;
mod models;
pub mod vault;

pub use api::HttpBackend;
pub use vault::KeyringVault;
