// OV-chipkaart client - library root

pub mod config;
pub mod error;
pub mod auth;
pub mod http_client;
pub mod models;
pub mod client;

pub use auth::{Credentials, TokenManager};
pub use client::OvChipkaartClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
