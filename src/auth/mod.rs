// Authentication module
// Manages the login, refresh and data token lifecycle

mod types;
mod credentials;
mod exchange;
mod manager;

pub use credentials::Credentials;
pub use manager::TokenManager;
pub use types::TokenData;
