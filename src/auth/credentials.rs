// Account and OAuth client credentials

use std::fmt;

use crate::error::{ClientError, Result};

/// Credentials supplied by the caller, immutable after construction
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
    client_id: String,
    client_secret: String,
}

impl Credentials {
    /// Build a credential set, rejecting empty fields
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let creds = Self {
            username: username.into(),
            password: password.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        };

        for (field, value) in [
            ("username", &creds.username),
            ("password", &creds.password),
            ("client_id", &creds.client_id),
            ("client_secret", &creds.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(ClientError::missing(field));
            }
        }

        Ok(creds)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
