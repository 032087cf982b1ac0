// Authentication types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Login credentials for one OpenList server
#[derive(Clone, PartialEq)]
pub struct Credentials {
    /// Base URL without trailing slash, e.g. `https://openlist.example.com`
    pub host: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Bearer token held by the client
#[derive(Debug, Clone, PartialEq)]
pub struct SessionToken {
    pub value: String,
    pub acquired_at: DateTime<Utc>,
}

/// Body of `POST /api/auth/login/hash`
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub otp_code: &'a str,
}
