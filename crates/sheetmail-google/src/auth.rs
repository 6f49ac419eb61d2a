use async_trait::async_trait;
use sheetmail_types::{Result, SheetMailError};

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_ACCESS_TOKEN";

/// Supplies a bearer token that is valid right now.
///
/// Refreshing expired tokens is the provider's business; callers ask for a
/// token before every request and never cache it.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed, externally obtained access token.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let token = std::env::var(ACCESS_TOKEN_ENV).map_err(|_| SheetMailError::AuthError {
            service: "google".into(),
        })?;
        Ok(Self::new(token))
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        if self.token.trim().is_empty() {
            return Err(SheetMailError::AuthError {
                service: "google".into(),
            });
        }
        Ok(self.token.clone())
    }
}
