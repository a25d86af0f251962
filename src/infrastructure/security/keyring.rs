use crate::domain::error::{AppError, Result};
use keyring::Entry;

/// OS credential store scoped to one service name.
pub struct KeyringManager {
    service: String,
}

impl KeyringManager {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, account: &str) -> Result<Entry> {
        Entry::new(&self.service, account).map_err(|e| {
            AppError::SecurityError(format!("Failed to open keyring entry {}: {}", account, e))
        })
    }

    pub fn set_secret(&self, account: &str, secret: &str) -> Result<()> {
        if secret.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Refusing to store an empty secret".to_string(),
            ));
        }

        self.entry(account)?
            .set_password(secret)
            .map_err(|e| AppError::SecurityError(format!("Failed to store secret: {}", e)))
    }

    pub fn get_secret(&self, account: &str) -> Result<String> {
        match self.entry(account)?.get_password() {
            Ok(secret) => Ok(secret),
            Err(keyring::Error::NoEntry) => Err(AppError::NotFound(format!(
                "No secret stored for {}/{}",
                self.service, account
            ))),
            Err(e) => Err(AppError::SecurityError(format!("Failed to read secret: {}", e))),
        }
    }

    pub fn delete_secret(&self, account: &str) -> Result<()> {
        match self.entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AppError::SecurityError(format!("Failed to delete secret: {}", e))),
        }
    }
}
