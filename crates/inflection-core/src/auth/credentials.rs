use std::fmt;

use crate::validation::{validate_email, ValidationError};

/// Account email and password, fixed for the lifetime of the process.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    secret: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, secret: impl Into<String>) -> Result<Self, ValidationError> {
        let email = email.into().trim().to_string();
        let secret = secret.into();

        validate_email(&email)?;
        if secret.trim().is_empty() {
            return Err(ValidationError::MissingPassword);
        }

        Ok(Self { email, secret })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

// Keep the password out of logs and panic messages
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_inputs() {
        assert!(Credentials::new("ops@example.com", "hunter2").is_ok());
        assert_eq!(
            Credentials::new("not-an-email", "hunter2"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            Credentials::new("ops@example.com", "   "),
            Err(ValidationError::MissingPassword)
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new(" ops@example.com ", "hunter2").unwrap();
        assert_eq!(creds.email(), "ops@example.com");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
