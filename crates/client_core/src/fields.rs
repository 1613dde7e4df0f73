//! Form input checked before any request is sent.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("You can't leave any fields blank.")]
    MissingFields,
    #[error("Passwords must match.")]
    PasswordsDoNotMatch,
}

fn all_filled(fields: &[&str]) -> Result<(), FieldError> {
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(FieldError::MissingFields);
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginFields {
    pub email: String,
    pub password: String,
}

impl LoginFields {
    pub fn validate(&self) -> Result<(), FieldError> {
        all_filled(&[self.email.as_str(), self.password.as_str()])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationFields {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationFields {
    pub fn validate(&self) -> Result<(), FieldError> {
        all_filled(&[
            self.email.as_str(),
            self.username.as_str(),
            self.password.as_str(),
            self.confirm_password.as_str(),
        ])?;
        if self.password != self.confirm_password {
            return Err(FieldError::PasswordsDoNotMatch);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordFields {
    pub current_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

impl PasswordFields {
    pub fn validate(&self) -> Result<(), FieldError> {
        all_filled(&[
            self.current_password.as_str(),
            self.new_password.as_str(),
            self.confirm_new_password.as_str(),
        ])?;
        if self.new_password != self.confirm_new_password {
            return Err(FieldError::PasswordsDoNotMatch);
        }
        Ok(())
    }
}
