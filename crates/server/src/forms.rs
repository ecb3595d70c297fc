//! Form payloads and their validation rules.

use serde::Deserialize;
use userdesk_data::user::normalize_email;
use validator::{Validate, ValidationError, ValidationErrors};

pub const MIN_PASSWORD_LEN: u64 = 6;

const REGISTER_FIELDS: &[&str] = &["email", "password", "password2", "name"];
const PROFILE_FIELDS: &[&str] = &["email", "name"];

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Runs the derived rules and returns the failed messages in `fields` order.
fn messages<T: Validate>(form: &T, fields: &[&str]) -> Vec<String> {
    let Err(errors) = form.validate() else {
        return Vec::new();
    };
    collect_messages(&errors, fields)
}

fn collect_messages(errors: &ValidationErrors, fields: &[&str]) -> Vec<String> {
    let by_field = errors.field_errors();
    fields
        .iter()
        .filter_map(|field| by_field.get(*field))
        .flat_map(|errors| errors.iter())
        .filter_map(|error| error.message.as_ref().map(|message| message.to_string()))
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterForm {
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(
        min = MIN_PASSWORD_LEN,
        message = "Password must be at least 6 characters long"
    ))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords must match"))]
    pub password2: String,
}

impl RegisterForm {
    /// Trims the free-text fields. Passwords are kept verbatim.
    pub fn trimmed(mut self) -> Self {
        self.name = self.name.trim().to_owned();
        self.email = self.email.trim().to_owned();
        self
    }

    /// Returns every failed rule, in form order.
    pub fn errors(&self) -> Vec<String> {
        messages(self, REGISTER_FIELDS)
    }

    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ProfileForm {
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
}

impl ProfileForm {
    pub fn trimmed(mut self) -> Self {
        self.name = self.name.trim().to_owned();
        self.email = self.email.trim().to_owned();
        self
    }

    pub fn errors(&self) -> Vec<String> {
        messages(self, PROFILE_FIELDS)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddUserForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

impl AddUserForm {
    pub fn is_complete(&self) -> bool {
        ![&self.username, &self.email, &self.password, &self.role]
            .into_iter()
            .any(|field| is_blank(field))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUserForm {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IdForm {
    pub id: String,
}
