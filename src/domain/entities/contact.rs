use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationErrors};

use crate::constants::CONTACT_SUCCESS_MESSAGE;
use crate::domain::validation::{validate_email_address, validate_message, validate_name};

/// Raw contact form as posted by the website. Every field is optional so a
/// missing field surfaces as a validation error instead of an extractor error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
}

/// Non-string values (numbers, arrays, null) are treated as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Field {
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match Field::deserialize(deserializer)? {
        Field::Text(text) => Some(text),
        Field::Other(_) => None,
    })
}

impl ContactForm {
    pub fn new(name: impl Into<String>, email: impl Into<String>, message: impl Into<String>) -> Self {
        ContactForm {
            name: Some(name.into()),
            email: Some(email.into()),
            message: Some(message.into()),
        }
    }
}

impl Validate for ContactForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_name(self.name.as_deref()) {
            errors.add("name", e);
        }
        if let Err(e) = validate_email_address(self.email.as_deref()) {
            errors.add("email", e);
        }
        if let Err(e) = validate_message(self.message.as_deref()) {
            errors.add("message", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A contact form that passed validation. Only obtainable through
/// `TryFrom<ContactForm>`, so holding one means every field is valid.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactSubmission {
    name: String,
    email: String,
    message: String,
}

impl ContactSubmission {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl TryFrom<ContactForm> for ContactSubmission {
    type Error = ValidationErrors;

    fn try_from(form: ContactForm) -> Result<Self, Self::Error> {
        form.validate()?;

        let trimmed = |value: Option<String>| value.unwrap_or_default().trim().to_string();

        Ok(ContactSubmission {
            name: trimmed(form.name),
            email: trimmed(form.email),
            message: trimmed(form.message),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

impl ContactResponse {
    pub fn sent() -> Self {
        ContactResponse {
            success: true,
            message: CONTACT_SUCCESS_MESSAGE.to_string(),
        }
    }
}
