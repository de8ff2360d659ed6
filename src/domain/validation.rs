use std::str::FromStr;

use lettre::Address;
use validator::{ValidateEmail, ValidationError};

use crate::constants::{EMAIL_MAX_LEN, MESSAGE_MAX_LEN, NAME_MAX_LEN};

fn rule_error(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Shared by all text fields: present, not blank after trimming, within `max` characters.
fn required_text(
    value: Option<&str>,
    max: u64,
    missing: &str,
    too_long: &str,
) -> Result<(), ValidationError> {
    let trimmed = value.map(str::trim).unwrap_or_default();

    if trimmed.is_empty() {
        return Err(rule_error("required", missing.to_string()));
    }
    if trimmed.chars().count() as u64 > max {
        let mut error = rule_error("length", too_long.to_string());
        error.add_param("max".into(), &max);
        return Err(error);
    }

    Ok(())
}

pub fn validate_name(name: Option<&str>) -> Result<(), ValidationError> {
    required_text(
        name,
        NAME_MAX_LEN,
        "Vul je naam in.",
        &format!("Je naam mag maximaal {} tekens bevatten.", NAME_MAX_LEN),
    )
}

pub fn validate_email_address(email: Option<&str>) -> Result<(), ValidationError> {
    required_text(
        email,
        EMAIL_MAX_LEN,
        "Vul je e-mailadres in.",
        &format!("Je e-mailadres mag maximaal {} tekens bevatten.", EMAIL_MAX_LEN),
    )?;

    // The SMTP transport parses addresses with lettre, which rejects some
    // local parts (`a.@b.nl`, `.a@b.nl`) that the HTML5 grammar allows.
    let trimmed = email.map(str::trim).unwrap_or_default();
    if !trimmed.validate_email() || Address::from_str(trimmed).is_err() {
        return Err(rule_error("email", "Vul een geldig e-mailadres in.".to_string()));
    }

    Ok(())
}

pub fn validate_message(message: Option<&str>) -> Result<(), ValidationError> {
    required_text(
        message,
        MESSAGE_MAX_LEN,
        "Vul een bericht in.",
        &format!("Je bericht mag maximaal {} tekens bevatten.", MESSAGE_MAX_LEN),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_required() {
        for value in [None, Some(""), Some("   \n\t")] {
            assert_eq!(validate_name(value).unwrap_err().code, "required");
            assert_eq!(validate_email_address(value).unwrap_err().code, "required");
            assert_eq!(validate_message(value).unwrap_err().code, "required");
        }
    }

    #[test]
    fn email_grammar_is_checked() {
        assert!(validate_email_address(Some("jan@voorbeeld.nl")).is_ok());
        assert!(validate_email_address(Some("  jan@voorbeeld.nl ")).is_ok());

        for bad in ["not-an-email", "jan@", "@voorbeeld.nl", "jan de vries@voorbeeld.nl"] {
            let err = validate_email_address(Some(bad)).unwrap_err();
            assert_eq!(err.code, "email", "{bad} should be rejected");
        }
    }

    #[test]
    fn rejects_addresses_the_mail_transport_cannot_parse() {
        for bad in ["a.@b.nl", ".a@b.nl", "jan..de.vries@voorbeeld.nl"] {
            let err = validate_email_address(Some(bad)).unwrap_err();
            assert_eq!(err.code, "email", "{bad} should be rejected");
        }
        assert!(validate_email_address(Some("jan.de.vries+club@voorbeeld.nl")).is_ok());
    }

    #[test]
    fn length_is_counted_in_characters() {
        let at_limit = "é".repeat(NAME_MAX_LEN as usize);
        assert!(validate_name(Some(&at_limit)).is_ok());

        let over_limit = "é".repeat(NAME_MAX_LEN as usize + 1);
        assert_eq!(validate_name(Some(&over_limit)).unwrap_err().code, "length");
    }

    #[test]
    fn message_limit_is_enforced() {
        let message = "a".repeat(MESSAGE_MAX_LEN as usize + 1);
        assert_eq!(validate_message(Some(&message)).unwrap_err().code, "length");
        assert!(validate_message(Some(&message[1..])).is_ok());
    }
}
