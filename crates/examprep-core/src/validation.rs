//! Form validation for registration and OTP verification.
//!
//! Every rule is checked and all failures are reported together.

use std::fmt;

use thiserror::Error;
use validator::{Validate, ValidationError as RuleError};

use crate::model::{ChangePasswordRequest, RegisterRequest, VerifyOtpRequest};

/// Calling codes offered at registration.
pub const COUNTRY_CODES: &[(&str, &str)] = &[
    ("+591", "Bolivia"),
    ("+54", "Argentina"),
    ("+56", "Chile"),
    ("+57", "Colombia"),
    ("+593", "Ecuador"),
    ("+51", "Perú"),
    ("+598", "Uruguay"),
    ("+58", "Venezuela"),
    ("+52", "México"),
    ("+34", "España"),
    ("+1", "Estados Unidos"),
];

pub const DEFAULT_COUNTRY_CODE: &str = "+591";

/// A single rejected field, named as the server names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid input: {}", join(.0))]
pub struct ValidationError(pub Vec<FieldError>);

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|e| e.field)
    }
}

/// Rust field name, wire name. Errors are reported in this order.
const FIELDS: &[(&str, &str)] = &[
    ("email", "email"),
    ("password", "password"),
    ("confirm_password", "confirmPassword"),
    ("first_names", "nombres"),
    ("last_names", "apellidos"),
    ("country_code", "codigo_pais"),
    ("phone", "telefono"),
    ("code", "codigo"),
    ("current_password", "currentPassword"),
    ("new_password", "newPassword"),
];

const PASSWORD_MISMATCH: &str = "Las contraseñas no coinciden";

pub(crate) fn not_blank(value: &str) -> Result<(), RuleError> {
    if value.trim().is_empty() {
        return Err(RuleError::new("blank"));
    }
    Ok(())
}

pub(crate) fn digits_only(value: &str) -> Result<(), RuleError> {
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(RuleError::new("digits"));
    }
    Ok(())
}

/// Run the derived rules, add a confirmation mismatch if any, and keep the
/// first message per field.
fn check(
    form: &impl Validate,
    confirmation: Option<(&str, &str)>,
) -> Result<(), ValidationError> {
    let report = form.validate().err().unwrap_or_default();
    let by_field = report.field_errors();
    let mut errors = Vec::new();

    for &(name, wire) in FIELDS {
        if name == "confirm_password" {
            if confirmation.is_some_and(|(password, confirm)| password != confirm) {
                errors.push(FieldError {
                    field: wire,
                    message: PASSWORD_MISMATCH.to_string(),
                });
            }
            continue;
        }
        let Some(first) = by_field.get(name).and_then(|rules| rules.first()) else {
            continue;
        };
        let message = first
            .message
            .as_deref()
            .map(str::to_string)
            .unwrap_or_else(|| first.code.to_string());
        errors.push(FieldError {
            field: wire,
            message,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError(errors))
    }
}

/// Validate a registration form. `confirm_password` must match.
pub fn validate_registration(
    request: &RegisterRequest,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    check(request, Some((request.password.as_str(), confirm_password)))
}

/// Validate an OTP verification: a phone and exactly six digits.
pub fn validate_otp(request: &VerifyOtpRequest) -> Result<(), ValidationError> {
    check(request, None)
}

/// Validate a password change. `confirm_password` must match the new one.
pub fn validate_password_change(
    request: &ChangePasswordRequest,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    check(request, Some((request.new_password.as_str(), confirm_password)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RegisterRequest {
        RegisterRequest {
            email: "ana@example.com".into(),
            password: "secreto1".into(),
            first_names: "Ana".into(),
            last_names: "Quispe".into(),
            country_code: DEFAULT_COUNTRY_CODE.into(),
            phone: "71234567".into(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(validate_registration(&valid(), "secreto1").is_ok());
    }

    #[test]
    fn collects_every_failure() {
        let request = RegisterRequest {
            email: "no-at-sign".into(),
            password: "123".into(),
            first_names: "A".into(),
            last_names: "".into(),
            country_code: " ".into(),
            phone: "12ab".into(),
        };
        let err = validate_registration(&request, "456").unwrap_err();
        let fields: Vec<_> = err.fields().collect();
        assert_eq!(
            fields,
            vec![
                "email",
                "password",
                "confirmPassword",
                "nombres",
                "apellidos",
                "codigo_pais",
                "telefono"
            ]
        );
    }

    #[test]
    fn short_phone_rejected() {
        let mut request = valid();
        request.phone = "712345".into();
        let err = validate_registration(&request, "secreto1").unwrap_err();
        assert_eq!(
            err.0[0].message,
            "El teléfono debe tener al menos 7 dígitos"
        );
    }

    #[test]
    fn email_shapes() {
        let with_email = |email: &str| RegisterRequest {
            email: email.into(),
            ..valid()
        };
        assert!(validate_registration(&with_email("a@b.co"), "secreto1").is_ok());
        for bad in ["@b.co", "a b@c.co", "a@@b.co", "no-at-sign"] {
            let err = validate_registration(&with_email(bad), "secreto1").unwrap_err();
            assert_eq!(err.fields().collect::<Vec<_>>(), vec!["email"], "{bad:?}");
        }
    }

    #[test]
    fn letters_in_phone_report_only_digits_rule() {
        let mut request = valid();
        request.phone = "12ab".into();
        let err = validate_registration(&request, "secreto1").unwrap_err();
        assert_eq!(err.0.len(), 1);
        assert_eq!(err.0[0].message, "Solo números");
    }

    #[test]
    fn messages_are_user_facing() {
        let request = VerifyOtpRequest {
            phone: " ".into(),
            code: "12".into(),
        };
        let err = validate_otp(&request).unwrap_err();
        let messages: Vec<_> = err.0.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Falta el teléfono a verificar",
                "Por favor ingresa el código de 6 dígitos"
            ]
        );
    }

    #[test]
    fn otp_must_be_six_digits() {
        let ok = VerifyOtpRequest {
            phone: "+59171234567".into(),
            code: "123456".into(),
        };
        assert!(validate_otp(&ok).is_ok());

        for code in ["12345", "1234567", "12a456", ""] {
            let req = VerifyOtpRequest {
                phone: "+59171234567".into(),
                code: code.into(),
            };
            assert!(validate_otp(&req).is_err(), "code {code:?} should fail");
        }
    }

    #[test]
    fn password_change_requires_matching_confirmation() {
        let request = ChangePasswordRequest {
            current_password: "antigua1".into(),
            new_password: "nueva123".into(),
        };
        assert!(validate_password_change(&request, "nueva123").is_ok());
        let err = validate_password_change(&request, "nueva124").unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["confirmPassword"]);
    }
}
