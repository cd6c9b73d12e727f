//! Form validation for login, registration, profile and voucher inputs.
//!
//! Every validator reports all failing fields at once.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::user::Role;

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages for one field.
    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// `Ok(value)` when no errors were recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, msgs)| format!("{}: {}", field, msgs.join(", ")))
            .collect();
        write!(f, "invalid input ({})", parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

/// A form that validates into a typed value.
pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, FieldErrors>;
}

/// Login screen input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Validated login input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Validate for LoginForm {
    type Output = Credentials;

    fn validate(self) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = normalize_email(&self.email);
        check_email(&mut errors, &email);
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result(Credentials {
            email,
            password: self.password,
        })
    }
}

/// Registration screen input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub role: Role,
}

/// Validated registration input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl Validate for RegisterForm {
    type Output = Registration;

    fn validate(self) -> Result<Registration, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = self.name.trim().to_string();
        let email = normalize_email(&self.email);

        check_name(&mut errors, &name);
        check_email(&mut errors, &email);

        if self.password.chars().count() < 8 {
            errors.add("password", "Password must be at least 8 characters");
        }
        if !self.password.chars().any(|c| c.is_alphabetic())
            || !self.password.chars().any(|c| c.is_ascii_digit())
        {
            errors.add("password", "Password must contain a letter and a number");
        }
        if self.password != self.confirm_password {
            errors.add("confirmPassword", "Passwords do not match");
        }

        errors.into_result(Registration {
            name,
            email,
            password: self.password,
            role: self.role,
        })
    }
}

/// Profile editing input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Validated profile edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl Validate for ProfileForm {
    type Output = ProfileUpdate;

    fn validate(self) -> Result<ProfileUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = self.name.trim().to_string();
        let email = normalize_email(&self.email);
        check_name(&mut errors, &name);
        check_email(&mut errors, &email);

        let phone = self
            .phone
            .map(|p| p.chars().filter(|c| !c.is_whitespace() && *c != '-').collect::<String>())
            .filter(|p| !p.is_empty());
        if let Some(phone) = &phone {
            let digits = phone.strip_prefix('+').unwrap_or(phone);
            if !(10..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
                errors.add("phone", "Phone number must have 10 to 15 digits");
            }
        }

        errors.into_result(ProfileUpdate { name, email, phone })
    }
}

/// Voucher input box.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoucherForm {
    pub code: String,
}

impl Validate for VoucherForm {
    /// Upper-cased code.
    type Output = String;

    fn validate(self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        let code = self.code.trim().to_uppercase();
        if code.is_empty() {
            errors.add("code", "Please enter a voucher code");
        } else if code.len() > 20 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.add("code", "Voucher codes are up to 20 letters and digits");
        }
        errors.into_result(code)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.is_empty() {
        errors.add("email", "Email is required");
        return;
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    };
    if !valid {
        errors.add("email", "Enter a valid email address");
    }
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    let len = name.chars().count();
    if !(2..=50).contains(&len) {
        errors.add("name", "Name must be between 2 and 50 characters");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_ok() {
        let creds = LoginForm {
            email: "  Asha@Greens.test ".into(),
            password: "pw".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(creds.email, "asha@greens.test");
    }

    #[test]
    fn test_login_reports_every_field() {
        let errors = LoginForm::default().validate().unwrap_err();
        let fields: Vec<_> = errors.fields().collect();
        assert_eq!(fields, vec!["email", "password"]);
    }

    #[test]
    fn test_bad_emails() {
        for email in ["asha", "@greens.test", "asha@greens", "asha@@greens.test", "asha@greens."] {
            let errors = LoginForm {
                email: email.into(),
                password: "pw".into(),
            }
            .validate()
            .unwrap_err();
            assert_eq!(errors.get("email"), ["Enter a valid email address"], "{email}");
        }
    }

    #[test]
    fn test_register() {
        let form = RegisterForm {
            name: "Asha".into(),
            email: "asha@greens.test".into(),
            password: "leafy123".into(),
            confirm_password: "leafy123".into(),
            role: Role::Seller,
        };
        let reg = form.validate().unwrap();
        assert_eq!(reg.role, Role::Seller);
    }

    #[test]
    fn test_register_password_rules() {
        let form = RegisterForm {
            name: "A".into(),
            email: "asha@greens.test".into(),
            password: "short".into(),
            confirm_password: "other".into(),
            role: Role::Buyer,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("password").len(), 2);
        assert_eq!(errors.get("confirmPassword"), ["Passwords do not match"]);
        assert_eq!(errors.get("name").len(), 1);
    }

    #[test]
    fn test_profile_phone() {
        let ok = ProfileForm {
            name: "Asha".into(),
            email: "asha@greens.test".into(),
            phone: Some("+1 555-123-4567".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(ok.phone.as_deref(), Some("+15551234567"));

        let blank = ProfileForm {
            name: "Asha".into(),
            email: "asha@greens.test".into(),
            phone: Some("   ".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(blank.phone, None);

        let errors = ProfileForm {
            name: "Asha".into(),
            email: "asha@greens.test".into(),
            phone: Some("12ab".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("phone").len(), 1);
    }

    #[test]
    fn test_voucher_form() {
        let code = VoucherForm { code: " welcome ".into() }.validate().unwrap();
        assert_eq!(code, "WELCOME");
        assert!(VoucherForm { code: "".into() }.validate().is_err());
        assert!(VoucherForm { code: "SAVE-10".into() }.validate().is_err());
    }

    #[test]
    fn test_display() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Email is required");
        assert_eq!(errors.to_string(), "invalid input (email: Email is required)");
    }
}
