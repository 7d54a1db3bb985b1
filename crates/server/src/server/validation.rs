//! Request body validation. Each validator reports every problem at once.

use common::protocol::{LoginRequest, RegisterRequest, StoreCredentialRequest, UpdateProfileRequest};
use common::ServiceError;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;
const PASSWORD_MIN: usize = 6;

pub fn registration(req: &RegisterRequest) -> Result<(), ServiceError> {
    let mut errors = Vec::new();
    check_email(&req.email, &mut errors);
    check_username(&req.username, &mut errors);
    check_password(&req.password, &mut errors);
    finish(errors)
}

pub fn login(req: &LoginRequest) -> Result<(), ServiceError> {
    let mut errors = Vec::new();
    if req.email.trim().is_empty() {
        errors.push("Email is required".to_owned());
    }
    if req.password.is_empty() {
        errors.push("Password is required".to_owned());
    }
    finish(errors)
}

/// Only the fields present (and non-empty) in the update are checked.
pub fn profile_update(req: &UpdateProfileRequest) -> Result<(), ServiceError> {
    let mut errors = Vec::new();
    if let Some(email) = non_empty(&req.email) {
        check_email(email, &mut errors);
    }
    if let Some(username) = non_empty(&req.username) {
        check_username(username, &mut errors);
    }
    if let Some(password) = non_empty(&req.password) {
        check_password(password, &mut errors);
    }
    finish(errors)
}

pub fn credentials(req: &StoreCredentialRequest) -> Result<(), ServiceError> {
    let mut errors = Vec::new();
    if req.email_or_phone.trim().is_empty() {
        errors.push("Brokerage email or phone is required".to_owned());
    }
    if req.password.is_empty() {
        errors.push("Brokerage password is required".to_owned());
    }
    finish(errors)
}

/// Treat `Some("")` like an absent field.
pub fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn check_email(email: &str, errors: &mut Vec<String>) {
    if email.trim().is_empty() {
        errors.push("Email is required".to_owned());
    } else if !is_valid_email(email) {
        errors.push("Invalid email format".to_owned());
    }
}

fn check_username(username: &str, errors: &mut Vec<String>) {
    let len = username.chars().count();
    if username.trim().is_empty() {
        errors.push("Username is required".to_owned());
    } else if len < USERNAME_MIN {
        errors.push(format!("Username must be at least {USERNAME_MIN} characters"));
    } else if len > USERNAME_MAX {
        errors.push(format!("Username must be at most {USERNAME_MAX} characters"));
    } else if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        errors.push("Username can only contain letters, numbers, and underscores".to_owned());
    }
}

fn check_password(password: &str, errors: &mut Vec<String>) {
    if password.is_empty() {
        errors.push("Password is required".to_owned());
    } else if password.chars().count() < PASSWORD_MIN {
        errors.push(format!("Password must be at least {PASSWORD_MIN} characters"));
    }
}

/// `local@domain.tld`: one `@`, no whitespace, and a dot inside the domain.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

fn finish(errors: Vec<String>) -> Result<(), ServiceError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_of(r: Result<(), ServiceError>) -> Vec<String> {
        match r {
            Err(ServiceError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@sub.example.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@.co"));
        assert!(!is_valid_email("a@b."));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@@b.co"));
        assert!(!is_valid_email("a b@c.co"));
    }

    #[test]
    fn valid_registration_passes() {
        let req = RegisterRequest {
            email: "trader@example.com".into(),
            username: "day_trader_1".into(),
            password: "secret1".into(),
        };
        assert!(registration(&req).is_ok());
    }

    #[test]
    fn empty_registration_reports_every_field() {
        let errors = errors_of(registration(&RegisterRequest::default()));
        assert_eq!(
            errors,
            vec!["Email is required", "Username is required", "Password is required"]
        );
    }

    #[test]
    fn username_rules() {
        let mut errors = Vec::new();
        check_username("ab", &mut errors);
        check_username(&"a".repeat(31), &mut errors);
        check_username("bad-name", &mut errors);
        check_username(&"a".repeat(30), &mut errors);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("at least 3"));
        assert!(errors[1].contains("at most 30"));
        assert!(errors[2].contains("underscores"));
    }

    #[test]
    fn short_password_rejected() {
        let mut errors = Vec::new();
        check_password("12345", &mut errors);
        assert_eq!(errors, vec!["Password must be at least 6 characters"]);
    }

    #[test]
    fn login_requires_both_fields() {
        let errors = errors_of(login(&LoginRequest {
            email: "  ".into(),
            password: String::new(),
        }));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn profile_update_checks_only_present_fields() {
        let req = UpdateProfileRequest {
            email: Some(String::new()),
            username: None,
            password: Some("123".into()),
        };
        let errors = errors_of(profile_update(&req));
        assert_eq!(errors, vec!["Password must be at least 6 characters"]);
        assert!(profile_update(&UpdateProfileRequest::default()).is_ok());
    }

    #[test]
    fn credentials_require_login_and_password() {
        let errors = errors_of(credentials(&StoreCredentialRequest {
            email_or_phone: " ".into(),
            password: String::new(),
            mfa_enabled: false,
        }));
        assert_eq!(errors.len(), 2);
    }
}
