//! Input validation functions
//!
//! This module provides validation utilities for user input. The rules are
//! shared so API clients can pre-validate before hitting the backend.

/// Validate username format
///
/// Usernames are the public handle embedded in verification links, so the
/// allowed alphabet is deliberately narrow.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.len() < 2 {
        return Err("Username must be at least 2 characters".to_string());
    }
    if username.len() > 20 {
        return Err("Username must be at most 20 characters".to_string());
    }
    let username_regex = regex_lite::Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();
    if !username_regex.is_match(username) {
        return Err("Username may only contain letters, digits and underscores".to_string());
    }
    Ok(())
}

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if email.len() > 255 {
        return Err("Email too long".to_string());
    }
    let email_regex = regex_lite::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    if !email_regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters".to_string());
    }
    if password.len() > 128 {
        return Err("Password too long".to_string());
    }
    Ok(())
}
