//! User Identity Capture
//!
//! Scans free-form human text for a customer identifier so the identity
//! phase can unlock the rest of the conversation. The accepted shape is
//! the literal prefix `user_` followed by one or more digits, anywhere in
//! the message, case-insensitive ("My ID is USER_789, thanks" matches).

use crate::models::UserId;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref USER_ID_PATTERN: Regex =
        Regex::new(r"(?i)user_\d+").expect("user id pattern is valid");
}

/// Extract the first customer identifier from a human turn, normalized
/// to lowercase. Returns None when the text carries no identifier.
pub fn extract_user_id(content: &str) -> Option<UserId> {
    USER_ID_PATTERN
        .find(content)
        .map(|m| UserId::new(m.as_str().to_lowercase()))
}
