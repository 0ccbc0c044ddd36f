//! Input validation for users and messages.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty value where one is required.
    Empty(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Username contains characters outside `[a-z0-9_.-]`.
    InvalidUsername(String),
    /// Message has neither text nor audio.
    MissingContent,
    /// Both participants are the same user.
    SelfConversation,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::InvalidUsername(msg) => write!(f, "Invalid username: {}", msg),
            ValidationError::MissingContent => {
                write!(f, "Message must contain text or audio")
            }
            ValidationError::SelfConversation => {
                write!(f, "Cannot start a conversation with yourself")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for message text, in characters.
pub const MAX_TEXT_LENGTH: usize = 4000;

/// Maximum allowed length for usernames.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Maximum allowed length for display names.
pub const MAX_FULL_NAME_LENGTH: usize = 64;

/// Treat whitespace-only text as absent.
pub fn normalize_text(text: Option<&str>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty()).map(str::to_string)
}

/// Validate the content of a message about to be created.
///
/// `text` should already be normalized with [`normalize_text`].
pub fn validate_message_content(text: Option<&str>, has_audio: bool) -> Result<(), ValidationError> {
    if text.is_none() && !has_audio {
        return Err(ValidationError::MissingContent);
    }

    if let Some(text) = text {
        let len = text.chars().count();
        if len > MAX_TEXT_LENGTH {
            return Err(ValidationError::TooLong {
                field: "message".to_string(),
                max: MAX_TEXT_LENGTH,
                actual: len,
            });
        }
    }

    Ok(())
}

/// Validate that two users can share a conversation.
pub fn validate_participants(a: &str, b: &str) -> Result<(), ValidationError> {
    if a.is_empty() || b.is_empty() {
        return Err(ValidationError::Empty("participant".to_string()));
    }
    if a == b {
        return Err(ValidationError::SelfConversation);
    }
    Ok(())
}

/// Validate a username.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::Empty("username".to_string()));
    }

    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: MAX_USERNAME_LENGTH,
            actual: username.len(),
        });
    }

    if let Some(c) = username
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-')))
    {
        return Err(ValidationError::InvalidUsername(format!(
            "unexpected character {:?}",
            c
        )));
    }

    Ok(())
}

/// Validate a display name.
pub fn validate_full_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Empty("full name".to_string()));
    }

    let len = name.chars().count();
    if len > MAX_FULL_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "full name".to_string(),
            max: MAX_FULL_NAME_LENGTH,
            actual: len,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(Some("hi")), Some("hi".to_string()));
        assert_eq!(normalize_text(Some("  hi ")), Some("  hi ".to_string()));
        assert_eq!(normalize_text(Some("   ")), None);
        assert_eq!(normalize_text(Some("")), None);
        assert_eq!(normalize_text(None), None);
    }

    #[test]
    fn test_message_content() {
        assert!(validate_message_content(Some("hi"), false).is_ok());
        assert!(validate_message_content(None, true).is_ok());
        assert!(validate_message_content(Some("hi"), true).is_ok());
        assert_eq!(
            validate_message_content(None, false),
            Err(ValidationError::MissingContent)
        );
    }

    #[test]
    fn test_message_too_long() {
        let text = "a".repeat(MAX_TEXT_LENGTH + 1);
        assert!(matches!(
            validate_message_content(Some(&text), false),
            Err(ValidationError::TooLong { .. })
        ));
        let text = "é".repeat(MAX_TEXT_LENGTH);
        assert!(validate_message_content(Some(&text), false).is_ok());
    }

    #[test]
    fn test_participants() {
        assert!(validate_participants("a", "b").is_ok());
        assert_eq!(
            validate_participants("a", "a"),
            Err(ValidationError::SelfConversation)
        );
        assert!(matches!(
            validate_participants("", "b"),
            Err(ValidationError::Empty(_))
        ));
    }

    #[test]
    fn test_username() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("a.b-c").is_ok());
        assert!(matches!(validate_username(""), Err(ValidationError::Empty(_))));
        assert!(matches!(
            validate_username("Alice"),
            Err(ValidationError::InvalidUsername(_))
        ));
        assert!(matches!(
            validate_username("has space"),
            Err(ValidationError::InvalidUsername(_))
        ));
        assert!(matches!(
            validate_username(&"a".repeat(MAX_USERNAME_LENGTH + 1)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_full_name() {
        assert!(validate_full_name("Alice Liddell").is_ok());
        assert!(matches!(validate_full_name("  "), Err(ValidationError::Empty(_))));
    }
}
