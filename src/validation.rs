//! Name validation for readers and their buddies.
//!
//! Names show up on screen and inside sync payloads, so they are kept short and
//! free of control characters. Children's names come in every script, so
//! Unicode letters are allowed.

use std::collections::HashSet;

/// Name validation errors with helpful messages
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("Name is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("Name is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Name cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Name contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Name is reserved")]
    Reserved,
}

/// Name validation rules configuration
#[derive(Debug, Clone)]
pub struct NameRules {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_spaces: bool,
    pub allow_unicode: bool,
}

impl NameRules {
    /// Reader names: a first name, maybe with a last name.
    pub fn reader() -> Self {
        NameRules {
            min_length: 1,
            max_length: 24,
            allow_spaces: true,
            allow_unicode: true,
        }
    }

    /// Buddy names are shown inside speech bubbles; keep them to one short word.
    pub fn buddy() -> Self {
        NameRules {
            min_length: 2,
            max_length: 16,
            allow_spaces: false,
            allow_unicode: true,
        }
    }
}

fn reserved_names() -> HashSet<&'static str> {
    ["admin", "root", "system", "null", "undefined", "none"]
        .iter()
        .copied()
        .collect()
}

/// Validate a name according to the given rules. Length counts characters, not bytes.
pub fn validate_name(name: &str, rules: &NameRules) -> Result<String, NameError> {
    let trimmed = name.trim();
    if trimmed != name {
        return Err(NameError::InvalidWhitespace);
    }

    let length = trimmed.chars().count();
    if length < rules.min_length {
        return Err(NameError::TooShort {
            min: rules.min_length,
        });
    }
    if length > rules.max_length {
        return Err(NameError::TooLong {
            max: rules.max_length,
        });
    }

    if reserved_names().contains(trimmed.to_lowercase().as_str()) {
        return Err(NameError::Reserved);
    }

    let mut invalid: Vec<char> = trimmed
        .chars()
        .filter(|&ch| {
            let valid = if ch.is_ascii_alphanumeric() || ch == '-' || ch == '\'' || ch == '.' {
                true
            } else if ch == ' ' {
                rules.allow_spaces
            } else if ch.is_alphabetic() && !ch.is_ascii() {
                rules.allow_unicode
            } else {
                false
            };
            !valid
        })
        .collect();

    if !invalid.is_empty() {
        invalid.sort_unstable();
        invalid.dedup();
        let chars = invalid
            .iter()
            .map(|c| {
                if c.is_control() {
                    format!("\\u{{{:04x}}}", *c as u32)
                } else {
                    c.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        return Err(NameError::InvalidCharacters { chars });
    }

    Ok(trimmed.to_string())
}

pub fn validate_reader_name(name: &str) -> Result<String, NameError> {
    validate_name(name, &NameRules::reader())
}

pub fn validate_buddy_name(name: &str) -> Result<String, NameError> {
    validate_name(name, &NameRules::buddy())
}
