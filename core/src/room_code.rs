use std::fmt;

use thiserror::Error;

pub const ROOM_CODE_MAX_LEN: usize = 32;
pub const DISPLAY_NAME_MAX_LEN: usize = 40;

/// Room code as typed by a player, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn parse(value: &str) -> Result<Self, RoomCodeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(RoomCodeError::Empty);
        }
        let len = trimmed.chars().count();
        if len > ROOM_CODE_MAX_LEN {
            return Err(RoomCodeError::TooLong {
                max: ROOM_CODE_MAX_LEN,
                found: len,
            });
        }
        for (idx, ch) in trimmed.chars().enumerate() {
            if ch.is_whitespace() || ch.is_control() {
                return Err(RoomCodeError::InvalidCharacter { ch, index: idx });
            }
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomCodeError {
    #[error("room code is empty")]
    Empty,
    #[error("room code must be at most {max} chars, got {found}")]
    TooLong { max: usize, found: usize },
    #[error("invalid character {ch:?} at position {index}")]
    InvalidCharacter { ch: char, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("display name is empty")]
    EmptyName,
    #[error("display name must be at most {max} chars, got {found}")]
    NameTooLong { max: usize, found: usize },
    #[error("observer pin is empty")]
    EmptyPin,
}

/// Trims a player display name and checks it is usable in the join handshake.
pub fn parse_display_name(value: &str) -> Result<String, CredentialError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::EmptyName);
    }
    let len = trimmed.chars().count();
    if len > DISPLAY_NAME_MAX_LEN {
        return Err(CredentialError::NameTooLong {
            max: DISPLAY_NAME_MAX_LEN,
            found: len,
        });
    }
    Ok(trimmed.to_string())
}

/// The observer pin is opaque; only surrounding whitespace is stripped.
pub fn parse_observer_pin(value: &str) -> Result<String, CredentialError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::EmptyPin);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_code_is_trimmed() {
        let code = RoomCode::parse("  ABC123 ").expect("valid code");
        assert_eq!(code.as_str(), "ABC123");
    }

    #[test]
    fn room_code_rejects_inner_whitespace() {
        assert_eq!(
            RoomCode::parse("AB C"),
            Err(RoomCodeError::InvalidCharacter { ch: ' ', index: 2 })
        );
        assert_eq!(RoomCode::parse("   "), Err(RoomCodeError::Empty));
    }

    #[test]
    fn pin_and_name_are_trimmed() {
        assert_eq!(parse_observer_pin(" 042 ").as_deref(), Ok("042"));
        assert_eq!(parse_display_name(""), Err(CredentialError::EmptyName));
        assert_eq!(parse_display_name(" Ana ").as_deref(), Ok("Ana"));
    }
}
