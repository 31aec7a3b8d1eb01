use std::fmt;

use thiserror::Error;

use crate::{EMAIL_OFFSET, EMAIL_SIZE, ID_OFFSET, ID_SIZE, ROW_SIZE, USERNAME_OFFSET, USERNAME_SIZE};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RowError {
    #[error("String is too long.")]
    StringTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("ID must be positive.")]
    NegativeId,

    #[error("Syntax error. Could not parse statement.")]
    InvalidId(String),
}

/// Text column backed by a fixed-capacity buffer. `len` is tracked explicitly,
/// bytes past it are always zero.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedText<const N: usize> {
    len: usize,
    bytes: [u8; N],
}

impl<const N: usize> FixedText<N> {
    fn new(field: &'static str, text: &str) -> Result<Self, RowError> {
        let src = text.as_bytes();
        if src.len() > N {
            return Err(RowError::StringTooLong {
                field,
                len: src.len(),
                max: N,
            });
        }
        let mut bytes = [0u8; N];
        bytes[..src.len()].copy_from_slice(src);
        Ok(Self {
            len: src.len(),
            bytes,
        })
    }

    /// Recovers a field from its on-disk form by dropping trailing NUL padding.
    fn from_padded(src: &[u8]) -> Self {
        let len = src.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let mut bytes = [0u8; N];
        bytes[..len].copy_from_slice(&src[..len]);
        Self { len, bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> fmt::Display for FixedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl<const N: usize> fmt::Debug for FixedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Row {
    pub id: u64,
    pub username: FixedText<USERNAME_SIZE>,
    pub email: FixedText<EMAIL_SIZE>,
}

impl Row {
    pub fn new(id: u64, username: &str, email: &str) -> Result<Self, RowError> {
        Ok(Self {
            id,
            username: FixedText::new("username", username)?,
            email: FixedText::new("email", email)?,
        })
    }

    /// Builds a row from the raw arguments of an insert statement.
    pub fn parse(id: &str, username: &str, email: &str) -> Result<Self, RowError> {
        let id = match id.parse::<u64>() {
            Ok(id) => id,
            Err(_) if id.parse::<i64>().is_ok_and(|v| v < 0) => return Err(RowError::NegativeId),
            Err(_) => return Err(RowError::InvalidId(id.to_string())),
        };
        Self::new(id, username, email)
    }

    /// Writes the row into `dst`, which must be exactly `ROW_SIZE` bytes.
    pub fn serialize(&self, dst: &mut [u8]) {
        debug_assert_eq!(dst.len(), ROW_SIZE);
        dst.fill(0);
        dst[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        dst[USERNAME_OFFSET..USERNAME_OFFSET + self.username.len()]
            .copy_from_slice(self.username.as_bytes());
        dst[EMAIL_OFFSET..EMAIL_OFFSET + self.email.len()].copy_from_slice(self.email.as_bytes());
    }

    pub fn to_bytes(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        self.serialize(&mut buf);
        buf
    }

    /// Decodes a `ROW_SIZE` block. Any bytes decode to some row.
    pub fn deserialize(src: &[u8]) -> Self {
        debug_assert_eq!(src.len(), ROW_SIZE);
        let mut id = [0u8; ID_SIZE];
        id.copy_from_slice(&src[ID_OFFSET..ID_OFFSET + ID_SIZE]);
        Self {
            id: u64::from_le_bytes(id),
            username: FixedText::from_padded(&src[USERNAME_OFFSET..EMAIL_OFFSET]),
            email: FixedText::from_padded(&src[EMAIL_OFFSET..ROW_SIZE]),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_layout() {
        let row = Row::new(0x0102_0304_0506_0708, "tony", "sqlite@google.com").unwrap();
        let bytes = row.to_bytes();

        assert_eq!(bytes.len(), 295);
        assert_eq!(&bytes[..8], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(&bytes[8..12], b"tony");
        assert!(bytes[12..40].iter().all(|&b| b == 0));
        assert_eq!(&bytes[40..57], b"sqlite@google.com");
        assert!(bytes[57..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_round_trip() {
        let row = Row::new(1, "tony", "sqlite@google.com").unwrap();
        let decoded = Row::deserialize(&row.to_bytes());
        assert_eq!(decoded, row);
        assert_eq!(decoded.username.to_string(), "tony");
        assert_eq!(decoded.email.to_string(), "sqlite@google.com");
    }

    #[test]
    fn test_round_trip_max_length_fields() {
        let username = "u".repeat(USERNAME_SIZE);
        let email = "e".repeat(EMAIL_SIZE);
        let row = Row::new(u64::MAX, &username, &email).unwrap();
        assert_eq!(Row::deserialize(&row.to_bytes()), row);
    }

    #[test]
    fn test_empty_fields() {
        let row = Row::new(0, "", "").unwrap();
        let decoded = Row::deserialize(&row.to_bytes());
        assert!(decoded.username.is_empty());
        assert!(decoded.email.is_empty());
        assert_eq!(decoded.to_string(), "(0, , )");
    }

    #[test]
    fn test_too_long_fields() {
        let err = Row::new(1, &"a".repeat(USERNAME_SIZE + 1), "a@b").unwrap_err();
        assert_eq!(
            err,
            RowError::StringTooLong {
                field: "username",
                len: 33,
                max: 32
            }
        );

        let err = Row::new(1, "a", &"a".repeat(EMAIL_SIZE + 1)).unwrap_err();
        assert!(matches!(err, RowError::StringTooLong { field: "email", .. }));
    }

    #[test]
    fn test_length_is_counted_in_bytes() {
        // 11 three-byte characters = 33 bytes
        let username = "\u{20ac}".repeat(11);
        assert!(matches!(
            Row::new(1, &username, "x"),
            Err(RowError::StringTooLong { len: 33, .. })
        ));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(Row::parse("42", "a", "b").unwrap().id, 42);
        assert_eq!(Row::parse("-1", "a", "b").unwrap_err(), RowError::NegativeId);
        assert_eq!(
            Row::parse("abc", "a", "b").unwrap_err(),
            RowError::InvalidId("abc".to_string())
        );
    }

    #[test]
    fn test_deserialize_garbage_never_fails() {
        let bytes = [0xffu8; ROW_SIZE];
        let row = Row::deserialize(&bytes);
        assert_eq!(row.id, u64::MAX);
        assert_eq!(row.username.len(), USERNAME_SIZE);
        assert_eq!(row.email.len(), EMAIL_SIZE);
    }

    #[test]
    fn test_display() {
        let row = Row::new(1, "user1", "person1@example.com").unwrap();
        assert_eq!(row.to_string(), "(1, user1, person1@example.com)");
    }
}
