use std::fmt;
use std::hash::{Hash, Hasher};

use strum::{Display, EnumIter};

/// The kind of entity a [`Token`] points at, stored in the token's high byte.
///
/// The values mirror the CLI metadata table ids so tokens read familiar in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[repr(u8)]
pub enum TokenTable {
    /// A type definition
    TypeDef = 0x02,
    /// A method, accessor or constructor
    MethodDef = 0x06,
    /// An event
    Event = 0x14,
    /// A property
    Property = 0x17,
}

impl TokenTable {
    /// Maps a raw table byte back to a `TokenTable`
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x02 => Some(TokenTable::TypeDef),
            0x06 => Some(TokenTable::MethodDef),
            0x14 => Some(TokenTable::Event),
            0x17 => Some(TokenTable::Property),
            _ => None,
        }
    }
}

/// Identity of a registered type or member.
///
/// A token consists of a 32-bit value where:
/// - The high byte (bits 24-31) indicates the [`TokenTable`]
/// - The low 24 bits (bits 0-23) are the row allocated by the owning registry
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a token for `row` in `table`
    #[must_use]
    pub fn from_parts(table: TokenTable, row: u32) -> Self {
        Token((u32::from(table as u8) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table kind from the token (high byte)
    #[must_use]
    pub fn table(&self) -> Option<TokenTable> {
        TokenTable::from_byte((self.0 >> 24) as u8)
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if this is a null token (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table() {
            Some(table) => write!(f, "Token(0x{:08x}, {}, row: {})", self.0, table, self.row()),
            None => write!(f, "Token(0x{:08x})", self.0),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_token_from_parts() {
        let token = Token::from_parts(TokenTable::MethodDef, 7);
        assert_eq!(token.value(), 0x0600_0007);
        assert_eq!(token.table(), Some(TokenTable::MethodDef));
        assert_eq!(token.row(), 7);
    }

    #[test]
    fn test_token_table_roundtrip() {
        for table in TokenTable::iter() {
            assert_eq!(TokenTable::from_byte(table as u8), Some(table));
        }
        assert_eq!(TokenTable::from_byte(0x42), None);
    }

    #[test]
    fn test_token_is_null() {
        assert!(Token(0).is_null());
        assert!(!Token::from_parts(TokenTable::TypeDef, 1).is_null());
    }

    #[test]
    fn test_token_hash_follows_value() {
        let mut seen = std::collections::HashSet::new();
        assert!(seen.insert(Token::from_parts(TokenTable::TypeDef, 1)));
        assert!(!seen.insert(Token(0x0200_0001)));
        assert!(seen.insert(Token::from_parts(TokenTable::MethodDef, 1)));
    }

    #[test]
    fn test_token_display_and_debug() {
        let token = Token::from_parts(TokenTable::Property, 3);
        assert_eq!(format!("{token}"), "0x17000003");
        assert_eq!(format!("{token:?}"), "Token(0x17000003, Property, row: 3)");
    }
}
