//! Structural failure types for sheet mutations.
//!
//! These abort the requested operation and surface to the immediate caller;
//! computational failures (`Value::Error`) are data, not errors, and never
//! appear here.

use crate::position::Position;

/// Error type for sheet operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetError {
    /// Position outside sheet bounds; raised before the store is touched.
    InvalidPosition(Position),
    /// Formula text failed to parse. The mutation had no effect.
    FormulaSyntax(String),
    /// The new formula would make the dependency graph cyclic.
    /// The mutation had no effect.
    CircularDependency(Position),
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::InvalidPosition(pos) => {
                write!(f, "cell position {} is out of bounds", pos)
            }
            SheetError::FormulaSyntax(msg) => write!(f, "formula syntax error: {}", msg),
            SheetError::CircularDependency(pos) => {
                write!(f, "formula at {} would create a circular reference", pos)
            }
        }
    }
}

impl std::error::Error for SheetError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = SheetError::InvalidPosition(Position::new(-1, -1));
        assert_eq!(err.to_string(), "cell position (-1, -1) is out of bounds");

        let err = SheetError::FormulaSyntax("unexpected character: ?".to_string());
        assert_eq!(err.to_string(), "formula syntax error: unexpected character: ?");

        let err = SheetError::CircularDependency(Position::new(0, 0));
        assert_eq!(
            err.to_string(),
            "formula at A1 would create a circular reference"
        );
    }
}
