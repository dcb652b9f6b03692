//! Cell addressing.
//!
//! A `Position` is a zero-based (row, column) coordinate. Its textual form is
//! the traditional "A1" style: a bijective base-26 column code (1-3 uppercase
//! letters, digits 1-26 mapped to 'A'-'Z', no zero digit) followed by the
//! 1-based row number.

use serde::{Deserialize, Serialize};

/// Maximum number of rows a sheet can address.
pub const MAX_ROWS: i32 = 16_384;
/// Maximum number of columns a sheet can address.
pub const MAX_COLS: i32 = 16_384;

const LETTERS: i32 = 26;
const MAX_LETTER_COUNT: usize = 3;
const MAX_DIGIT_COUNT: usize = 5;

/// Zero-based cell coordinate.
///
/// Used as the node identity in the dependency graph and as the key into the
/// sheet's cell store. Ordering is by column first, then row, giving a strict
/// total order suitable for ordered map keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    /// Sentinel for "no position" (also returned by a failed decode).
    pub const NONE: Position = Position { row: -1, col: -1 };

    #[inline]
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// True if this position addresses a cell inside sheet bounds.
    pub fn is_valid(&self) -> bool {
        self.row >= 0 && self.row < MAX_ROWS && self.col >= 0 && self.col < MAX_COLS
    }

    /// Encode as an "A1"-style address. Invalid positions encode to `""`.
    ///
    /// The column code is derived purely from the bijective base-26 algorithm
    /// (repeatedly `n -= 1; letter = n % 26; n /= 26`).
    pub fn to_a1(&self) -> String {
        if !self.is_valid() {
            return String::new();
        }

        let mut letters = [0u8; MAX_LETTER_COUNT];
        let mut len = 0;
        let mut n = self.col + 1; // 1-based for bijective numbering
        while n > 0 {
            n -= 1;
            letters[len] = b'A' + (n % LETTERS) as u8;
            len += 1;
            n /= LETTERS;
        }

        let mut out = String::with_capacity(len + MAX_DIGIT_COUNT);
        for i in (0..len).rev() {
            out.push(letters[i] as char);
        }
        out.push_str(&(self.row + 1).to_string());
        out
    }

    /// Decode an "A1"-style address.
    ///
    /// Accepts exactly a run of 1-3 uppercase letters immediately followed by
    /// a run of 1-5 digits; anything else yields `Position::NONE`. The result
    /// is decoded arithmetically and may lie outside sheet bounds (callers
    /// check `is_valid`).
    pub fn from_a1(s: &str) -> Position {
        let bytes = s.as_bytes();

        let mut i = 0;
        while i < bytes.len() && bytes[i].is_ascii_uppercase() {
            i += 1;
        }
        let letter_count = i;
        if letter_count == 0 || letter_count > MAX_LETTER_COUNT {
            return Position::NONE;
        }

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        let digit_count = j - i;
        if digit_count == 0 || digit_count > MAX_DIGIT_COUNT || j != bytes.len() {
            return Position::NONE;
        }

        let col = bytes[..letter_count]
            .iter()
            .fold(0i32, |acc, &b| acc * LETTERS + (b - b'A' + 1) as i32)
            - 1;

        let row = bytes[letter_count..]
            .iter()
            .fold(0i32, |acc, &b| acc.saturating_mul(10) + (b - b'0') as i32)
            - 1;

        Position { row, col }
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.col.cmp(&other.col).then(self.row.cmp(&other.row))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.to_a1())
        } else {
            write!(f, "({}, {})", self.row, self.col)
        }
    }
}
