// Formula parser - converts expression text into an AST
// Supports: numbers, cell refs (A1), basic math (+, -, *, /), unary +/-, parens

use crate::position::Position;

/// Expression AST for a cell formula (the text after the leading `=`).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Cell reference. The position may lie outside sheet bounds, in which
    /// case evaluation produces `#REF!`.
    CellRef(Position),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

impl Op {
    fn symbol(&self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }

    /// Binding strength, used for minimal parenthesization when printing.
    fn precedence(&self) -> u8 {
        match self {
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div => 2,
        }
    }

    /// True if a right operand of equal precedence needs parens
    /// (subtraction and division are left-associative only).
    fn right_sensitive(&self) -> bool {
        matches!(self, Op::Sub | Op::Div)
    }
}

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(_) | Expr::CellRef(_) => 4,
            Expr::Unary { .. } => 3,
            Expr::Binary { op, .. } => op.precedence(),
        }
    }

    /// Write the canonical textual form with minimal parentheses.
    pub fn write_canonical(&self, out: &mut String) {
        match self {
            Expr::Number(n) => out.push_str(&n.to_string()),
            Expr::CellRef(pos) => {
                if pos.is_valid() {
                    out.push_str(&pos.to_a1());
                } else {
                    out.push_str("#REF!");
                }
            }
            Expr::Unary { op, operand } => {
                out.push(match op {
                    UnaryOp::Plus => '+',
                    UnaryOp::Minus => '-',
                });
                let needs_parens = operand.precedence() < self.precedence();
                if needs_parens {
                    out.push('(');
                }
                operand.write_canonical(out);
                if needs_parens {
                    out.push(')');
                }
            }
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                let left_parens = left.precedence() < prec;
                if left_parens {
                    out.push('(');
                }
                left.write_canonical(out);
                if left_parens {
                    out.push(')');
                }

                out.push(op.symbol());

                let right_parens = right.precedence() < prec
                    || (right.precedence() == prec && op.right_sensitive());
                if right_parens {
                    out.push('(');
                }
                right.write_canonical(out);
                if right_parens {
                    out.push(')');
                }
            }
        }
    }

    /// Collect every cell reference in the expression, in traversal order,
    /// duplicates included.
    pub fn collect_refs(&self, out: &mut Vec<Position>) {
        match self {
            Expr::Number(_) => {}
            Expr::CellRef(pos) => out.push(*pos),
            Expr::Unary { operand, .. } => operand.collect_refs(out),
            Expr::Binary { left, right, .. } => {
                left.collect_refs(out);
                right.collect_refs(out);
            }
        }
    }
}

/// Diagnostic for a formula that failed to parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    message: String,
}

impl ParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parse expression text (without the leading `=`) into an AST.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::new("empty formula"));
    }
    let (expr, pos) = parse_add_sub(&tokens, 0)?;
    if pos != tokens.len() {
        return Err(ParseError::new(format!(
            "unexpected trailing token: {:?}",
            tokens[pos]
        )));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    CellRef(Position),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '*' => {
                tokens.push(Token::Star);
                chars.next();
            }
            '/' => {
                tokens.push(Token::Slash);
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            'A'..='Z' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let pos = Position::from_a1(&ident);
                if pos == Position::NONE {
                    return Err(ParseError::new(format!(
                        "invalid cell reference: {}",
                        ident
                    )));
                }
                tokens.push(Token::CellRef(pos));
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| ParseError::new(format!("invalid number: {}", num_str)))?;
                tokens.push(Token::Number(num));
            }
            _ => return Err(ParseError::new(format!("unexpected character: {}", c))),
        }
    }

    Ok(tokens)
}

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    let (mut left, mut pos) = parse_unary(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_unary(tokens, pos + 1)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_unary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    if pos >= tokens.len() {
        return Err(ParseError::new("unexpected end of formula"));
    }

    let op = match &tokens[pos] {
        Token::Plus => Some(UnaryOp::Plus),
        Token::Minus => Some(UnaryOp::Minus),
        _ => None,
    };

    if let Some(op) = op {
        let (operand, new_pos) = parse_unary(tokens, pos + 1)?;
        return Ok((
            Expr::Unary {
                op,
                operand: Box::new(operand),
            },
            new_pos,
        ));
    }

    parse_primary(tokens, pos)
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), ParseError> {
    match &tokens[pos] {
        Token::Number(n) => Ok((Expr::Number(*n), pos + 1)),
        Token::CellRef(p) => Ok((Expr::CellRef(*p), pos + 1)),
        Token::LParen => {
            let (expr, new_pos) = parse_add_sub(tokens, pos + 1)?;
            if new_pos >= tokens.len() || tokens[new_pos] != Token::RParen {
                return Err(ParseError::new("expected closing parenthesis"));
            }
            Ok((expr, new_pos + 1))
        }
        other => Err(ParseError::new(format!("unexpected token: {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(input: &str) -> String {
        let expr = parse(input).unwrap();
        let mut out = String::new();
        expr.write_canonical(&mut out);
        out
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse("42").unwrap(), Expr::Number(42.0));
        assert_eq!(parse("2.5").unwrap(), Expr::Number(2.5));
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse("B3").unwrap(), Expr::CellRef(Position::new(2, 1)));
    }

    #[test]
    fn test_precedence() {
        // 1+2*3 parses as 1+(2*3)
        let expr = parse("1+2*3").unwrap();
        match expr {
            Expr::Binary { op: Op::Add, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: Op::Mul, .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_canonical_strips_whitespace() {
        assert_eq!(canonical(" 1 + 2 "), "1+2");
        assert_eq!(canonical("A1 * B2"), "A1*B2");
    }

    #[test]
    fn test_canonical_minimal_parens() {
        assert_eq!(canonical("1+2*3"), "1+2*3");
        assert_eq!(canonical("(1+2)*3"), "(1+2)*3");
        assert_eq!(canonical("(1*2)+3"), "1*2+3");
        assert_eq!(canonical("1-(2+3)"), "1-(2+3)");
        assert_eq!(canonical("1-(2-3)"), "1-(2-3)");
        assert_eq!(canonical("(1-2)-3"), "1-2-3");
        assert_eq!(canonical("1/(2/3)"), "1/(2/3)");
        assert_eq!(canonical("-(1+2)"), "-(1+2)");
        assert_eq!(canonical("-A1"), "-A1");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
        assert!(parse("1+").is_err());
        assert!(parse("*2").is_err());
        assert!(parse("(1+2").is_err());
        assert!(parse("1+2)").is_err());
        assert!(parse("1 2").is_err());
        assert!(parse("a1").is_err());
        assert!(parse("1+?").is_err());
    }

    #[test]
    fn test_reference_with_too_many_letters_is_syntax_error() {
        let err = parse("AAAA1+1").unwrap_err();
        assert!(err.to_string().contains("invalid cell reference"));
    }

    #[test]
    fn test_out_of_bounds_reference_parses() {
        // Textually well-formed but past sheet bounds: parses, flagged invalid.
        let expr = parse("A99999").unwrap();
        match expr {
            Expr::CellRef(p) => assert!(!p.is_valid()),
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_collect_refs() {
        let expr = parse("A1+B2*A1").unwrap();
        let mut refs = Vec::new();
        expr.collect_refs(&mut refs);
        assert_eq!(
            refs,
            vec![
                Position::new(0, 0),
                Position::new(1, 1),
                Position::new(0, 0)
            ]
        );
    }
}
