//! Integer literals for `ldi` and the `--input` flag.
//!
//! A literal is a constant expression over integers, nothing more. Accepted syntax:
//!  - Decimal (optional "#"), hex ("0x"/"x"), octal ("0o"/"o") and binary ("0b"/"b"). Digits may be
//!    separated by "_".
//!  - Unary "-", "+" and "~".
//!  - Binary "*", "/", "%", "+", "-", "<<", ">>", "&", "^", "|" with C precedence.
//!  - Parentheses.
//!
//! The final value must fit in a byte, either as unsigned (0 to 255) or as two's complement
//! signed (-128 to 127).

use std::iter::Peekable;
use std::str::CharIndices;

/// Internal type used while evaluating, wide enough that intermediate results of byte-sized
/// operands cannot overflow.
type Value = i64;

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum LiteralError {
    #[error("empty literal")]
    Empty,
    #[error("unexpected character `{found}` at position {pos}")]
    Unexpected { found: char, pos: usize },
    #[error("expected a number at position {pos}")]
    ExpectedNumber { pos: usize },
    #[error("invalid digit `{digit}` for base {radix}")]
    InvalidDigit { digit: char, radix: u32 },
    #[error("unclosed parenthesis")]
    Unclosed,
    #[error("division by zero")]
    DivideByZero,
    #[error("intermediate value is too large")]
    Overflow,
    #[error("value {0} does not fit in a byte")]
    OutOfRange(Value),
}

/// Radix (base) of integer, as determined by (optional) integer prefix.
#[derive(Clone, Copy, PartialEq, Debug)]
enum Radix {
    Binary = 2,
    Octal = 8,
    Decimal = 10,
    Hex = 16,
}

/// Evaluate `string` and convert it to the byte stored in the program.
pub fn parse_byte(string: &str) -> Result<u8, LiteralError> {
    let value = evaluate(string)?;
    match value {
        0..=255 => Ok(value as u8),
        -128..=-1 => Ok(value as i8 as u8),
        _ => Err(LiteralError::OutOfRange(value)),
    }
}

/// Evaluate a constant expression without range checking the result.
pub fn evaluate(string: &str) -> Result<Value, LiteralError> {
    if string.is_empty() {
        return Err(LiteralError::Empty);
    }
    let mut parser = ExprParser {
        chars: string.char_indices().peekable(),
    };
    let value = parser.expr(0)?;
    match parser.chars.next() {
        None => Ok(value),
        Some((pos, found)) => Err(LiteralError::Unexpected { found, pos }),
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum BinOp {
    Or,
    Xor,
    And,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::Xor => 2,
            BinOp::And => 3,
            BinOp::Shl | BinOp::Shr => 4,
            BinOp::Add | BinOp::Sub => 5,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 6,
        }
    }

    fn apply(self, lhs: Value, rhs: Value) -> Result<Value, LiteralError> {
        let shift = |rhs: Value| u32::try_from(rhs).ok().filter(|amt| *amt < 32);
        let res = match self {
            BinOp::Or => Some(lhs | rhs),
            BinOp::Xor => Some(lhs ^ rhs),
            BinOp::And => Some(lhs & rhs),
            BinOp::Shl => shift(rhs).and_then(|amt| lhs.checked_shl(amt)),
            BinOp::Shr => shift(rhs).and_then(|amt| lhs.checked_shr(amt)),
            BinOp::Add => lhs.checked_add(rhs),
            BinOp::Sub => lhs.checked_sub(rhs),
            BinOp::Mul => lhs.checked_mul(rhs),
            BinOp::Div | BinOp::Rem if rhs == 0 => return Err(LiteralError::DivideByZero),
            BinOp::Div => lhs.checked_div(rhs),
            BinOp::Rem => lhs.checked_rem(rhs),
        };
        res.filter(|val| val.unsigned_abs() <= u32::MAX as u64)
            .ok_or(LiteralError::Overflow)
    }
}

/// Precedence-climbing evaluator over the characters of one literal.
struct ExprParser<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl ExprParser<'_> {
    fn expr(&mut self, min_prec: u8) -> Result<Value, LiteralError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek_binop() {
            if op.precedence() <= min_prec {
                break;
            }
            self.eat_binop(op);
            let rhs = self.expr(op.precedence())?;
            lhs = op.apply(lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Value, LiteralError> {
        match self.chars.peek().copied() {
            Some((_, '-')) => {
                self.chars.next();
                self.unary()?.checked_neg().ok_or(LiteralError::Overflow)
            }
            Some((_, '+')) => {
                self.chars.next();
                self.unary()
            }
            Some((_, '~')) => {
                self.chars.next();
                Ok(!self.unary()?)
            }
            Some((_, '(')) => {
                self.chars.next();
                let value = self.expr(0)?;
                match self.chars.next() {
                    Some((_, ')')) => Ok(value),
                    _ => Err(LiteralError::Unclosed),
                }
            }
            Some((pos, c)) if c == '#' || c.is_ascii_alphanumeric() => self.number(pos),
            Some((pos, _)) => Err(LiteralError::ExpectedNumber { pos }),
            None => Err(LiteralError::Empty),
        }
    }

    fn number(&mut self, pos: usize) -> Result<Value, LiteralError> {
        if self.chars.peek().is_some_and(|(_, c)| *c == '#') {
            self.chars.next();
        }
        let radix = self.prefix();
        let mut value: Value = 0;
        let mut digits = 0;
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '_' {
                self.chars.next();
                continue;
            }
            if !c.is_ascii_alphanumeric() {
                break;
            }
            let digit = c.to_digit(radix as u32).ok_or(LiteralError::InvalidDigit {
                digit: c,
                radix: radix as u32,
            })?;
            value = value
                .checked_mul(radix as Value)
                .and_then(|val| val.checked_add(digit as Value))
                .filter(|val| *val <= u32::MAX as Value)
                .ok_or(LiteralError::Overflow)?;
            digits += 1;
            self.chars.next();
        }
        if digits == 0 {
            return Err(LiteralError::ExpectedNumber { pos });
        }
        Ok(value)
    }

    /// Consume a radix prefix, if any.
    fn prefix(&mut self) -> Radix {
        let mut ahead = self.chars.clone();
        let radix_of = |c: char| match c.to_ascii_lowercase() {
            'x' => Some(Radix::Hex),
            'o' => Some(Radix::Octal),
            'b' => Some(Radix::Binary),
            _ => None,
        };
        match ahead.next() {
            Some((_, '0')) => match ahead.next().and_then(|(_, c)| radix_of(c)) {
                Some(radix) => {
                    self.chars.next();
                    self.chars.next();
                    radix
                }
                None => Radix::Decimal,
            },
            // Bare prefix, as in `x1F` or `b101`
            Some((_, c)) => match radix_of(c) {
                Some(radix) => {
                    self.chars.next();
                    radix
                }
                None => Radix::Decimal,
            },
            None => Radix::Decimal,
        }
    }

    fn peek_binop(&mut self) -> Option<BinOp> {
        let mut ahead = self.chars.clone();
        let (_, c) = ahead.next()?;
        Some(match c {
            '|' => BinOp::Or,
            '^' => BinOp::Xor,
            '&' => BinOp::And,
            '+' => BinOp::Add,
            '-' => BinOp::Sub,
            '*' => BinOp::Mul,
            '/' => BinOp::Div,
            '%' => BinOp::Rem,
            '<' if matches!(ahead.next(), Some((_, '<'))) => BinOp::Shl,
            '>' if matches!(ahead.next(), Some((_, '>'))) => BinOp::Shr,
            _ => return None,
        })
    }

    fn eat_binop(&mut self, op: BinOp) {
        self.chars.next();
        if matches!(op, BinOp::Shl | BinOp::Shr) {
            self.chars.next();
        }
    }
}
