use crate::lexer::cursor::Cursor;
use crate::span::{Idx, Span};

pub mod cursor;

/// Single lexed token with its location in the source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Any run of characters that is not whitespace, a colon or a comment.
    /// Mnemonics, names and literals are all fields; their meaning depends on position.
    Field,
    /// Label introducer
    Colon,
    Comment,
    Whitespace,
    Newline,
    Eof,
}

/// Split source into tokens. The final token is always `Eof`.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut cursor = Cursor::new(input);
    let mut offs = 0u32;
    let mut toks = Vec::new();
    loop {
        let (kind, len) = cursor.advance_token();
        toks.push(Token {
            kind,
            span: Span::new(Idx(offs), len),
        });
        offs += len;
        if kind == TokenKind::Eof {
            break toks;
        }
    }
}

/// Test if a character separates fields on a line.
pub(crate) fn is_whitespace(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

pub(crate) fn is_field(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ':' | ';')
}

impl Cursor<'_> {
    fn advance_token(&mut self) -> (TokenKind, u32) {
        let first_char = match self.bump() {
            Some(c) => c,
            None => return (TokenKind::Eof, 0),
        };
        let kind = match first_char {
            ';' => {
                self.take_while(|c| c != '\n');
                TokenKind::Comment
            }
            '\n' => TokenKind::Newline,
            c if is_whitespace(c) => {
                self.take_while(is_whitespace);
                TokenKind::Whitespace
            }
            ':' => TokenKind::Colon,
            _ => {
                self.take_while(is_field);
                TokenKind::Field
            }
        };
        let len = self.pos_in_token();
        self.reset_pos();
        (kind, len)
    }
}
