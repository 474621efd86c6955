use std::iter::Peekable;
use std::slice::Iter;

use miette::Result;

use crate::{
    air::{Air, AirStmt, Dest, Label, Src},
    error,
    lexer::{tokenize, Token, TokenKind},
    literal,
    span::Span,
    symbol::{CondBit, DestKind, Opcode, Port, Register, SrcKind},
};

/// Transforms source text into AIR, one line at a time.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    /// Fields and label introducers of each non-empty line
    lines: Vec<Vec<Token>>,
    /// Assembly intermediate representation
    air: Air<'a>,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Self {
        let mut lines = vec![Vec::new()];
        for tok in tokenize(src) {
            match tok.kind {
                TokenKind::Field | TokenKind::Colon => {
                    if let Some(line) = lines.last_mut() {
                        line.push(tok)
                    }
                }
                TokenKind::Newline => lines.push(Vec::new()),
                TokenKind::Comment | TokenKind::Whitespace | TokenKind::Eof => {}
            }
        }
        lines.retain(|line| !line.is_empty());
        AsmParser {
            src,
            lines,
            air: Air::new(src),
        }
    }

    fn get_span(&self, span: Span) -> &'a str {
        &self.src[span.as_range()]
    }

    /// Create AIR out of the source lines. Labels are recorded but not yet resolved.
    pub fn parse(mut self) -> Result<Air<'a>> {
        let lines = std::mem::take(&mut self.lines);
        for line in &lines {
            self.parse_line(line)?;
        }
        // Consume self to return AIR
        Ok(self.air)
    }

    fn parse_line(&mut self, line: &[Token]) -> Result<()> {
        let mut toks = line.iter().peekable();
        let Some(first) = toks.peek().copied() else {
            return Ok(());
        };

        if first.kind == TokenKind::Colon {
            toks.next();
            let name = match toks.next() {
                Some(tok) if tok.kind == TokenKind::Field => *tok,
                _ => return Err(error::parse_label_name(first.span, self.src)),
            };
            let label = self.get_span(name.span);
            self.air.define_label(label, first.span.join(name.span))?;
            // Instruction may follow the label on the same line
            if toks.peek().is_none() {
                return Ok(());
            }
        }

        let stmt = self.parse_instr(&mut toks)?;
        self.air.add_stmt(stmt);
        Ok(())
    }

    /// Process several tokens to form valid instruction AIR
    fn parse_instr(&self, toks: &mut Peekable<Iter<'_, Token>>) -> Result<AirStmt> {
        let mnemonic = match toks.next() {
            Some(tok) => *tok,
            None => unreachable!("empty lines are filtered out"),
        };
        let line_span = toks
            .clone()
            .last()
            .map_or(mnemonic.span, |last| mnemonic.span.join(last.span));
        let op = match (mnemonic.kind, self.get_span(mnemonic.span).parse::<Opcode>()) {
            (TokenKind::Field, Ok(op)) => op,
            _ => return Err(error::parse_unknown_instr(mnemonic.span, self.src)),
        };
        let mut operands = Operands {
            parser: self,
            toks,
            op,
            line_span,
        };

        // `in`/`out` also accept the port before the register
        let port_first = matches!(op, Opcode::In | Opcode::Out)
            && operands
                .toks
                .peek()
                .is_some_and(|tok| self.get_span(tok.span).parse::<Port>().is_ok());

        let (dest, src) = if port_first {
            let port = operands.expect_port()?;
            let reg = operands.expect_reg()?;
            (Dest::Reg(reg), Src::Port(port))
        } else {
            let dest = match op.dest_kind() {
                DestKind::None => Dest::None,
                DestKind::Reg => Dest::Reg(operands.expect_reg()?),
                DestKind::Cond => Dest::Cond(operands.expect_cond()?),
            };
            let src = match op.src_kind() {
                SrcKind::None => Src::None,
                SrcKind::Reg => Src::Reg(operands.expect_reg()?),
                SrcKind::RegPair => {
                    let lhs = operands.expect_reg()?;
                    let rhs = operands.expect_reg()?;
                    Src::RegPair(lhs, rhs)
                }
                SrcKind::Label => Src::Label(operands.expect_label()?),
                SrcKind::Imm => Src::Imm(operands.expect_lit()?),
                SrcKind::Port => Src::Port(operands.expect_port()?),
            };
            (dest, src)
        };
        operands.expect_end()?;

        Ok(AirStmt {
            op,
            dest,
            src,
            span: line_span,
        })
    }
}

/// Operand fields of a single instruction line.
struct Operands<'p, 'a, 't, 'i> {
    parser: &'p AsmParser<'a>,
    toks: &'t mut Peekable<Iter<'i, Token>>,
    op: Opcode,
    /// Span of the whole line
    line_span: Span,
}

impl<'a> Operands<'_, 'a, '_, '_> {
    fn expect_field(&mut self, expected: &str) -> Result<(Token, &'a str)> {
        match self.toks.next() {
            Some(tok) => Ok((*tok, self.parser.get_span(tok.span))),
            None => Err(error::parse_missing_operand(
                self.line_span,
                self.parser.src,
                self.op,
                expected,
            )),
        }
    }

    fn expect_reg(&mut self) -> Result<Register> {
        let (tok, text) = self.expect_field("register")?;
        text.parse()
            .map_err(|_| error::parse_unknown_reg(tok.span, self.parser.src))
    }

    fn expect_cond(&mut self) -> Result<CondBit> {
        let (tok, text) = self.expect_field("condition bit")?;
        text.parse()
            .map_err(|_| error::parse_unknown_cond(tok.span, self.parser.src))
    }

    fn expect_port(&mut self) -> Result<Port> {
        let (tok, text) = self.expect_field("port")?;
        text.parse()
            .map_err(|_| error::parse_unknown_port(tok.span, self.parser.src))
    }

    fn expect_label(&mut self) -> Result<Label> {
        let (tok, text) = self.expect_field("label")?;
        if tok.kind != TokenKind::Field {
            return Err(error::parse_label_name(tok.span, self.parser.src));
        }
        Ok(Label::empty(text, tok.span))
    }

    fn expect_lit(&mut self) -> Result<u8> {
        let (tok, text) = self.expect_field("integer literal")?;
        literal::parse_byte(text).map_err(|e| error::parse_bad_lit(tok.span, self.parser.src, e))
    }

    fn expect_end(&mut self) -> Result<()> {
        let Some(first) = self.toks.next() else {
            return Ok(());
        };
        let span = self.toks.by_ref().fold(first.span, |span, tok| span.join(tok.span));
        Err(error::parse_extra_operand(span, self.parser.src, self.op))
    }
}

#[cfg(test)]
mod tests {
    use super::AsmParser;
    use crate::{
        air::{AirStmt, Dest, Label, Src},
        assemble,
        span::{Idx, Span},
        symbol::{CondBit, Opcode, Port, Register},
    };

    fn parse_one(src: &str) -> AirStmt {
        let air = AsmParser::new(src).parse().unwrap();
        assert_eq!(air.len(), 1);
        air.get(0).clone()
    }

    #[test]
    fn parse_add_basic() {
        let stmt = parse_one("add c a b");
        assert_eq!(stmt.op, Opcode::Add);
        assert_eq!(stmt.dest, Dest::Reg(Register::C));
        assert_eq!(stmt.src, Src::RegPair(Register::A, Register::B));
        assert_eq!(stmt.span.as_range(), 0..9);
    }

    #[test]
    fn parse_every_form() {
        assert_eq!(parse_one("nop").src, Src::None);
        assert_eq!(parse_one("inc flags").dest, Dest::Reg(Register::Flags));
        assert_eq!(parse_one("mov d o").src, Src::Reg(Register::O));
        assert_eq!(parse_one("ldi a 0x2A").src, Src::Imm(42));
        assert_eq!(parse_one("ldi a -1").src, Src::Imm(0xFF));
        assert_eq!(parse_one("in b i3").src, Src::Port(Port::I3));
        assert_eq!(parse_one("out c o0").src, Src::Port(Port::O0));

        let bib = parse_one("bib z done");
        assert_eq!(bib.dest, Dest::Cond(CondBit::Z));
        assert_eq!(bib.src, Src::Label(Label::empty("done", Span::new(Idx(6), 4))));
        let jmp = parse_one("jmp done");
        assert_eq!(jmp.dest, Dest::None);
        assert_eq!(jmp.src, Src::Label(Label::empty("done", Span::new(Idx(4), 4))));
    }

    #[test]
    fn parse_port_first() {
        let stmt = parse_one("out o0 c");
        assert_eq!(stmt.dest, Dest::Reg(Register::C));
        assert_eq!(stmt.src, Src::Port(Port::O0));
        let stmt = parse_one("in i1 a");
        assert_eq!(stmt.dest, Dest::Reg(Register::A));
        assert_eq!(stmt.src, Src::Port(Port::I1));
    }

    #[test]
    fn parse_whitespace_and_comments() {
        let air = AsmParser::new(
            r#"
            ; setup
               ldi    a   5   ; five

            nop;trailing
            "#,
        )
        .parse()
        .unwrap();
        assert_eq!(air.len(), 2);
        assert_eq!(air.byte_len(), 3);
    }

    #[test]
    fn parse_labels() {
        let air = AsmParser::new(
            r#"
            : start
            ldi a 1
            :mid inc a
            jmp start
            : end
            "#,
        )
        .parse()
        .unwrap();
        assert_eq!(air.label("start"), Some(0));
        assert_eq!(air.label("mid"), Some(2));
        assert_eq!(air.label("end"), Some(5));
        assert_eq!(air.len(), 3);
    }

    #[test]
    fn parse_errors() {
        for src in [
            "hlt",
            "ADD c a b",
            "add c a",
            "add c a p",
            "add c a b d",
            "mov q a",
            "bib x done",
            "in a o9",
            "out c",
            "ldi a",
            "ldi a 300",
            "ldi a b",
            "nop a",
            "jmp",
            "jmp :here",
            ":",
            ": dup\n: dup",
            "a b c",
        ] {
            assert!(AsmParser::new(src).parse().is_err(), "`{src}` should not parse");
        }
    }

    #[test]
    fn assemble_bytes() {
        let bytes = assemble(
            r#"
            ldi a 5
            ldi b 3
            add c a b
            out c o0
            "#,
        )
        .unwrap();
        assert_eq!(bytes, vec![0xC0, 0x05, 0xC1, 0x03, 0x12, 0x01, 0xE2, 0x80]);
    }

    #[test]
    fn assemble_forward_and_backward_labels() {
        let bytes = assemble(
            r#"
            : top
            inc a
            bib a3 out
            jmp top
            : out
            out a o7
            "#,
        )
        .unwrap();
        assert_eq!(bytes, vec![0x70, 0x93, 0x05, 0xA0, 0x00, 0xE0, 0xF0]);
    }

    #[test]
    fn assemble_unresolved_label() {
        assert!(assemble("jmp nowhere").is_err());
        assert!(assemble("bib c missing\n: found").is_err());
    }

    #[test]
    fn assemble_is_all_or_nothing() {
        assert!(assemble("ldi a 1\nldi b 2\nbogus").is_err());
    }

    #[test]
    fn assemble_empty() {
        assert_eq!(assemble("").unwrap(), Vec::<u8>::new());
        assert_eq!(assemble("; nothing\n\n").unwrap(), Vec::<u8>::new());
    }
}
