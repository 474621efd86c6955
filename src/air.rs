use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use log::debug;
use miette::{bail, Result};

use crate::error;
use crate::mem::ROM_SIZE;
use crate::span::Span;
use crate::symbol::{CondBit, Opcode, Port, Register};

// Label table of name -> byte offset, in definition order
type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Assembly intermediate representation, contains list of instructions and the label table.
pub struct Air<'a> {
    /// Source the statements were parsed from, for diagnostics
    src: &'a str,
    /// AIR
    ast: Vec<AirStmt>,
    /// Label name -> offset of the byte emitted right after the definition
    labels: FxMap<String, usize>,
    /// Bytes taken up by `ast` so far
    len: usize,
}

impl<'a> Air<'a> {
    pub fn new(src: &'a str) -> Self {
        Air {
            src,
            ast: Vec::new(),
            labels: IndexMap::with_hasher(FxBuildHasher::default()),
            len: 0,
        }
    }

    pub fn add_stmt(&mut self, stmt: AirStmt) {
        self.len += stmt.op.byte_len();
        self.ast.push(stmt)
    }

    /// Bind `name` to the current end of the program. Error if defined twice.
    pub fn define_label(&mut self, name: &str, span: Span) -> Result<()> {
        if self.labels.contains_key(name) {
            return Err(error::parse_duplicate_label(span, self.src));
        }
        debug!("label `{name}` bound to offset {}", self.len);
        self.labels.insert(name.to_owned(), self.len);
        Ok(())
    }

    /// Offset a label is bound to.
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// Labels in definition order.
    pub fn labels(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels.iter().map(|(name, offs)| (name.as_str(), *offs))
    }

    /// Use labels filled during parsing to resolve jump targets.
    pub fn backpatch(&mut self) -> Result<()> {
        self.check_len()?;
        for stmt in &mut self.ast {
            let AirStmt {
                src: Src::Label(label),
                ..
            } = stmt
            else {
                continue;
            };
            if let Label::Empty { name, span } = label {
                let Some(&offs) = self.labels.get(name.as_str()) else {
                    return Err(error::backpatch_unresolved_label(*span, self.src));
                };
                let Ok(target) = u8::try_from(offs) else {
                    return Err(error::backpatch_label_range(*span, self.src, offs));
                };
                *label = Label::Filled(target);
            }
        }
        Ok(())
    }

    /// Encode the program into its ROM image. Must be called after [`Air::backpatch`].
    pub fn emit(&self) -> Result<Vec<u8>> {
        self.check_len()?;
        let mut bytes = Vec::with_capacity(self.len);
        for stmt in &self.ast {
            stmt.emit(&mut bytes)?;
        }
        Ok(bytes)
    }

    fn check_len(&self) -> Result<()> {
        if self.len <= ROM_SIZE {
            return Ok(());
        }
        // Point at the first statement that does not fit
        let mut offs = 0;
        for stmt in &self.ast {
            offs += stmt.op.byte_len();
            if offs > ROM_SIZE {
                return Err(error::emit_too_long(stmt.span, self.src, self.len));
            }
        }
        unreachable!("program length disagrees with its statements")
    }

    pub fn get(&self, idx: usize) -> &AirStmt {
        &self.ast[idx]
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.ast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ast.is_empty()
    }

    /// Number of bytes the program encodes to.
    pub fn byte_len(&self) -> usize {
        self.len
    }
}

/// Single instruction with its operands already checked against the instruction table.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AirStmt {
    pub op: Opcode,
    pub dest: Dest,
    pub src: Src,
    /// Whole source line, for diagnostics
    pub span: Span,
}

/// Low nibble of the first byte.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dest {
    None,
    Reg(Register),
    Cond(CondBit),
}

/// Contents of the second byte.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Src {
    None,
    Reg(Register),
    RegPair(Register, Register),
    Label(Label),
    Imm(u8),
    Port(Port),
}

/// Jump target, either still a name or resolved to a byte offset.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Label {
    Empty { name: String, span: Span },
    Filled(u8),
}

impl Label {
    pub fn empty(name: &str, span: Span) -> Self {
        Label::Empty {
            name: name.to_owned(),
            span,
        }
    }
}

impl AirStmt {
    /// Append the encoded instruction to `out`.
    pub fn emit(&self, out: &mut Vec<u8>) -> Result<()> {
        let low = match self.dest {
            Dest::None => 0,
            Dest::Reg(reg) => reg.code(),
            Dest::Cond(cond) => cond.code(),
        };
        out.push(self.op.code() << 4 | low);

        let operand = match &self.src {
            Src::None => return Ok(()),
            Src::Reg(reg) => reg.code() << 4,
            Src::RegPair(lhs, rhs) => lhs.code() << 4 | rhs.code(),
            Src::Label(Label::Filled(target)) => *target,
            Src::Label(Label::Empty { name, .. }) => {
                bail!("Label `{name}` was emitted before being backpatched")
            }
            Src::Imm(val) => *val,
            Src::Port(port) => port.code() << 4,
        };
        out.push(operand);
        Ok(())
    }
}
