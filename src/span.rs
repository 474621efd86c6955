use std::ops::Range;

use miette::SourceSpan;

/// Position relative to start of source.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Idx(pub u32);

/// Holds a view into a source.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash, Debug)]
pub struct Span {
    start: Idx,
    len: u32,
}

impl Span {
    pub fn new(start: Idx, len: u32) -> Self {
        Span { start, len }
    }

    pub fn as_range(&self) -> Range<usize> {
        let start = self.start.0 as usize;
        let end = start + self.len as usize;
        start..end
    }

    pub fn offs(&self) -> usize {
        self.start.0 as usize
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Span covering both `self` and `other`, and everything in between.
    pub fn join(self, other: Span) -> Span {
        let start = self.start.min(other.start);
        let end = self.as_range().end.max(other.as_range().end);
        Span::new(start, (end - start.0 as usize) as u32)
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}
