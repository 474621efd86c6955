use miette::{miette, LabeledSpan, Report, Severity};

use crate::literal::LiteralError;
use crate::span::Span;
use crate::symbol::{DestKind, Opcode, SrcKind};

// Parser errors

pub fn parse_unknown_instr(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::unknown_instr",
        help = "available instructions are nop, add, sub, and, or, nor, xor, inc, rolr, bib, jmp, mov, ldi, in, out and rnv",
        labels = vec![LabeledSpan::at(span, "unknown mnemonic")],
        "Encountered an unknown instruction",
    )
    .with_source_code(src.to_owned())
}

pub fn parse_unknown_reg(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::unknown_reg",
        help = "registers are named a through o, plus flags",
        labels = vec![LabeledSpan::at(span, "not a register")],
        "Expected a register name",
    )
    .with_source_code(src.to_owned())
}

pub fn parse_unknown_cond(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::unknown_cond",
        help = "condition bits are a0 through a7, z, c, s, and f3 through f7",
        labels = vec![LabeledSpan::at(span, "not a condition bit")],
        "Expected a condition bit name",
    )
    .with_source_code(src.to_owned())
}

pub fn parse_unknown_port(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::unknown_port",
        help = "ports are named i0 through i7 for inputs and o0 through o7 for outputs",
        labels = vec![LabeledSpan::at(span, "not a port")],
        "Expected a port name",
    )
    .with_source_code(src.to_owned())
}

pub fn parse_bad_lit(span: Span, src: &str, e: LiteralError) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::bad_lit",
        help = "literals are constant expressions in the range -128 to 255, eg. 0x1F, 0b101, 3*4",
        labels = vec![LabeledSpan::at(span, "incorrect literal")],
        "Encountered an invalid literal: {e}",
    )
    .with_source_code(src.to_owned())
}

pub fn parse_missing_operand(span: Span, src: &str, instr: Opcode, expected: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::missing_operand",
        help = format!(
            "`{instr}` takes {} as destination and {} as source",
            instr.dest_kind(),
            instr.src_kind()
        ),
        labels = vec![LabeledSpan::at(span, "incomplete instruction")],
        "Expected a {expected} operand",
    )
    .with_source_code(src.to_owned())
}

pub fn parse_extra_operand(span: Span, src: &str, instr: Opcode) -> Report {
    let help = match (instr.dest_kind(), instr.src_kind()) {
        (DestKind::None, SrcKind::None) => format!("`{instr}` takes no operands"),
        _ => format!(
            "`{instr}` takes {} as destination and {} as source",
            instr.dest_kind(),
            instr.src_kind()
        ),
    };
    miette!(
        severity = Severity::Error,
        code = "parse::extra_operand",
        help = help,
        labels = vec![LabeledSpan::at(span, "unexpected operand")],
        "Too many operands for instruction",
    )
    .with_source_code(src.to_owned())
}

pub fn parse_label_name(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::label_name",
        help = "label definitions look like `: name` on a line of their own",
        labels = vec![LabeledSpan::at(span, "label introducer")],
        "Expected a label name",
    )
    .with_source_code(src.to_owned())
}

pub fn parse_duplicate_label(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::duplicate_label",
        help = "labels are only allowed to be defined once per file",
        labels = vec![LabeledSpan::at(span, "duplicate label")],
        "Duplicate label definition"
    )
    .with_source_code(src.to_owned())
}

// Backpatching & emitting

pub fn backpatch_unresolved_label(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "backpatch::unresolved_label",
        help = "define the label somewhere in the file with `: name`",
        labels = vec![LabeledSpan::at(span, "unknown label")],
        "Jump target was never defined",
    )
    .with_source_code(src.to_owned())
}

pub fn backpatch_label_range(span: Span, src: &str, offs: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "backpatch::label_range",
        help = "jump targets must be within the 256 byte program store",
        labels = vec![LabeledSpan::at(span, "out-of-range target")],
        "Label resolves to offset {offs}, which cannot be encoded in a byte",
    )
    .with_source_code(src.to_owned())
}

pub fn emit_too_long(span: Span, src: &str, len: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "emit::too_long",
        help = "the program store holds 256 bytes",
        labels = vec![LabeledSpan::at(span, "does not fit")],
        "Program is {len} bytes long",
    )
    .with_source_code(src.to_owned())
}
