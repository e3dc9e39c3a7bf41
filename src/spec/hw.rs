use crate::common;
use num_derive::FromPrimitive;
use once_cell::sync::Lazy;
use static_assertions::const_assert;
use std::collections::HashMap;
use std::convert::TryInto;
use std::fmt;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

pub type Word = u16;

/// A word of the assembled stream. The low 16 bits are the payload; bit 16
/// marks the single-operand (non-basic) instruction form, so the stream is
/// not a plain sequence of `Word`s.
pub type CodeWord = u32;

pub const WORD_WIDTH: usize = 16;
pub const WORD_MAX: CodeWord = 0xFFFF;

/*
    Notes on instruction encoding:

    A basic instruction is a single word laid out as `BBBBBB AAAAAA OOOO`,
    right to left: the low 4 bits (OOOO) select one of the sixteen basic
    opcodes, the next 6 bits (AAAAAA) the destination operand, and the top
    6 bits (BBBBBB) the source operand.

    A zero low nibble selects the long form instead: the word carries marker
    bit 16 identifying the operation (`JSR` is the only one) and a single
    operand in the B position. This is why the stream is `CodeWord`s rather
    than `Word`s.

    Operand fields name a register directly (0x00-0x07), a register indirect
    (0x08-0x0F), an indexed indirect taking the next stream word as base
    (0x10-0x17), the stack operations and control registers (0x18-0x1D), an
    indirect through the next stream word (0x1E), or a literal carried in the
    next stream word (0x1F). The compact small-immediate range 0x20-0x3F is
    never produced and never decoded.

    Either operand may therefore claim one extra word following the
    instruction word; extras appear in operand order (A's before B's).
*/

pub const OP_KIND_MASK: CodeWord = 0xF;
pub const OP_LONG_MASK: CodeWord = 0xF_0000;
pub const OP_JSR: CodeWord = 0x1_0000;

pub const ARG_SHIFT_A: u32 = 4;
pub const ARG_SHIFT_B: u32 = 10;
pub const ARG_MASK: CodeWord = 0x3F;

pub const ARG_REG_INDIRECT: CodeWord = 0x08;
pub const ARG_INDEXED: CodeWord = 0x10;
pub const ARG_NEXT_INDIRECT: CodeWord = 0x1E;
pub const ARG_NEXT_LITERAL: CodeWord = 0x1F;

// The memory map. Registers live in cells above the 16-bit address space so
// that operand decoding can hand back one kind of address for every operand
// form; the final cell is the sink for the undecodable 0x20-0x3F range.
pub const MEM_WORDS: usize = 0x10000;
pub const REG_BASE: usize = MEM_WORDS;
pub const REG_COUNT: usize = 8;
pub const PC_ADDR: usize = REG_BASE + REG_COUNT;
pub const SP_ADDR: usize = PC_ADDR + 1;
pub const O_ADDR: usize = SP_ADDR + 1;
pub const SCRATCH_ADDR: usize = O_ADDR + 1;
pub const MEM_CELLS: usize = SCRATCH_ADDR + 1;

pub const VIDEO_BASE: usize = 0x8000;
pub const VIDEO_COLS: usize = 30;
pub const VIDEO_ROWS: usize = 10;
pub const FONT_BASE: usize = 0x9000;
pub const FONT_GLYPHS: usize = 128;
pub const FONT_WORDS_PER_GLYPH: usize = 2;

const_assert!(VIDEO_BASE + VIDEO_COLS * VIDEO_ROWS <= FONT_BASE);
const_assert!(FONT_BASE + FONT_GLYPHS * FONT_WORDS_PER_GLYPH <= MEM_WORDS);
// A fetch at the top of the program may still consume two operand words.
const_assert!(MEM_WORDS + 2 < MEM_CELLS);

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, FromPrimitive, EnumIter)]
pub enum BasicOp {
    NUL = 0x00,
    SET,
    ADD,
    SUB,
    MUL,
    DIV,
    MOD,
    SHL,
    SHR,
    AND,
    BOR,
    XOR,
    IFE,
    IFN,
    IFG,
    IFB,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Basic(BasicOp),
    JSR,
    DAT,
}

static MNEMONICS: Lazy<HashMap<String, Mnemonic>> = Lazy::new(|| {
    let mut table: HashMap<String, Mnemonic> = BasicOp::iter()
        .map(|op| (op.to_string(), Mnemonic::Basic(op)))
        .collect();
    table.insert("JSR".to_owned(), Mnemonic::JSR);
    table.insert("DAT".to_owned(), Mnemonic::DAT);
    table
});

impl Mnemonic {
    /// Exact, case-insensitive match against the fixed opcode table.
    pub fn lookup(text: &str) -> Option<Mnemonic> {
        MNEMONICS.get(&text.to_uppercase()).copied()
    }

    /// Encoding value of a genuine opcode; `DAT` is a directive and has none.
    pub fn code(self) -> Option<CodeWord> {
        match self {
            Mnemonic::Basic(op) => Some(op as CodeWord),
            Mnemonic::JSR => Some(OP_JSR),
            Mnemonic::DAT => None,
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mnemonic::Basic(op) => write!(f, "{}", op),
            Mnemonic::JSR => write!(f, "JSR"),
            Mnemonic::DAT => write!(f, "DAT"),
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Reg {
    A = 0x00,
    B,
    C,
    X,
    Y,
    Z,
    I,
    J,

    POP = 0x18,
    PEEK,
    PUSH,

    SP,
    PC,
    O,
}

impl Reg {
    pub fn code(self) -> CodeWord {
        self as CodeWord
    }

    /// Only arithmetic registers may appear inside address brackets.
    pub fn is_arithmetic(self) -> bool {
        (self as usize) < REG_COUNT
    }

    pub fn lookup(text: &str) -> Option<Reg> {
        Reg::iter().find(|reg| common::eq_ignore_case(text, &reg.to_string()))
    }
}

pub fn code_to_bytes(code: &[CodeWord]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(code.len() * 4);
    for word in code {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes
}

// Returns none if the data is not a whole number of code words.
pub fn bytes_to_code(bytes: &[u8]) -> Option<Vec<CodeWord>> {
    let mut code = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks(4) {
        code.push(CodeWord::from_le_bytes(chunk.try_into().ok()?));
    }
    Some(code)
}
