use crate::spec::hw::{BasicOp, CodeWord, WORD_MAX, WORD_WIDTH};

/// What one basic operation asks the instance to commit: an optional result
/// for the destination cell, an optional overflow-register value, and
/// whether the next instruction is to be skipped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub result: Option<CodeWord>,
    pub overflow: Option<CodeWord>,
    pub skip_next: bool,
}

impl Outcome {
    fn value(result: CodeWord) -> Outcome {
        Outcome {
            result: Some(result),
            ..Outcome::default()
        }
    }

    fn with_overflow(result: CodeWord, overflow: CodeWord) -> Outcome {
        Outcome {
            result: Some(result),
            overflow: Some(overflow),
            skip_next: false,
        }
    }

    fn skip_unless(keep: bool) -> Outcome {
        Outcome {
            skip_next: !keep,
            ..Outcome::default()
        }
    }
}

// Shift counts take their low five bits, as 32-bit shifts do.
const SHIFT_MASK: CodeWord = 0x1F;

pub(super) fn apply(op: BasicOp, a: CodeWord, b: CodeWord) -> Outcome {
    match op {
        // A zero kind selects the long instruction form; it never
        // dispatches here.
        BasicOp::NUL => Outcome::default(),

        BasicOp::SET => Outcome::value(b),

        BasicOp::ADD => {
            let r = a + b;
            Outcome::with_overflow(r & WORD_MAX, if r > WORD_MAX { 1 } else { 0 })
        }

        BasicOp::SUB => {
            let r = i64::from(a) - i64::from(b);
            if r < 0 {
                // A negative difference is lifted by 0xFFFF, not 0x10000.
                Outcome::with_overflow(((r + 0xFFFF) & 0xFFFF) as CodeWord, WORD_MAX)
            } else {
                Outcome::with_overflow(r as CodeWord & WORD_MAX, 0)
            }
        }

        BasicOp::MUL => {
            let r = u64::from(a) * u64::from(b);
            Outcome::with_overflow((r & 0xFFFF) as CodeWord, ((r >> WORD_WIDTH) & 0xFFFF) as CodeWord)
        }

        BasicOp::DIV => {
            if b == 0 {
                Outcome::with_overflow(0, 0)
            } else {
                let o = ((u64::from(a) << WORD_WIDTH) / u64::from(b)) & 0xFFFF;
                Outcome::with_overflow((a / b) & WORD_MAX, o as CodeWord)
            }
        }

        BasicOp::MOD => Outcome::value(if b == 0 { 0 } else { a % b }),

        BasicOp::SHL => {
            let r = u64::from(a) << (b & SHIFT_MASK);
            Outcome::with_overflow((r & 0xFFFF) as CodeWord, ((r >> WORD_WIDTH) & 0xFFFF) as CodeWord)
        }

        BasicOp::SHR => {
            // The overflow register catches the bits shifted out below.
            let wide = (u64::from(a) << WORD_WIDTH) >> (b & SHIFT_MASK);
            Outcome::with_overflow(a >> (b & SHIFT_MASK), (wide & 0xFFFF) as CodeWord)
        }

        BasicOp::AND => Outcome::value(a & b),
        BasicOp::BOR => Outcome::value(a | b),
        BasicOp::XOR => Outcome::value(a ^ b),

        BasicOp::IFE => Outcome::skip_unless(a == b),
        BasicOp::IFN => Outcome::skip_unless(a != b),
        BasicOp::IFG => Outcome::skip_unless(a > b),
        BasicOp::IFB => Outcome::skip_unless(a & b != 0),
    }
}
