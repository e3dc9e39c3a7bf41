use super::alu;
use super::types::LogLevel;
use crate::spec::hw::{
    BasicOp, CodeWord, Reg, ARG_MASK, ARG_NEXT_INDIRECT, ARG_NEXT_LITERAL, ARG_SHIFT_A,
    ARG_SHIFT_B, FONT_BASE, FONT_GLYPHS, FONT_WORDS_PER_GLYPH, MEM_CELLS, MEM_WORDS, OP_JSR,
    OP_KIND_MASK, OP_LONG_MASK, O_ADDR, PC_ADDR, REG_BASE, SCRATCH_ADDR, SP_ADDR, VIDEO_BASE,
    VIDEO_COLS, VIDEO_ROWS, WORD_MAX,
};
use num_traits::FromPrimitive;
use std::fmt;
use strum::IntoEnumIterator;
use strum_macros::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Halted,
}

/// The machine. One flat cell space holds the 16-bit address range with the
/// registers, program counter, stack pointer and overflow register mapped in
/// above it, so that operand decoding resolves every addressing mode to a
/// plain cell index. Execution is driven one instruction at a time by an
/// external caller; running past the loaded program is the only halt.
pub struct Emulator {
    log: LogLevel,

    mem: Vec<CodeWord>,
    code_len: usize,
    skip_next: bool,
    total_steps: u64,
}

impl fmt::Display for Emulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for reg in Reg::iter().filter(|reg| reg.is_arithmetic()) {
            write!(f, "{}:{:04X} ", reg, self.reg(reg))?;
        }
        write!(
            f,
            "PC:{:04X} SP:{:04X} O:{:04X}",
            self.reg(Reg::PC),
            self.reg(Reg::SP),
            self.reg(Reg::O)
        )
    }
}

impl Emulator {
    pub fn new(log: LogLevel) -> Self {
        let mut vm = Emulator {
            log,
            mem: vec![0; MEM_CELLS],
            code_len: 0,
            skip_next: false,
            total_steps: 0,
        };
        vm.reset();
        vm
    }

    pub fn reset(&mut self) {
        for cell in self.mem.iter_mut() {
            *cell = 0;
        }

        // The stack grows down from the top of the address range.
        self.mem[SP_ADDR] = WORD_MAX;

        self.code_len = 0;
        self.skip_next = false;
        self.total_steps = 0;
    }

    /// Resets the machine and copies the stream in at address 0; its length
    /// becomes the executable boundary.
    pub fn load(&mut self, code: &[CodeWord]) {
        if code.len() > MEM_WORDS {
            panic!("program overflows the address space");
        }

        self.reset();
        self.mem[..code.len()].copy_from_slice(code);
        self.code_len = code.len();
    }

    pub fn state(&self) -> State {
        if self.mem[PC_ADDR] as usize >= self.code_len {
            State::Halted
        } else {
            State::Running
        }
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    fn take_code_word(&mut self) -> CodeWord {
        let pc = self.mem[PC_ADDR] as usize;
        self.mem[PC_ADDR] += 1;
        self.mem[pc]
    }

    // Resolves the 6-bit operand field at `shift` to a cell index, consuming
    // any extra stream word it claims. Always called for both operands of a
    // fetched instruction, skip pending or not, so the program counter ends
    // up past the whole instruction either way.
    fn decode_operand_addr(&mut self, instr: CodeWord, shift: u32) -> usize {
        const POP: usize = Reg::POP as usize;
        const PEEK: usize = Reg::PEEK as usize;
        const PUSH: usize = Reg::PUSH as usize;
        const SP: usize = Reg::SP as usize;
        const PC: usize = Reg::PC as usize;
        const O: usize = Reg::O as usize;
        const NEXT_INDIRECT: usize = ARG_NEXT_INDIRECT as usize;
        const NEXT_LITERAL: usize = ARG_NEXT_LITERAL as usize;

        let arg = ((instr >> shift) & ARG_MASK) as usize;

        match arg {
            // Register cells and the cells they point at.
            0x00..=0x07 => REG_BASE + arg,
            0x08..=0x0F => self.mem[REG_BASE + (arg - 0x08)] as usize,
            0x10..=0x17 => {
                let base = self.take_code_word();
                ((base + self.mem[REG_BASE + (arg - 0x10)]) & WORD_MAX) as usize
            }

            // Stack operations; the addressing mode itself moves the
            // pointer.
            POP => {
                let sp = self.mem[SP_ADDR];
                self.mem[SP_ADDR] = (sp + 1) & WORD_MAX;
                sp as usize
            }
            PEEK => self.mem[SP_ADDR] as usize,
            PUSH => {
                let sp = self.mem[SP_ADDR].wrapping_sub(1) & WORD_MAX;
                self.mem[SP_ADDR] = sp;
                sp as usize
            }

            SP => SP_ADDR,
            PC => PC_ADDR,
            O => O_ADDR,

            NEXT_INDIRECT => self.take_code_word() as usize,

            // The literal lives in the code stream, and that cell is what a
            // write through this operand mutates.
            NEXT_LITERAL => {
                let pc = self.mem[PC_ADDR] as usize;
                self.mem[PC_ADDR] += 1;
                pc
            }

            // 0x20-0x3F is never produced by the assembler; reads and
            // writes land in the scratch cell.
            _ => SCRATCH_ADDR,
        }
    }

    /// One fetch-decode-execute. A program counter at or past the loaded
    /// length makes this a no-op.
    pub fn step(&mut self) {
        let pc = self.mem[PC_ADDR] as usize;
        if pc >= self.code_len {
            return;
        }
        self.total_steps += 1;

        let instr = self.take_code_word();
        if self.log.dump_steps {
            println!("{:#06X} => {:#07X}", pc, instr);
        }

        let kind = instr & OP_KIND_MASK;
        if kind != 0 {
            if let Some(op) = BasicOp::from_u32(kind) {
                self.exec_basic(instr, op);
            }
        } else if instr & OP_LONG_MASK == OP_JSR {
            self.exec_jsr(instr);
        }
        // A zero kind without the call marker has nothing to execute.
    }

    fn exec_basic(&mut self, instr: CodeWord, op: BasicOp) {
        let a = self.decode_operand_addr(instr, ARG_SHIFT_A);
        let b = self.decode_operand_addr(instr, ARG_SHIFT_B);

        if self.skip_next {
            self.skip_next = false;
            return;
        }

        let outcome = alu::apply(op, self.mem[a], self.mem[b]);
        if let Some(overflow) = outcome.overflow {
            self.mem[O_ADDR] = overflow & WORD_MAX;
        }
        if let Some(result) = outcome.result {
            self.mem[a] = result & WORD_MAX;
        }
        self.skip_next = outcome.skip_next;
    }

    fn exec_jsr(&mut self, instr: CodeWord) {
        let a = self.decode_operand_addr(instr, ARG_SHIFT_B);

        if self.skip_next {
            self.skip_next = false;
            return;
        }

        // Push the address of the next instruction, then jump.
        let pc = self.mem[PC_ADDR];
        let sp = self.mem[SP_ADDR].wrapping_sub(1) & WORD_MAX;
        self.mem[SP_ADDR] = sp;
        self.mem[sp as usize] = pc;
        self.mem[PC_ADDR] = self.mem[a];
    }

    /// Value of a cell-backed register. The stack pseudo-registers are
    /// addressing modes, not cells, and have no value to read.
    pub fn reg(&self, reg: Reg) -> CodeWord {
        let addr = match reg {
            Reg::SP => SP_ADDR,
            Reg::PC => PC_ADDR,
            Reg::O => O_ADDR,
            Reg::POP | Reg::PEEK | Reg::PUSH => {
                panic!("pseudo register {} is not backed by a cell", reg)
            }
            arith => REG_BASE + arith as usize,
        };
        self.mem[addr]
    }

    pub fn mem(&self, addr: usize) -> CodeWord {
        self.mem[addr]
    }

    /// Collaborator write access, used e.g. to fill the font glyph table.
    pub fn write_word(&mut self, addr: usize, value: CodeWord) {
        self.mem[addr] = value & WORD_MAX;
    }

    /// The display buffer: one character code per on-screen cell.
    pub fn vram(&self) -> &[CodeWord] {
        &self.mem[VIDEO_BASE..VIDEO_BASE + VIDEO_COLS * VIDEO_ROWS]
    }

    /// The character ROM: two bitmap-column words per glyph.
    pub fn font(&self) -> &[CodeWord] {
        &self.mem[FONT_BASE..FONT_BASE + FONT_GLYPHS * FONT_WORDS_PER_GLYPH]
    }
}
