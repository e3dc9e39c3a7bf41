pub mod lexer;

use self::lexer::{Lexer, Token, TokenKind};
use crate::report::Report;
use crate::spec::hw::{
    CodeWord, Mnemonic, ARG_INDEXED, ARG_NEXT_INDIRECT, ARG_NEXT_LITERAL, ARG_REG_INDIRECT,
    ARG_SHIFT_A, ARG_SHIFT_B, OP_KIND_MASK, WORD_MAX,
};
use derive_more::Constructor;
use std::collections::HashMap;

/*
    The architecture of the assembler:

        The source is processed line by line in a single pass. Each line is
        handed to the lexer and dispatched on its first token: comments and
        blank lines are skipped, a ':' introduces a label definition (whose
        value is the current length of the emitted stream), and an
        instruction mnemonic hands over to the instruction parser. Anything
        else is reported and the line abandoned.

        Operands that reference a label cannot be encoded yet, since the
        label may not be defined until later. Instead a placeholder word is
        emitted immediately, keeping the stream layout correct, and a patch
        (label name, stream index, source line) is recorded. Once every line
        has been consumed the patch list is walked and each placeholder is
        overwritten with its label's offset; patches whose label never
        appeared are reported and left as zero.

        Every failure is reported to the shared log and processing continues
        with the next token or line. A run therefore always produces a
        stream; whether it is trustworthy is decided by whether the log is
        empty.
*/

#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct Patch {
    label: String,
    index: usize,
    line: usize,
}

#[derive(Debug, Default)]
struct Assembler {
    labels: HashMap<String, usize>,
    patches: Vec<Patch>,
    code: Vec<CodeWord>,
    line: usize,
}

/// Translates assembly source into the word-code stream, reporting every
/// problem to `report`. The stream is always produced; callers decide what
/// an unclean report means for it.
pub fn assemble(source: &str, report: &mut Report) -> Vec<CodeWord> {
    Assembler::default().run(source, report)
}

impl Assembler {
    fn run(mut self, source: &str, report: &mut Report) -> Vec<CodeWord> {
        let mut lexer = Lexer::new();

        for (idx, text) in source.lines().enumerate() {
            self.line = idx + 1;
            lexer.set_line(text, self.line);

            match lexer.next_token(report) {
                Token::Semicolon | Token::End => continue,

                Token::Colon => self.parse_label(&mut lexer, report),
                Token::Instruction(mnemonic) => {
                    self.parse_instruction(mnemonic, &mut lexer, report)
                }

                token => {
                    report.unexpected_token(token.kind(), self.line);
                    continue;
                }
            }

            // Label and instruction lines may only be followed by a comment.
            match lexer.next_token(report) {
                Token::End | Token::Semicolon => (),
                _ => report.error("End of line expected", self.line),
            }
        }

        self.resolve(report);
        self.code
    }

    fn parse_label(&mut self, lexer: &mut Lexer<'_>, report: &mut Report) {
        match lexer.next_token(report) {
            Token::Label(name) => {
                // Last definition wins.
                self.labels.insert(name, self.code.len());
            }
            token => report.expecting_token(TokenKind::Label, token.kind(), self.line),
        }
    }

    fn parse_instruction(&mut self, mnemonic: Mnemonic, lexer: &mut Lexer<'_>, report: &mut Report) {
        let code = match mnemonic.code() {
            Some(code) => code,
            None => return self.parse_data(lexer, report),
        };

        let patch_mark = self.patches.len();
        let mut extra = Vec::new();

        match self.parse_operands(code, &mut extra, lexer, report) {
            Some(word) => {
                self.code.push(word);
                self.code.extend(extra);
            }
            None => {
                // Discard patches recorded by a line that failed to encode.
                self.patches.truncate(patch_mark);
            }
        }
    }

    fn parse_operands(
        &mut self,
        code: CodeWord,
        extra: &mut Vec<CodeWord>,
        lexer: &mut Lexer<'_>,
        report: &mut Report,
    ) -> Option<CodeWord> {
        // A zero low nibble marks the single-operand (non-basic) form.
        if code & OP_KIND_MASK == 0 {
            let a = self.parse_operand(extra, lexer, report)?;
            return Some(code | (a << ARG_SHIFT_B));
        }

        let a = self.parse_operand(extra, lexer, report)?;
        if !lexer.consume_expect(TokenKind::Comma, report) {
            return None;
        }
        let b = self.parse_operand(extra, lexer, report)?;

        Some(code | (a << ARG_SHIFT_A) | (b << ARG_SHIFT_B))
    }

    // The raw-data directive: numbers append one word each, strings one word
    // per character. Runs to the end of the line, stopping early only on an
    // invalid token.
    fn parse_data(&mut self, lexer: &mut Lexer<'_>, report: &mut Report) {
        loop {
            match lexer.next_token(report) {
                Token::End => break,
                Token::Invalid => {
                    report.unexpected_token(TokenKind::Invalid, self.line);
                    break;
                }

                Token::Number(value) => self.code.push(CodeWord::from(value)),
                Token::Str(text) => self
                    .code
                    .extend(text.chars().map(|c| c as CodeWord & WORD_MAX)),

                _ => (),
            }
        }
    }

    fn parse_operand(
        &mut self,
        extra: &mut Vec<CodeWord>,
        lexer: &mut Lexer<'_>,
        report: &mut Report,
    ) -> Option<CodeWord> {
        match lexer.next_token(report) {
            // Any register, pseudo and control included, is legal bare.
            Token::Register(reg) => Some(reg.code()),

            // The compact 5-bit immediate encoding exists in the operand
            // space but is never emitted; literals always travel in the
            // next word.
            Token::Number(value) => {
                extra.push(CodeWord::from(value));
                Some(ARG_NEXT_LITERAL)
            }

            Token::Label(name) => {
                self.add_patch(name, 1 + extra.len());
                extra.push(0);
                Some(ARG_NEXT_LITERAL)
            }

            Token::LBracket => self.parse_address_operand(extra, lexer, report),

            token => {
                report.unexpected_token(token.kind(), self.line);
                None
            }
        }
    }

    //
    // Bracketed operand forms:
    //
    // [Reg]        -> 0x08-0x0F (arithmetic registers only)
    // [Imm]        -> 0x1E, value in next word
    // [Lbl]        -> 0x1E, patched next word
    // [Imm+Reg]    -> 0x10-0x17, value in next word
    // [Lbl+Reg]    -> 0x10-0x17, patched next word
    //
    // The offset register may only follow the base value, never precede it.
    //
    fn parse_address_operand(
        &mut self,
        extra: &mut Vec<CodeWord>,
        lexer: &mut Lexer<'_>,
        report: &mut Report,
    ) -> Option<CodeWord> {
        match lexer.next_token(report) {
            Token::Register(reg) => {
                if !reg.is_arithmetic() {
                    report.error(
                        format!("Can't use register '{}' as an address operand", reg),
                        self.line,
                    );
                    return None;
                }
                if !lexer.consume_expect(TokenKind::RBracket, report) {
                    return None;
                }
                return Some(ARG_REG_INDIRECT + reg.code());
            }

            Token::Number(value) => extra.push(CodeWord::from(value)),
            Token::Label(name) => {
                self.add_patch(name, 1 + extra.len());
                extra.push(0);
            }

            token => {
                report.unexpected_token(token.kind(), self.line);
                return None;
            }
        }

        match lexer.next_token(report) {
            Token::RBracket => Some(ARG_NEXT_INDIRECT),

            Token::Plus => {
                let reg = match lexer.next_token(report) {
                    Token::Register(reg) => reg,
                    token => {
                        report.expecting_token(TokenKind::Register, token.kind(), self.line);
                        return None;
                    }
                };
                if !reg.is_arithmetic() {
                    report.error(
                        format!("Can't use register '{}' as an address operand", reg),
                        self.line,
                    );
                    return None;
                }
                if !lexer.consume_expect(TokenKind::RBracket, report) {
                    return None;
                }
                Some(ARG_INDEXED + reg.code())
            }

            token => {
                report.unexpected_token(token.kind(), self.line);
                None
            }
        }
    }

    fn add_patch(&mut self, label: String, offset: usize) {
        self.patches
            .push(Patch::new(label, self.code.len() + offset, self.line));
    }

    fn resolve(&mut self, report: &mut Report) {
        for patch in &self.patches {
            match self.labels.get(&patch.label) {
                Some(&offset) => self.code[patch.index] = offset as CodeWord,
                None => report.error(
                    format!("Unresolved reference to label '{}'", patch.label),
                    patch.line,
                ),
            }
        }
    }
}
