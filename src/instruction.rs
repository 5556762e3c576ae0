use std::fmt::{Display, Error, Formatter};

use crate::error::PatchError;
use crate::spirv::{Op, HEADER_WORDS};

/// A raw instruction inside a word buffer
#[derive(Debug, Clone, Copy)]
pub struct RawInstruction<'a> {
    /// Word offset of the header word
    pub offset: usize,
    /// Opcode from the low 16 bits of the header
    pub opcode: u16,
    /// Operand words (header excluded)
    pub operands: &'a [u32],
}

impl<'a> RawInstruction<'a> {
    /// Known opcode, if the patcher has a name for it
    pub fn op(&self) -> Option<Op> {
        Op::from_u16(self.opcode)
    }

    /// Total size in words, header included
    pub fn word_count(&self) -> usize {
        self.operands.len() + 1
    }

    pub fn operand(&self, index: usize) -> Option<u32> {
        self.operands.get(index).copied()
    }

    /// Opcode name, or `Op<n>` for opcodes without one
    pub fn name(&self) -> String {
        match self.op() {
            Some(op) => op.to_string(),
            None => format!("Op{}", self.opcode),
        }
    }
}

impl Display for RawInstruction<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{:5}: {}", self.offset, self.name())?;
        for operand in self.operands {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}

/// Split a header word into (word count, opcode)
pub fn split_header(word: u32) -> (usize, u16) {
    ((word >> 16) as usize, (word & 0xFFFF) as u16)
}

/// Iterator over the instructions after the module header.
///
/// Yields an error and stops on a zero word count or an instruction that
/// runs past the end of the buffer.
pub struct Instructions<'a> {
    words: &'a [u32],
    offset: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(words: &'a [u32]) -> Self {
        Instructions {
            words,
            offset: HEADER_WORDS.min(words.len()),
            failed: false,
        }
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<RawInstruction<'a>, PatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.words.len() {
            return None;
        }

        let offset = self.offset;
        let (count, opcode) = split_header(self.words[offset]);
        if count == 0 {
            self.failed = true;
            return Some(Err(PatchError::Malformed(
                format!("instruction with opcode {} has a word count of 0", opcode),
                offset,
            )));
        }
        if offset + count > self.words.len() {
            self.failed = true;
            return Some(Err(PatchError::Malformed(
                format!(
                    "instruction with opcode {} needs {} words but only {} remain",
                    opcode,
                    count,
                    self.words.len() - offset
                ),
                offset,
            )));
        }

        self.offset += count;
        Some(Ok(RawInstruction {
            offset,
            opcode,
            operands: &self.words[offset + 1..offset + count],
        }))
    }
}
