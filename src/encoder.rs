//! Instruction encoding.
//!
//! `InstructionBuilder` collects the operands of exactly one instruction and
//! then emits header and operands together, either as a standalone word
//! vector or spliced into an existing buffer. The builder is consumed by
//! every emitting call, so a draft cannot be inserted twice.

use std::fmt::Debug;

use log::debug;

use crate::spirv::Op;

/// Largest instruction the 16-bit word count field can describe
pub const MAX_WORD_COUNT: usize = 0xFFFF;

#[must_use = "an instruction draft must be inserted or discarded"]
#[derive(Debug)]
pub struct InstructionBuilder {
    opcode: u16,
    operands: Vec<u32>,
}

impl InstructionBuilder {
    pub fn new(op: Op) -> Self {
        Self::with_opcode(op as u16)
    }

    /// Builder for an opcode without a named `Op`
    pub fn with_opcode(opcode: u16) -> Self {
        InstructionBuilder {
            opcode,
            operands: Vec::new(),
        }
    }

    /// Append one operand word
    pub fn push(mut self, value: impl Into<u32>) -> Self {
        self.operands.push(value.into());
        self
    }

    /// Append one operand word from a wider type.
    ///
    /// Panics when the value does not fit in 32 bits.
    pub fn push_checked<T>(mut self, value: T) -> Self
    where
        T: TryInto<u32> + Copy + Debug,
    {
        match value.try_into() {
            Ok(word) => self.operands.push(word),
            Err(_) => panic!("operand {:?} does not fit in one word", value),
        }
        self
    }

    /// Append a literal string operand. Panics if `text` contains a nul byte.
    pub fn push_str(mut self, text: &str) -> Self {
        self.operands.extend(encode_literal_string(text));
        self
    }

    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }

    /// Emit header and operands as one sequence, consuming the builder
    pub fn into_words(mut self) -> Vec<u32> {
        let operands = std::mem::take(&mut self.operands);
        let word_count = operands.len() + 1;
        assert!(
            word_count <= MAX_WORD_COUNT,
            "instruction with opcode {} is {} words long, more than a header can describe",
            self.opcode,
            word_count
        );

        let mut words = Vec::with_capacity(word_count);
        words.push(((word_count as u32) << 16) | self.opcode as u32);
        words.extend(operands);
        words
    }

    /// Splice the instruction into `buffer` at word `offset`.
    ///
    /// Everything at or after `offset` moves forward by the returned
    /// instruction length. Panics if `offset` is past the end of the buffer.
    pub fn insert(self, buffer: &mut Vec<u32>, offset: usize) -> usize {
        assert!(
            offset <= buffer.len(),
            "insertion offset {} is past the end of a {}-word buffer",
            offset,
            buffer.len()
        );

        let opcode = self.opcode;
        let words = self.into_words();
        let len = words.len();
        buffer.splice(offset..offset, words);

        debug!(
            "Inserted opcode {} ({} words) at word offset {}",
            opcode, len, offset
        );
        len
    }

    /// Drop a draft on purpose
    pub fn discard(mut self) {
        self.operands.clear();
    }
}

impl Drop for InstructionBuilder {
    fn drop(&mut self) {
        if !self.operands.is_empty() && !std::thread::panicking() {
            panic!(
                "instruction draft for opcode {} dropped with {} pending operands",
                self.opcode,
                self.operands.len()
            );
        }
    }
}

/// Pack a string into words: four bytes per word, first byte in the low
/// byte, nul terminated and zero padded.
///
/// Panics if `text` contains a nul byte; a literal cannot hold one.
pub fn encode_literal_string(text: &str) -> Vec<u32> {
    assert!(
        !text.contains('\0'),
        "literal string {:?} contains a nul byte",
        text
    );
    let bytes = text.as_bytes();
    // +1 for the terminating nul
    let mut words = vec![0u32; bytes.len() / 4 + 1];
    for (i, &b) in bytes.iter().enumerate() {
        words[i / 4] |= (b as u32) << (8 * (i % 4));
    }
    words
}

/// Decode a literal string from the start of `words`.
///
/// Returns the string and the number of words it occupies, or `None` if no
/// nul terminator is found.
pub fn decode_literal_string(words: &[u32]) -> Option<(String, usize)> {
    let mut bytes = Vec::new();
    for (index, word) in words.iter().enumerate() {
        for b in word.to_le_bytes() {
            if b == 0 {
                return Some((String::from_utf8_lossy(&bytes).into_owned(), index + 1));
            }
            bytes.push(b);
        }
    }
    None
}
