//! Reading and writing word buffers.
//!
//! Modules are stored as little-endian 32-bit words. Failures are always
//! reported as `Err`; an empty file is a legitimate empty buffer.

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

use log::debug;

use crate::error::PatchError;

pub const WORD_SIZE: usize = 4;

/// Read a whole file as 32-bit words
pub fn read_words(path: &Path) -> Result<Vec<u32>, PatchError> {
    let io_err = |e| PatchError::Io(path.to_path_buf(), e);

    let mut file = File::open(path).map_err(io_err)?;
    let size = file.metadata().map_err(io_err)?.len();
    if size % WORD_SIZE as u64 != 0 {
        return Err(PatchError::MisalignedSize(path.to_path_buf(), size));
    }

    let mut bytes = vec![0u8; size as usize];
    // read_exact reports a short read as UnexpectedEof
    file.read_exact(&mut bytes).map_err(io_err)?;

    debug!("Read {} words from {}", bytes.len() / WORD_SIZE, path.display());
    Ok(bytes_to_words(&bytes))
}

/// Write raw bytes, replacing any existing file
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), PatchError> {
    let io_err = |e| PatchError::Io(path.to_path_buf(), e);

    let mut file = File::create(path).map_err(io_err)?;
    // write_all turns a short write into WriteZero
    file.write_all(bytes).map_err(io_err)?;
    file.flush().map_err(io_err)?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Write a word buffer in little-endian order
pub fn write_words(path: &Path, words: &[u32]) -> Result<(), PatchError> {
    write_bytes(path, &words_to_bytes(words))
}

pub fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Convert bytes to words. Panics if `bytes` is not word aligned.
pub fn bytes_to_words(bytes: &[u8]) -> Vec<u32> {
    assert!(
        bytes.len() % WORD_SIZE == 0,
        "byte buffer of length {} is not word aligned",
        bytes.len()
    );
    bytes
        .chunks_exact(WORD_SIZE)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
