// Patcher Error Handling

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::spirv::AddressingModel;

#[derive(Debug)]
pub enum PatchError {
    // File errors
    Io(PathBuf, io::Error),
    MisalignedSize(PathBuf, u64), // path, size in bytes

    // Module structure errors
    InvalidHeader(usize), // word count
    BadMagic(u32),
    Malformed(String, usize), // message, word offset
    MissingMemoryModel,

    // Patch errors
    UnsupportedAddressingModel(AddressingModel),
    UnknownSourceFile(usize, usize), // requested index, number of files
    LineNotFound(usize, u32),        // file index, line
    InexactLine(u32, u32),           // requested, found

    // Configuration errors
    Config(PathBuf, String),
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PatchError::Io(path, err) => {
                write!(f, "I/O error on '{}': {}", path.display(), err)
            }
            PatchError::MisalignedSize(path, size) => {
                write!(
                    f,
                    "'{}' is {} bytes long, which is not a whole number of 32-bit words",
                    path.display(),
                    size
                )
            }
            PatchError::InvalidHeader(len) => {
                write!(f, "Module too short for a header: {} words", len)
            }
            PatchError::BadMagic(magic) if magic.swap_bytes() == crate::spirv::MAGIC => {
                write!(
                    f,
                    "Module is big-endian (magic 0x{:08x}); only little-endian modules are supported",
                    magic
                )
            }
            PatchError::BadMagic(magic) => {
                write!(f, "Not a SPIR-V module: bad magic 0x{:08x}", magic)
            }
            PatchError::Malformed(msg, offset) => {
                write!(f, "Malformed module at word {}: {}", offset, msg)
            }
            PatchError::MissingMemoryModel => {
                write!(f, "Module has no OpMemoryModel instruction")
            }
            PatchError::UnsupportedAddressingModel(model) => {
                write!(
                    f,
                    "Unsupported addressing model {}: only Logical can be switched to PhysicalStorageBuffer64",
                    model
                )
            }
            PatchError::UnknownSourceFile(index, count) => {
                write!(
                    f,
                    "Source file index {} out of range: module declares {} source files",
                    index, count
                )
            }
            PatchError::LineNotFound(file, line) => {
                write!(f, "No line marker at or after line {} in source file {}", line, file)
            }
            PatchError::InexactLine(requested, found) => {
                write!(
                    f,
                    "No exact match for line {}: nearest marker is at line {}",
                    requested, found
                )
            }
            PatchError::Config(path, msg) => {
                write!(f, "Invalid configuration '{}': {}", path.display(), msg)
            }
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PatchError::Io(_, err) => Some(err),
            _ => None,
        }
    }
}
