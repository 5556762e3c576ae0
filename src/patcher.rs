//! Patch orchestration.
//!
//! Works on a clone of the module words:
//!
//! 1. switch the addressing model from Logical to PhysicalStorageBuffer64
//! 2. declare the SPV_KHR_physical_storage_buffer extension
//! 3. declare the PhysicalStorageBufferAddresses capability
//! 4. resolve the target line to a function and its local variables
//!
//! Every insertion shifts the sections after it, so section offsets are
//! recomputed from the clone right before each insertion. The input module
//! is only borrowed and never changes; on error the clone is dropped.

use std::path::Path;

use log::{debug, info};

use crate::config::PatchConfig;
use crate::encoder::InstructionBuilder;
use crate::error::PatchError;
use crate::locator::{locate, Location};
use crate::module::{ParsedModule, Preamble};
use crate::spirv::{AddressingModel, Capability, Op, PHYSICAL_STORAGE_BUFFER_EXTENSION};
use crate::words::write_words;

/// One instruction added to the module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inserted {
    pub op: Op,
    pub offset: usize,
    pub words: usize,
}

#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub words: Vec<u32>,
    /// Addressing model of the input module
    pub previous_addressing: AddressingModel,
    pub inserted: Vec<Inserted>,
    /// Resolved target, for instrumentation passes that rewrite the access
    pub location: Location,
}

impl PatchOutcome {
    pub fn write(&self, path: &Path) -> Result<(), PatchError> {
        write_words(path, &self.words)
    }
}

pub struct Patcher {
    config: PatchConfig,
}

impl Patcher {
    pub fn new(config: PatchConfig) -> Self {
        Patcher { config }
    }

    pub fn patch(&self, module: &ParsedModule) -> Result<PatchOutcome, PatchError> {
        let mut words = module.words.clone();
        let mut inserted = Vec::new();

        let previous_addressing = enable_physical_addressing(&mut words)?;

        let preamble = Preamble::scan(&words)?;
        if self.config.dedup_declarations
            && preamble.has_extension(PHYSICAL_STORAGE_BUFFER_EXTENSION)
        {
            debug!("{} already declared", PHYSICAL_STORAGE_BUFFER_EXTENSION);
        } else {
            let offset = preamble.sections.extensions;
            let len = InstructionBuilder::new(Op::Extension)
                .push_str(PHYSICAL_STORAGE_BUFFER_EXTENSION)
                .insert(&mut words, offset);
            inserted.push(Inserted {
                op: Op::Extension,
                offset,
                words: len,
            });
        }

        // rescan: the extension insert may have moved everything after it
        let preamble = Preamble::scan(&words)?;
        let cap = Capability::PhysicalStorageBufferAddresses;
        if self.config.dedup_declarations && preamble.has_capability(cap) {
            debug!("{:?} capability already declared", cap);
        } else {
            let offset = preamble.sections.capabilities;
            let len = InstructionBuilder::new(Op::Capability)
                .push(cap)
                .insert(&mut words, offset);
            inserted.push(Inserted {
                op: Op::Capability,
                offset,
                words: len,
            });
        }

        let target = self.config.target;
        let location = locate(module, target.file, target.line, self.config.inexact_lines)?;

        info!(
            "Patched module: {} -> {}, {} instructions inserted, target in function {}",
            previous_addressing,
            AddressingModel::PhysicalStorageBuffer64,
            inserted.len(),
            location.function_name
        );

        Ok(PatchOutcome {
            words,
            previous_addressing,
            inserted,
            location,
        })
    }
}

/// Rewrite the addressing model in place. Returns the previous model.
pub fn enable_physical_addressing(words: &mut [u32]) -> Result<AddressingModel, PatchError> {
    let preamble = Preamble::scan(words)?;
    let slot = preamble.sections.addressing_model_word();

    match preamble.addressing {
        AddressingModel::Logical => {
            words[slot] = AddressingModel::PhysicalStorageBuffer64.into();
            debug!("Addressing model at word {} switched to PhysicalStorageBuffer64", slot);
        }
        AddressingModel::PhysicalStorageBuffer64 => {
            debug!("Addressing model already PhysicalStorageBuffer64");
        }
        other => return Err(PatchError::UnsupportedAddressingModel(other)),
    }
    Ok(preamble.addressing)
}
