//! Module ingestion.
//!
//! Turns a raw word buffer into the pieces the patcher needs: section
//! offsets of the module preamble, source files with their line markers,
//! functions with their local variables, and the OpName table. This is not a
//! validator; anything the patcher does not look at is skipped.

use std::fmt::{Display, Error, Formatter};

use indexmap::IndexMap;
use log::{debug, warn};

use crate::encoder::decode_literal_string;
use crate::error::PatchError;
use crate::instruction::{Instructions, RawInstruction};
use crate::spirv::{AddressingModel, Op, StorageClass, HEADER_WORDS, MAGIC};

/// Word offsets of the preamble sections.
///
/// Only valid for the buffer they were computed from. An empty section sits
/// where its first instruction would go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionOffsets {
    pub capabilities: usize,
    pub extensions: usize,
    pub ext_inst_imports: usize,
    pub memory_model: usize,
}

impl SectionOffsets {
    /// Compute fresh offsets from the current buffer contents
    pub fn locate(words: &[u32]) -> Result<SectionOffsets, PatchError> {
        Ok(Preamble::scan(words)?.sections)
    }

    /// Word holding the addressing model operand
    pub fn addressing_model_word(&self) -> usize {
        self.memory_model + 1
    }
}

/// Declarations found before OpMemoryModel
#[derive(Debug, Clone)]
pub struct Preamble {
    pub sections: SectionOffsets,
    pub capabilities: Vec<u32>,
    pub extensions: Vec<String>,
    pub addressing: AddressingModel,
}

impl Preamble {
    pub fn scan(words: &[u32]) -> Result<Preamble, PatchError> {
        check_header(words)?;

        let mut capabilities = Vec::new();
        let mut extensions = Vec::new();
        let mut first_cap = None;
        let mut cap_end = None;
        let mut first_ext = None;
        let mut ext_end = None;
        let mut first_import = None;
        let mut memory_model = None;

        for instr in Instructions::new(words) {
            let instr = instr?;
            debug!("preamble {}", instr);
            let end = instr.offset + instr.word_count();
            match instr.op() {
                Some(Op::Capability) => {
                    first_cap.get_or_insert(instr.offset);
                    cap_end = Some(end);
                    capabilities.push(require_operand(&instr, 0)?);
                }
                Some(Op::Extension) => {
                    first_ext.get_or_insert(instr.offset);
                    ext_end = Some(end);
                    extensions.push(require_string(&instr, 0)?);
                }
                Some(Op::ExtInstImport) => {
                    first_import.get_or_insert(instr.offset);
                }
                Some(Op::MemoryModel) => {
                    memory_model = Some((instr.offset, require_operand(&instr, 0)?));
                    break;
                }
                _ => {}
            }
        }

        let (memory_model, addressing) = memory_model.ok_or(PatchError::MissingMemoryModel)?;
        let capabilities_at = first_cap.unwrap_or(HEADER_WORDS);
        let extensions_at = first_ext.or(cap_end).unwrap_or(capabilities_at);
        let imports_at = first_import.or(ext_end).unwrap_or(extensions_at);

        Ok(Preamble {
            sections: SectionOffsets {
                capabilities: capabilities_at,
                extensions: extensions_at,
                ext_inst_imports: imports_at,
                memory_model,
            },
            capabilities,
            extensions,
            addressing: AddressingModel::from(addressing),
        })
    }

    pub fn has_capability(&self, cap: impl Into<u32>) -> bool {
        let cap = cap.into();
        self.capabilities.contains(&cap)
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e == name)
    }
}

/// Reject buffers that are not little-endian SPIR-V
pub fn check_header(words: &[u32]) -> Result<(), PatchError> {
    if words.len() < HEADER_WORDS {
        return Err(PatchError::InvalidHeader(words.len()));
    }
    if words[0] != MAGIC {
        return Err(PatchError::BadMagic(words[0]));
    }
    Ok(())
}

fn require_operand(instr: &RawInstruction, index: usize) -> Result<u32, PatchError> {
    instr.operand(index).ok_or_else(|| {
        PatchError::Malformed(
            format!("{} is missing operand {}", instr.name(), index),
            instr.offset,
        )
    })
}

fn require_string(instr: &RawInstruction, index: usize) -> Result<String, PatchError> {
    let operands = instr.operands.get(index..).unwrap_or(&[]);
    decode_literal_string(operands)
        .map(|(s, _)| s)
        .ok_or_else(|| {
            PatchError::Malformed(
                format!("{} has an unterminated string literal", instr.name()),
                instr.offset,
            )
        })
}

/// A debug line marker inside a function body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMarker {
    pub line: u32,
    pub column: u32,
    /// Index into `ParsedModule::functions`
    pub function: usize,
}

/// A source file declared with OpString
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Result id of the OpString
    pub id: u32,
    pub path: String,
    /// Sorted by line; markers on the same line keep module order
    pub markers: Vec<LineMarker>,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: u32,
    pub name: String,
    /// Result ids of Function-storage OpVariables, in module order
    pub variables: Vec<u32>,
}

/// A module plus the metadata the patcher consumes
#[derive(Debug, Clone)]
pub struct ParsedModule {
    pub words: Vec<u32>,
    pub sections: SectionOffsets,
    pub sources: Vec<SourceFile>,
    pub functions: Vec<Function>,
    pub names: IndexMap<u32, String>,
}

impl ParsedModule {
    pub fn parse(words: Vec<u32>) -> Result<ParsedModule, PatchError> {
        let sections = SectionOffsets::locate(&words)?;

        let mut sources: Vec<SourceFile> = Vec::new();
        let mut source_by_id: IndexMap<u32, usize> = IndexMap::new();
        let mut names = IndexMap::new();
        let mut functions: Vec<Function> = Vec::new();
        let mut current: Option<usize> = None;

        for instr in Instructions::new(&words) {
            let instr = instr?;
            match instr.op() {
                Some(Op::String) => {
                    let id = require_operand(&instr, 0)?;
                    let path = require_string(&instr, 1)?;
                    source_by_id.insert(id, sources.len());
                    sources.push(SourceFile {
                        id,
                        path,
                        markers: Vec::new(),
                    });
                }
                Some(Op::Name) => {
                    let id = require_operand(&instr, 0)?;
                    names.insert(id, require_string(&instr, 1)?);
                }
                Some(Op::Function) => {
                    if current.is_some() {
                        return Err(PatchError::Malformed(
                            "OpFunction inside another function".to_string(),
                            instr.offset,
                        ));
                    }
                    current = Some(functions.len());
                    functions.push(Function {
                        id: require_operand(&instr, 1)?,
                        name: String::new(),
                        variables: Vec::new(),
                    });
                }
                Some(Op::FunctionEnd) => {
                    current = None;
                }
                Some(Op::Variable) => {
                    if let Some(index) = current {
                        let storage = require_operand(&instr, 2)?;
                        if storage == u32::from(StorageClass::Function) {
                            functions[index].variables.push(require_operand(&instr, 1)?);
                        }
                    }
                }
                Some(Op::Line) => {
                    let Some(function) = current else {
                        continue;
                    };
                    let file = require_operand(&instr, 0)?;
                    let line = require_operand(&instr, 1)?;
                    let column = instr.operand(2).unwrap_or(0);
                    match source_by_id.get(&file) {
                        Some(&index) => sources[index].markers.push(LineMarker {
                            line,
                            column,
                            function,
                        }),
                        None => warn!(
                            "OpLine at word {} names unknown file id {}, skipped",
                            instr.offset, file
                        ),
                    }
                }
                _ => {}
            }
        }

        if current.is_some() {
            return Err(PatchError::Malformed(
                "module ends inside a function".to_string(),
                words.len(),
            ));
        }

        for source in &mut sources {
            // stable: equal lines keep module order
            source.markers.sort_by_key(|m| m.line);
        }
        for function in &mut functions {
            if let Some(name) = names.get(&function.id) {
                function.name = name.clone();
            }
        }

        debug!(
            "Parsed module: {} words, {} source files, {} functions",
            words.len(),
            sources.len(),
            functions.len()
        );

        Ok(ParsedModule {
            words,
            sections,
            sources,
            functions,
            names,
        })
    }

    /// OpName of `id`, or an empty string
    pub fn name(&self, id: u32) -> &str {
        self.names.get(&id).map(String::as_str).unwrap_or("")
    }

    pub fn addressing_model(&self) -> AddressingModel {
        AddressingModel::from(self.words[self.sections.addressing_model_word()])
    }

    pub fn id_bound(&self) -> u32 {
        self.words[3]
    }
}

impl Display for ParsedModule {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "SPIR-V version:           {}.{}
Id bound:                 {}
Module size:              {} words
Capabilities at:          {}
Extensions at:            {}
Ext inst imports at:      {}
Memory model at:          {}
Addressing model:         {}
Source files:             {}
Functions:                {}
",
            (self.words[1] >> 16) & 0xFF,
            (self.words[1] >> 8) & 0xFF,
            self.id_bound(),
            self.words.len(),
            self.sections.capabilities,
            self.sections.extensions,
            self.sections.ext_inst_imports,
            self.sections.memory_model,
            self.addressing_model(),
            self.sources.len(),
            self.functions.len(),
        )
    }
}
