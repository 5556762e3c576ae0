// Test utilities for synthesizing small SPIR-V modules without a shader compiler
use crate::encoder::InstructionBuilder;
use crate::spirv::{AddressingModel, Capability, MemoryModel, Op, StorageClass, MAGIC};

// Opcodes only the builder emits
const OP_TYPE_VOID: u16 = 19;
const OP_TYPE_INT: u16 = 21;
const OP_TYPE_POINTER: u16 = 32;
const OP_TYPE_FUNCTION: u16 = 33;
const OP_RETURN: u16 = 253;

/// SPIR-V 1.3
pub const VERSION_1_3: u32 = 0x0001_0300;

struct FunctionSpec {
    id: u32,
    name: String,
    variables: Vec<(u32, String)>,
    lines: Vec<(u32, u32)>, // file id, line
}

/// Builds a module in logical layout order: capabilities, extensions,
/// imports, memory model, debug strings and names, types, functions.
pub struct ModuleBuilder {
    next_id: u32,
    capabilities: Vec<Capability>,
    extensions: Vec<String>,
    imports: Vec<(u32, String)>,
    addressing: u32,
    strings: Vec<(u32, String)>,
    functions: Vec<FunctionSpec>,
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleBuilder {
    pub fn new() -> Self {
        ModuleBuilder {
            next_id: 1,
            capabilities: Vec::new(),
            extensions: Vec::new(),
            imports: Vec::new(),
            addressing: AddressingModel::Logical.into(),
            strings: Vec::new(),
            functions: Vec::new(),
        }
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn capability(mut self, cap: Capability) -> Self {
        self.capabilities.push(cap);
        self
    }

    pub fn extension(mut self, name: &str) -> Self {
        self.extensions.push(name.to_string());
        self
    }

    pub fn ext_inst_import(mut self, name: &str) -> Self {
        let id = self.alloc_id();
        self.imports.push((id, name.to_string()));
        self
    }

    pub fn addressing(mut self, model: AddressingModel) -> Self {
        self.addressing = model.into();
        self
    }

    /// Declare a source file, returning its OpString id
    pub fn source_file(&mut self, path: &str) -> u32 {
        let id = self.alloc_id();
        self.strings.push((id, path.to_string()));
        id
    }

    /// Declare a function with Function-storage variables and OpLine markers
    /// (file id, line) emitted in the given order. Returns the function id.
    pub fn function(&mut self, name: &str, variables: &[&str], lines: &[(u32, u32)]) -> u32 {
        let id = self.alloc_id();
        let variables = variables
            .iter()
            .map(|v| (self.alloc_id(), v.to_string()))
            .collect();
        self.functions.push(FunctionSpec {
            id,
            name: name.to_string(),
            variables,
            lines: lines.to_vec(),
        });
        id
    }

    pub fn build(&mut self) -> Vec<u32> {
        let void = self.alloc_id();
        let fn_type = self.alloc_id();
        let int = self.alloc_id();
        let int_ptr = self.alloc_id();

        let mut body = Vec::new();
        let mut emit = |builder: InstructionBuilder| body.extend(builder.into_words());

        for &cap in &self.capabilities {
            emit(InstructionBuilder::new(Op::Capability).push(cap));
        }
        for ext in &self.extensions {
            emit(InstructionBuilder::new(Op::Extension).push_str(ext));
        }
        for (id, name) in &self.imports {
            emit(InstructionBuilder::new(Op::ExtInstImport).push(*id).push_str(name));
        }
        emit(
            InstructionBuilder::new(Op::MemoryModel)
                .push(self.addressing)
                .push(MemoryModel::Glsl450),
        );
        for (id, path) in &self.strings {
            emit(InstructionBuilder::new(Op::String).push(*id).push_str(path));
        }
        for f in &self.functions {
            emit(InstructionBuilder::new(Op::Name).push(f.id).push_str(&f.name));
            for (var, name) in &f.variables {
                emit(InstructionBuilder::new(Op::Name).push(*var).push_str(name));
            }
        }

        emit(InstructionBuilder::with_opcode(OP_TYPE_VOID).push(void));
        emit(InstructionBuilder::with_opcode(OP_TYPE_FUNCTION).push(fn_type).push(void));
        emit(InstructionBuilder::with_opcode(OP_TYPE_INT).push(int).push(32u32).push(1u32));
        emit(
            InstructionBuilder::with_opcode(OP_TYPE_POINTER)
                .push(int_ptr)
                .push(StorageClass::Function)
                .push(int),
        );

        let mut labels = Vec::new();
        for _ in 0..self.functions.len() {
            labels.push(self.next_id);
            self.next_id += 1;
        }

        for (f, label) in self.functions.iter().zip(labels) {
            emit(
                InstructionBuilder::new(Op::Function)
                    .push(void)
                    .push(f.id)
                    .push(0u32)
                    .push(fn_type),
            );
            emit(InstructionBuilder::new(Op::Label).push(label));
            for (var, _) in &f.variables {
                emit(
                    InstructionBuilder::new(Op::Variable)
                        .push(int_ptr)
                        .push(*var)
                        .push(StorageClass::Function),
                );
            }
            for &(file, line) in &f.lines {
                emit(InstructionBuilder::new(Op::Line).push(file).push(line).push(1u32));
                emit(InstructionBuilder::new(Op::Nop));
            }
            emit(InstructionBuilder::with_opcode(OP_RETURN));
            emit(InstructionBuilder::new(Op::FunctionEnd));
        }

        let mut words = vec![MAGIC, VERSION_1_3, 0, self.next_id, 0];
        words.extend(body);
        words
    }
}

/// Offsets of every instruction with the given opcode
pub fn find_ops(words: &[u32], op: Op) -> Vec<usize> {
    crate::instruction::Instructions::new(words)
        .filter_map(Result::ok)
        .filter(|i| i.op() == Some(op))
        .map(|i| i.offset)
        .collect()
}
