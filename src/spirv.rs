//! SPIR-V vocabulary used by the patcher.
//!
//! Only the opcodes and enumerants the patcher reads or writes are listed.
//! Values come from the SPIR-V unified specification.

use std::fmt;

/// Magic number in the first word of every module.
pub const MAGIC: u32 = 0x0723_0203;

/// Number of words in the module header (magic, version, generator, bound, schema).
pub const HEADER_WORDS: usize = 5;

/// Extension that introduces the PhysicalStorageBuffer64 addressing model.
pub const PHYSICAL_STORAGE_BUFFER_EXTENSION: &str = "SPV_KHR_physical_storage_buffer";

/// Opcodes the patcher cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Op {
    Nop = 0,
    Source = 3,
    SourceExtension = 4,
    Name = 5,
    MemberName = 6,
    String = 7,
    Line = 8,
    Extension = 10,
    ExtInstImport = 11,
    ExtInst = 12,
    MemoryModel = 14,
    EntryPoint = 15,
    ExecutionMode = 16,
    Capability = 17,
    Function = 54,
    FunctionParameter = 55,
    FunctionEnd = 56,
    Variable = 59,
    Label = 248,
    NoLine = 317,
    ModuleProcessed = 330,
}

impl Op {
    pub fn from_u16(value: u16) -> Option<Op> {
        let op = match value {
            0 => Op::Nop,
            3 => Op::Source,
            4 => Op::SourceExtension,
            5 => Op::Name,
            6 => Op::MemberName,
            7 => Op::String,
            8 => Op::Line,
            10 => Op::Extension,
            11 => Op::ExtInstImport,
            12 => Op::ExtInst,
            14 => Op::MemoryModel,
            15 => Op::EntryPoint,
            16 => Op::ExecutionMode,
            17 => Op::Capability,
            54 => Op::Function,
            55 => Op::FunctionParameter,
            56 => Op::FunctionEnd,
            59 => Op::Variable,
            248 => Op::Label,
            317 => Op::NoLine,
            330 => Op::ModuleProcessed,
            _ => return None,
        };
        Some(op)
    }

    pub fn name(self) -> &'static str {
        match self {
            Op::Nop => "OpNop",
            Op::Source => "OpSource",
            Op::SourceExtension => "OpSourceExtension",
            Op::Name => "OpName",
            Op::MemberName => "OpMemberName",
            Op::String => "OpString",
            Op::Line => "OpLine",
            Op::Extension => "OpExtension",
            Op::ExtInstImport => "OpExtInstImport",
            Op::ExtInst => "OpExtInst",
            Op::MemoryModel => "OpMemoryModel",
            Op::EntryPoint => "OpEntryPoint",
            Op::ExecutionMode => "OpExecutionMode",
            Op::Capability => "OpCapability",
            Op::Function => "OpFunction",
            Op::FunctionParameter => "OpFunctionParameter",
            Op::FunctionEnd => "OpFunctionEnd",
            Op::Variable => "OpVariable",
            Op::Label => "OpLabel",
            Op::NoLine => "OpNoLine",
            Op::ModuleProcessed => "OpModuleProcessed",
        }
    }
}

impl From<Op> for u16 {
    fn from(op: Op) -> u16 {
        op as u16
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Addressing model operand of OpMemoryModel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingModel {
    Logical,
    Physical32,
    Physical64,
    PhysicalStorageBuffer64,
    /// Anything this tool does not know about
    Unknown(u32),
}

impl From<u32> for AddressingModel {
    fn from(value: u32) -> Self {
        match value {
            0 => AddressingModel::Logical,
            1 => AddressingModel::Physical32,
            2 => AddressingModel::Physical64,
            5348 => AddressingModel::PhysicalStorageBuffer64,
            other => AddressingModel::Unknown(other),
        }
    }
}

impl From<AddressingModel> for u32 {
    fn from(model: AddressingModel) -> u32 {
        match model {
            AddressingModel::Logical => 0,
            AddressingModel::Physical32 => 1,
            AddressingModel::Physical64 => 2,
            AddressingModel::PhysicalStorageBuffer64 => 5348,
            AddressingModel::Unknown(other) => other,
        }
    }
}

impl fmt::Display for AddressingModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AddressingModel::Logical => write!(f, "Logical"),
            AddressingModel::Physical32 => write!(f, "Physical32"),
            AddressingModel::Physical64 => write!(f, "Physical64"),
            AddressingModel::PhysicalStorageBuffer64 => write!(f, "PhysicalStorageBuffer64"),
            AddressingModel::Unknown(value) => write!(f, "<unknown addressing model {}>", value),
        }
    }
}

/// Capability enumerants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Matrix,
    Shader,
    Addresses,
    Linkage,
    Kernel,
    Int64,
    PhysicalStorageBufferAddresses,
}

impl From<Capability> for u32 {
    fn from(cap: Capability) -> u32 {
        match cap {
            Capability::Matrix => 0,
            Capability::Shader => 1,
            Capability::Addresses => 4,
            Capability::Linkage => 5,
            Capability::Kernel => 6,
            Capability::Int64 => 11,
            Capability::PhysicalStorageBufferAddresses => 5347,
        }
    }
}

/// Memory model operand of OpMemoryModel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryModel {
    Simple,
    Glsl450,
    OpenCl,
    Vulkan,
}

impl From<MemoryModel> for u32 {
    fn from(model: MemoryModel) -> u32 {
        match model {
            MemoryModel::Simple => 0,
            MemoryModel::Glsl450 => 1,
            MemoryModel::OpenCl => 2,
            MemoryModel::Vulkan => 3,
        }
    }
}

/// Storage classes, only the ones needed to classify OpVariable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    UniformConstant,
    Input,
    Uniform,
    Output,
    Private,
    Function,
    PhysicalStorageBuffer,
}

impl From<StorageClass> for u32 {
    fn from(class: StorageClass) -> u32 {
        match class {
            StorageClass::UniformConstant => 0,
            StorageClass::Input => 1,
            StorageClass::Uniform => 2,
            StorageClass::Output => 3,
            StorageClass::Private => 6,
            StorageClass::Function => 7,
            StorageClass::PhysicalStorageBuffer => 5349,
        }
    }
}
