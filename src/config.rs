//! Patch configuration.
//!
//! Defaults reproduce the reference behavior: source file 0, line 20,
//! output written to `out.spv`. A TOML file can override any of them:
//!
//! ```toml
//! output = "patched.spv"
//! dedup_declarations = true
//! inexact_lines = "reject"
//!
//! [target]
//! file = 0
//! line = 42
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::PatchError;
use crate::locator::InexactLinePolicy;

pub const DEFAULT_OUTPUT: &str = "out.spv";
pub const DEFAULT_LINE: u32 = 20;

/// Source location the patch resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Target {
    /// Index of the source file in declaration order
    pub file: usize,
    pub line: u32,
}

impl Default for Target {
    fn default() -> Self {
        Target {
            file: 0,
            line: DEFAULT_LINE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatchConfig {
    pub target: Target,
    pub output: PathBuf,
    pub inexact_lines: InexactLinePolicy,
    /// Skip OpExtension/OpCapability declarations that already exist
    pub dedup_declarations: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        PatchConfig {
            target: Target::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            inexact_lines: InexactLinePolicy::Warn,
            dedup_declarations: true,
        }
    }
}

impl PatchConfig {
    pub fn load(path: &Path) -> Result<PatchConfig, PatchError> {
        let text =
            fs::read_to_string(path).map_err(|e| PatchError::Io(path.to_path_buf(), e))?;
        Self::from_toml(&text).map_err(|msg| PatchError::Config(path.to_path_buf(), msg))
    }

    pub fn from_toml(text: &str) -> Result<PatchConfig, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }
}
