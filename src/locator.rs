//! Debug-line lookup: (source file, line) to the enclosing function.

use log::{debug, warn};
use serde::Deserialize;

use crate::error::PatchError;
use crate::module::{LineMarker, ParsedModule};

/// What to do when no marker sits exactly on the requested line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InexactLinePolicy {
    /// Use the next marker after the requested line and log a warning
    #[default]
    Warn,
    /// Treat a missing exact marker as an error
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMatch {
    Exact,
    /// The nearest following marker was used
    Inexact { found: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub id: u32,
    pub name: String,
}

/// A resolved patch target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: usize,
    pub line: u32,
    pub matched: LineMatch,
    pub marker: LineMarker,
    pub function_id: u32,
    pub function_name: String,
    pub variables: Vec<Variable>,
}

impl Location {
    pub fn is_exact(&self) -> bool {
        self.matched == LineMatch::Exact
    }
}

/// First marker at or after `line`; markers must already be sorted by line
pub fn lower_bound(markers: &[LineMarker], line: u32) -> Option<&LineMarker> {
    let index = markers.partition_point(|m| m.line < line);
    markers.get(index)
}

pub fn locate(
    module: &ParsedModule,
    file: usize,
    line: u32,
    policy: InexactLinePolicy,
) -> Result<Location, PatchError> {
    let source = module
        .sources
        .get(file)
        .ok_or(PatchError::UnknownSourceFile(file, module.sources.len()))?;

    let marker = *lower_bound(&source.markers, line).ok_or(PatchError::LineNotFound(file, line))?;

    let matched = if marker.line == line {
        LineMatch::Exact
    } else {
        if policy == InexactLinePolicy::Reject {
            return Err(PatchError::InexactLine(line, marker.line));
        }
        warn!(
            "No exact match for {}:{}, using marker at line {}",
            source.path, line, marker.line
        );
        LineMatch::Inexact { found: marker.line }
    };

    let function = &module.functions[marker.function];
    let variables = function
        .variables
        .iter()
        .map(|&id| Variable {
            id,
            name: module.name(id).to_string(),
        })
        .collect();

    debug!(
        "Line {} of {} resolves to function {} (%{})",
        line, source.path, function.name, function.id
    );

    Ok(Location {
        file,
        line,
        matched,
        marker,
        function_id: function.id,
        function_name: function.name.clone(),
        variables,
    })
}
