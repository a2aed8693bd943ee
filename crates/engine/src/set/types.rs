use std::path::PathBuf;

use thiserror::Error;

use super::science::MalformedScienceLine;

/// Per-region failure kinds, for callers that match on class rather than
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionErrorKind {
    TextureDecode,
    MalformedAttributeFile,
}

/// A failure scoped to a single region. The region's prior state is always
/// preserved when one of these is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionApplyError {
    #[error("failed to decode biome map {path}: {message}")]
    TextureDecode { path: PathBuf, message: String },
    #[error("malformed attribute file {path}: {message}")]
    MalformedAttributeFile { path: PathBuf, message: String },
}

impl RegionApplyError {
    pub fn kind(&self) -> RegionErrorKind {
        match self {
            RegionApplyError::TextureDecode { .. } => RegionErrorKind::TextureDecode,
            RegionApplyError::MalformedAttributeFile { .. } => {
                RegionErrorKind::MalformedAttributeFile
            }
        }
    }
}

/// A failure scoped to the set's shared science results file. Entries
/// parsed before the failure point are still staged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScienceApplyError {
    #[error("failed to read science results {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
    #[error(transparent)]
    MalformedLine(MalformedScienceLine),
}

/// What happened to one region during an apply pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionOutcome {
    pub region_name: String,
    pub map_replaced: bool,
    pub attributes_replaced: bool,
    pub errors: Vec<RegionApplyError>,
}

impl RegionOutcome {
    pub fn untouched(&self) -> bool {
        !self.map_replaced && !self.attributes_replaced && self.errors.is_empty()
    }
}

/// What happened to the set's science results file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScienceOutcome {
    pub entries_staged: usize,
    pub error: Option<ScienceApplyError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub total_regions: usize,
    pub maps_replaced: usize,
    pub attribute_lists_replaced: usize,
    pub regions_with_errors: usize,
    pub science_entries_staged: usize,
}

impl ApplySummary {
    pub fn status_label(&self) -> &'static str {
        if self.regions_with_errors > 0 {
            "applied_with_errors"
        } else {
            "applied"
        }
    }
}

/// Diagnostic report for one apply pass. Advisory only; the orchestrator
/// never turns any of this into an `Err`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyReport {
    pub set_name: String,
    pub outcomes: Vec<RegionOutcome>,
    pub science: ScienceOutcome,
    pub summary: ApplySummary,
}

impl ApplyReport {
    pub fn render_human_readable(&self) -> String {
        let mut output = format!(
            "set={} regions={} maps_replaced={} attributes_replaced={} regions_with_errors={} science_staged={} status={}",
            self.set_name,
            self.summary.total_regions,
            self.summary.maps_replaced,
            self.summary.attribute_lists_replaced,
            self.summary.regions_with_errors,
            self.summary.science_entries_staged,
            self.summary.status_label()
        );
        for outcome in &self.outcomes {
            output.push('\n');
            output.push_str(&format!(
                "region={} map={} attributes={}",
                outcome.region_name,
                replaced_label(outcome.map_replaced),
                replaced_label(outcome.attributes_replaced)
            ));
            for error in &outcome.errors {
                output.push_str(&format!(" error={error}"));
            }
        }
        if let Some(error) = &self.science.error {
            output.push('\n');
            output.push_str(&format!("science_error={error}"));
        }
        output
    }
}

fn replaced_label(replaced: bool) -> &'static str {
    if replaced {
        "replaced"
    } else {
        "unchanged"
    }
}
