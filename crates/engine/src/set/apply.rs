use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::inject::InjectionSession;
use crate::region::{Region, RegionRegistry};
use crate::InstallPaths;

use super::attributes::parse_attribute_file;
use super::discovery::SetLayout;
use super::science::parse_science_results;
use super::texture::decode_biome_map;
use super::types::{
    ApplyReport, ApplySummary, RegionApplyError, RegionOutcome, ScienceApplyError, ScienceOutcome,
};

/// Applies a named biome set to every region in the registry, then stages
/// the set's science results onto the session.
///
/// Regions are processed fully independently; one region's failure never
/// aborts the pass. Absent override files are not errors, they just mean
/// the set defines nothing for that slot. Nothing here returns `Err`: every
/// failure is classified into the report and logged.
pub fn apply_set(
    paths: &InstallPaths,
    set_name: &str,
    regions: &mut RegionRegistry,
    session: &mut InjectionSession,
) -> ApplyReport {
    let layout = SetLayout::new(paths, set_name);
    info!(
        set = %set_name,
        set_dir = %layout.set_dir().display(),
        region_count = regions.len(),
        "biome_set_apply_started"
    );

    let mut outcomes = Vec::with_capacity(regions.len());
    for region in regions.regions_mut() {
        outcomes.push(apply_to_region(&layout, set_name, region));
    }

    let science = stage_science_results(&layout, set_name, session);
    let summary = summarize(&outcomes, &science);
    info!(
        set = %set_name,
        regions = summary.total_regions,
        maps_replaced = summary.maps_replaced,
        attributes_replaced = summary.attribute_lists_replaced,
        regions_with_errors = summary.regions_with_errors,
        science_staged = summary.science_entries_staged,
        status = summary.status_label(),
        "biome_set_apply_finished"
    );

    ApplyReport {
        set_name: set_name.to_string(),
        outcomes,
        science,
        summary,
    }
}

fn apply_to_region(layout: &SetLayout, set_name: &str, region: &mut Region) -> RegionOutcome {
    let mut outcome = RegionOutcome {
        region_name: region.name().to_string(),
        map_replaced: false,
        attributes_replaced: false,
        errors: Vec::new(),
    };

    let map_path = layout.map_path(region.name());
    match read_override(&map_path, |p| fs::read(p)) {
        OverrideFile::Absent => {
            debug!(set = %set_name, region = %region.name(), "no_map_override");
        }
        OverrideFile::Unreadable(error) => {
            warn!(
                set = %set_name,
                region = %region.name(),
                path = %map_path.display(),
                error = %error,
                "biome_map_unreadable"
            );
            outcome.errors.push(RegionApplyError::TextureDecode {
                path: map_path.clone(),
                message: format!("file_read_failed:{error}"),
            });
        }
        OverrideFile::Present(bytes) => match decode_biome_map(&bytes) {
            Ok(raster) => {
                info!(
                    set = %set_name,
                    region = %region.name(),
                    width = raster.width(),
                    height = raster.height(),
                    "biome_map_replaced"
                );
                region.replace_map(raster);
                outcome.map_replaced = true;
            }
            Err(error) => {
                warn!(
                    set = %set_name,
                    region = %region.name(),
                    path = %map_path.display(),
                    error = %error,
                    "biome_map_decode_failed"
                );
                outcome.errors.push(RegionApplyError::TextureDecode {
                    path: map_path.clone(),
                    message: error.message,
                });
            }
        },
    }

    let attributes_path = layout.attributes_path(region.name());
    match read_override(&attributes_path, |p| fs::read_to_string(p)) {
        OverrideFile::Absent => {
            debug!(set = %set_name, region = %region.name(), "no_attribute_override");
        }
        OverrideFile::Unreadable(error) => {
            warn!(
                set = %set_name,
                region = %region.name(),
                path = %attributes_path.display(),
                error = %error,
                "biome_attributes_unreadable"
            );
            outcome
                .errors
                .push(RegionApplyError::MalformedAttributeFile {
                    path: attributes_path.clone(),
                    message: format!("file_read_failed:{error}"),
                });
        }
        OverrideFile::Present(raw) => match parse_attribute_file(&raw) {
            Ok((search_mode, attributes)) => {
                info!(
                    set = %set_name,
                    region = %region.name(),
                    attribute_count = attributes.len(),
                    exact_search = search_mode.enabled,
                    "biome_attributes_replaced"
                );
                region.replace_attributes(search_mode, attributes);
                outcome.attributes_replaced = true;
            }
            Err(error) => {
                warn!(
                    set = %set_name,
                    region = %region.name(),
                    path = %attributes_path.display(),
                    error = %error,
                    "biome_attributes_malformed"
                );
                outcome
                    .errors
                    .push(RegionApplyError::MalformedAttributeFile {
                        path: attributes_path.clone(),
                        message: error.to_string(),
                    });
            }
        },
    }

    outcome
}

fn stage_science_results(
    layout: &SetLayout,
    set_name: &str,
    session: &mut InjectionSession,
) -> ScienceOutcome {
    let path = layout.science_results_path();
    match read_override(&path, |p| fs::read_to_string(p)) {
        OverrideFile::Absent => {
            debug!(set = %set_name, "no_science_results");
            ScienceOutcome::default()
        }
        OverrideFile::Unreadable(error) => {
            warn!(
                set = %set_name,
                path = %path.display(),
                error = %error,
                "science_results_unreadable"
            );
            ScienceOutcome {
                entries_staged: 0,
                error: Some(ScienceApplyError::Unreadable {
                    path,
                    message: error.to_string(),
                }),
            }
        }
        OverrideFile::Present(raw) => {
            let parse = parse_science_results(&raw);
            let entries_staged = parse.entries.len();
            if let Some(error) = &parse.error {
                warn!(
                    set = %set_name,
                    path = %path.display(),
                    line = error.line_number,
                    entries_kept = entries_staged,
                    "science_results_truncated"
                );
            }
            if entries_staged > 0 {
                info!(set = %set_name, entries_staged, "science_results_staged");
            }
            session.stage(parse.entries);
            ScienceOutcome {
                entries_staged,
                error: parse.error.map(ScienceApplyError::MalformedLine),
            }
        }
    }
}

enum OverrideFile<T> {
    Absent,
    Unreadable(io::Error),
    Present(T),
}

// Absence is the common case for override files and must stay silent;
// any other read failure is classified, never swallowed.
fn read_override<T>(path: &Path, read: impl FnOnce(&Path) -> io::Result<T>) -> OverrideFile<T> {
    match read(path) {
        Ok(contents) => OverrideFile::Present(contents),
        Err(error) if error.kind() == io::ErrorKind::NotFound => OverrideFile::Absent,
        Err(error) => OverrideFile::Unreadable(error),
    }
}

fn summarize(outcomes: &[RegionOutcome], science: &ScienceOutcome) -> ApplySummary {
    ApplySummary {
        total_regions: outcomes.len(),
        maps_replaced: outcomes.iter().filter(|o| o.map_replaced).count(),
        attribute_lists_replaced: outcomes.iter().filter(|o| o.attributes_replaced).count(),
        regions_with_errors: outcomes.iter().filter(|o| !o.errors.is_empty()).count(),
        science_entries_staged: science.entries_staged,
    }
}
