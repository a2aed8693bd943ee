use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use biomeset_engine::{
    apply_set, list_set_names, parse_attribute_file, parse_science_results, read_settings,
    resolve_install_paths, write_settings_atomic, write_text_atomic, DefaultSets, InjectionSession,
    InjectionState, InstallPaths, MemoryExperimentRegistry, RegionRegistry, Settings,
    SettingsReadState,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TICKS: u32 = 1;

#[derive(Debug, Clone, Default)]
pub struct CommonOptions {
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    ListSets,
    CheckAtt {
        path: PathBuf,
    },
    CheckScience {
        path: PathBuf,
    },
    Apply {
        set_name: String,
        regions_path: PathBuf,
        registry_path: Option<PathBuf>,
        max_ticks: u32,
    },
    DefaultSet {
        save: String,
    },
    SetDefault {
        save: String,
        set_name: String,
    },
}

pub fn run<W: Write>(kind: CommandKind, opts: CommonOptions, stdout: &mut W) -> Result<(), String> {
    match kind {
        CommandKind::ListSets => run_list_sets(&opts, stdout),
        CommandKind::CheckAtt { path } => run_check_att(&path, stdout),
        CommandKind::CheckScience { path } => run_check_science(&path, stdout),
        CommandKind::Apply {
            set_name,
            regions_path,
            registry_path,
            max_ticks,
        } => run_apply(
            &opts,
            &set_name,
            &regions_path,
            registry_path.as_deref(),
            max_ticks,
            stdout,
        ),
        CommandKind::DefaultSet { save } => run_default_set(&opts, &save, stdout),
        CommandKind::SetDefault { save, set_name } => {
            run_set_default(&opts, &save, &set_name, stdout)
        }
    }
}

fn run_list_sets<W: Write>(opts: &CommonOptions, stdout: &mut W) -> Result<(), String> {
    let paths = resolve_paths(opts)?;
    let names = list_set_names(&paths).map_err(|error| error.to_string())?;
    if names.is_empty() {
        out_line(
            stdout,
            &format!("no biome sets found in {}", paths.sets_dir.display()),
        )?;
        return Ok(());
    }
    for name in names {
        out_line(stdout, &name)?;
    }
    Ok(())
}

fn run_check_att<W: Write>(path: &Path, stdout: &mut W) -> Result<(), String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read attribute file '{}': {error}", path.display()))?;
    let (mode, attributes) =
        parse_attribute_file(&raw).map_err(|error| format!("{}: {error}", path.display()))?;
    out_line(
        stdout,
        &format!(
            "exact_search={} threshold={} attributes={}",
            mode.enabled,
            mode.threshold,
            attributes.len()
        ),
    )?;
    for attribute in &attributes {
        out_line(
            stdout,
            &format!(
                "{} value={} color=({:.4}, {:.4}, {:.4}, {:.4})",
                attribute.name,
                attribute.value,
                attribute.color.r,
                attribute.color.g,
                attribute.color.b,
                attribute.color.a
            ),
        )?;
    }
    Ok(())
}

fn run_check_science<W: Write>(path: &Path, stdout: &mut W) -> Result<(), String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read science results '{}': {error}", path.display()))?;
    let parse = parse_science_results(&raw);
    for entry in &parse.entries {
        out_line(
            stdout,
            &format!(
                "{} | {} | {}",
                entry.experiment_id, entry.region_name, entry.result_text
            ),
        )?;
    }
    if let Some(error) = parse.error {
        return Err(format!(
            "{}: {error} ({} entries parsed before the failure)",
            path.display(),
            parse.entries.len()
        ));
    }
    out_line(stdout, &format!("{} entries ok", parse.entries.len()))?;
    Ok(())
}

fn run_apply<W: Write>(
    opts: &CommonOptions,
    set_name: &str,
    regions_path: &Path,
    registry_path: Option<&Path>,
    max_ticks: u32,
    stdout: &mut W,
) -> Result<(), String> {
    let paths = resolve_paths(opts)?;
    let manifest = load_region_manifest(regions_path)?;
    if manifest.regions.is_empty() {
        return Err(format!(
            "region manifest '{}' lists no regions",
            regions_path.display()
        ));
    }

    let mut regions = RegionRegistry::from_names(manifest.regions);
    let mut session = InjectionSession::new();
    let report = apply_set(&paths, set_name, &mut regions, &mut session);
    out_line(stdout, &report.render_human_readable())?;

    if let Some(registry_path) = registry_path {
        let mut registry = load_registry_file(registry_path)?;
        let mut ticks = 0u32;
        let mut state = InjectionState::Pending;
        while ticks < max_ticks && state == InjectionState::Pending {
            ticks += 1;
            state = session.tick(&mut registry);
        }
        if state != InjectionState::Injected {
            return Err(format!(
                "experiment registry did not become available within {max_ticks} tick(s)"
            ));
        }
        save_registry_file(registry_path, registry)?;
        out_line(
            stdout,
            &format!(
                "registry updated after {ticks} tick(s): {}",
                registry_path.display()
            ),
        )?;
    }
    Ok(())
}

fn run_default_set<W: Write>(opts: &CommonOptions, save: &str, stdout: &mut W) -> Result<(), String> {
    let paths = resolve_paths(opts)?;
    let defaults = load_defaults(&paths)?;
    out_line(stdout, defaults.set_for_save(save))
}

fn run_set_default<W: Write>(
    opts: &CommonOptions,
    save: &str,
    set_name: &str,
    stdout: &mut W,
) -> Result<(), String> {
    let paths = resolve_paths(opts)?;
    let mut defaults = load_defaults(&paths)?;
    defaults.assign(save, set_name);
    let settings = Settings {
        default_sets: defaults.encode(),
    };
    write_settings_atomic(&paths.settings_path, &settings).map_err(|error| error.to_string())?;
    out_line(stdout, &format!("{save} -> {set_name}"))
}

fn load_defaults(paths: &InstallPaths) -> Result<DefaultSets, String> {
    match read_settings(&paths.settings_path).map_err(|error| error.to_string())? {
        SettingsReadState::Present(settings) => Ok(DefaultSets::parse(&settings.default_sets)),
        SettingsReadState::Missing => Ok(DefaultSets::default()),
        SettingsReadState::Unreadable => Err(format!(
            "settings file {} is not valid json; fix or delete it",
            paths.settings_path.display()
        )),
    }
}

fn resolve_paths(opts: &CommonOptions) -> Result<InstallPaths, String> {
    match &opts.root {
        Some(root) => Ok(InstallPaths::for_root(root.clone())),
        None => resolve_install_paths().map_err(|error| error.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct RegionManifest {
    regions: Vec<String>,
}

fn load_region_manifest(path: &Path) -> Result<RegionManifest, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read region manifest '{}': {error}", path.display()))?;
    parse_json(&raw).map_err(|message| {
        format!("parse region manifest '{}': {message}", path.display())
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RegistryFile {
    #[serde(default)]
    experiments: BTreeMap<String, BTreeMap<String, String>>,
}

fn load_registry_file(path: &Path) -> Result<MemoryExperimentRegistry, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read registry '{}': {error}", path.display()))?;
    let file: RegistryFile = parse_json(&raw)
        .map_err(|message| format!("parse registry '{}': {message}", path.display()))?;
    Ok(MemoryExperimentRegistry::from_experiments(file.experiments))
}

fn save_registry_file(path: &Path, registry: MemoryExperimentRegistry) -> Result<(), String> {
    let file = RegistryFile {
        experiments: registry.into_experiments(),
    };
    let text = serde_json::to_string_pretty(&file)
        .map_err(|error| format!("encode registry json: {error}"))?;
    write_text_atomic(path, &text)
        .map_err(|error| format!("write registry '{}': {error}", path.display()))
}

fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(value) => Ok(value),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(source.to_string())
            } else {
                Err(format!("{source} at {path}"))
            }
        }
    }
}

fn out_line<W: Write>(stdout: &mut W, line: &str) -> Result<(), String> {
    writeln!(stdout, "{line}").map_err(|error| format!("write output: {error}"))
}
