use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use biomeset_cli::{run, CommandKind, CommonOptions, DEFAULT_MAX_TICKS};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return Err(usage_text());
    }
    if args[0] == "-h" || args[0] == "--help" {
        print_usage();
        return Ok(());
    }

    let mut options = CommonOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--root" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --root".to_string())?;
                options.root = Some(PathBuf::from(value));
                index += 2;
            }
            _ => break,
        }
    }

    let command = args
        .get(index)
        .ok_or_else(|| "missing subcommand".to_string())?
        .as_str();
    let command_args = &args[(index + 1)..];

    let kind = match command {
        "list-sets" => {
            if !command_args.is_empty() {
                return Err("list-sets takes no arguments".to_string());
            }
            CommandKind::ListSets
        }
        "check-att" => {
            let [path] = command_args else {
                return Err("check-att requires exactly one attribute file path".to_string());
            };
            CommandKind::CheckAtt {
                path: PathBuf::from(path),
            }
        }
        "check-science" => {
            let [path] = command_args else {
                return Err("check-science requires exactly one results file path".to_string());
            };
            CommandKind::CheckScience {
                path: PathBuf::from(path),
            }
        }
        "apply" => {
            let set_name = command_args
                .first()
                .ok_or_else(|| "apply requires a set name".to_string())?
                .clone();
            let mut regions_path = None;
            let mut registry_path = None;
            let mut max_ticks = DEFAULT_MAX_TICKS;
            let mut arg_index = 1usize;
            while arg_index < command_args.len() {
                match command_args[arg_index].as_str() {
                    "--regions" => {
                        let value = command_args
                            .get(arg_index + 1)
                            .ok_or_else(|| "missing value for --regions".to_string())?;
                        regions_path = Some(PathBuf::from(value));
                        arg_index += 2;
                    }
                    "--registry" => {
                        let value = command_args
                            .get(arg_index + 1)
                            .ok_or_else(|| "missing value for --registry".to_string())?;
                        registry_path = Some(PathBuf::from(value));
                        arg_index += 2;
                    }
                    "--max-ticks" => {
                        let value = command_args
                            .get(arg_index + 1)
                            .ok_or_else(|| "missing value for --max-ticks".to_string())?;
                        max_ticks = value.parse::<u32>().map_err(|_| {
                            format!("invalid --max-ticks value '{value}' (expected u32)")
                        })?;
                        arg_index += 2;
                    }
                    other => return Err(format!("unknown apply argument '{other}'")),
                }
            }
            let regions_path = regions_path
                .ok_or_else(|| "apply requires --regions <manifest.json>".to_string())?;
            CommandKind::Apply {
                set_name,
                regions_path,
                registry_path,
                max_ticks,
            }
        }
        "default-set" => {
            let [save] = command_args else {
                return Err("default-set requires exactly one save name".to_string());
            };
            CommandKind::DefaultSet { save: save.clone() }
        }
        "set-default" => {
            let [save, set_name] = command_args else {
                return Err("set-default requires a save name and a set name".to_string());
            };
            CommandKind::SetDefault {
                save: save.clone(),
                set_name: set_name.clone(),
            }
        }
        other => return Err(format!("unknown subcommand '{other}'")),
    };

    run(kind, options, &mut io::stdout())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn print_usage() {
    println!("{}", usage_text());
}

fn usage_text() -> String {
    [
        "biomeset_cli - biome set inspection and application tool",
        "",
        "Usage:",
        "  biomeset_cli [--root <dir>] list-sets",
        "  biomeset_cli check-att <file.att>",
        "  biomeset_cli check-science <ScienceResults.txt>",
        "  biomeset_cli [--root <dir>] apply <set> --regions <manifest.json> [--registry <registry.json>] [--max-ticks <u32>]",
        "  biomeset_cli [--root <dir>] default-set <save>",
        "  biomeset_cli [--root <dir>] set-default <save> <set>",
        "",
        "Defaults:",
        "  --root    resolved from BIOMESET_ROOT or by walking up from the executable",
        "  --max-ticks 1",
    ]
    .join("\n")
}
