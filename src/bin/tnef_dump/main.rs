use anyhow::{Context, Result, bail, format_err};
use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use encoding::all::encodings;
use encoding::types::Encoding;
use encoding::EncodingRef;
use log::{LevelFilter, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::exit;
use tempfile::NamedTempFile;

use tnef::{ComplianceMode, TnefSettings};

mod dump;
mod rewrite;

/// Settings shared by every subcommand.
pub struct CommonOptions {
    pub settings: TnefSettings,
    pub no_confirm_overwrite: bool,
}

impl CommonOptions {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let codec_name = matches
            .get_one::<String>("ansi-codec")
            .map(String::as_str)
            .unwrap_or("windows-1252");

        let ansi_codec: EncodingRef = *encodings()
            .iter()
            .find(|c| c.name() == codec_name)
            .ok_or_else(|| format_err!("unknown codec `{}`", codec_name))?;

        let compliance = if matches.get_flag("strict") {
            ComplianceMode::Strict
        } else {
            ComplianceMode::Loose
        };

        Ok(CommonOptions {
            settings: TnefSettings::new()
                .compliance(compliance)
                .ansi_codec(ansi_codec),
            no_confirm_overwrite: matches.get_flag("no-confirm-overwrite"),
        })
    }
}

/// Refuses to clobber directories, and asks before replacing an existing file unless told not to.
/// Missing parent directories are created.
pub fn prepare_output_path(path: &Path, prompt: bool) -> Result<()> {
    if path.is_dir() {
        bail!(
            "There is a directory at {}, refusing to overwrite",
            path.display()
        );
    }

    if path.exists() {
        if prompt {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Are you sure you want to override output file at {}",
                    path.display()
                ))
                .default(false)
                .interact()
                .context("Failed to write confirmation prompt to term")?;

            if !confirmed {
                bail!("Cancelled");
            }
        }
        return Ok(());
    }

    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() || parent.exists() => Ok(()),
        Some(parent) => fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display())),
        None => bail!("Output file cannot be root."),
    }
}

pub fn create_output_file(path: &Path, prompt: bool) -> Result<File> {
    prepare_output_path(path, prompt)?;
    File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}

/// A temporary file next to `path`, so that persisting it is a rename on the same filesystem.
pub fn temp_file_beside(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))
}

fn try_to_initialize_logging(matches: &ArgMatches) {
    let level = match matches.get_count("verbose") {
        0 => return,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        3 => LevelFilter::Trace,
        _ => {
            eprintln!("using more than  -vvv does not affect verbosity level");
            LevelFilter::Trace
        }
    };

    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logging: {:?}", e);
    }
}

fn ansi_codec_names() -> Vec<&'static str> {
    encodings()
        .iter()
        .filter(|&e| e.raw_decoder().is_ascii_compatible())
        .map(|e| e.name())
        .collect()
}

fn command() -> Command {
    Command::new("tnef_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to inspect and rewrite TNEF (winmail.dat) streams")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("ansi-codec")
                .long("ansi-codec")
                .global(true)
                .value_parser(PossibleValuesParser::new(ansi_codec_names()))
                .default_value(encoding::all::WINDOWS_1252.name())
                .help("Codec of String8 values, used until the stream declares its own code page."),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("When set, attributes with invalid checksums are reported as errors."),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("-v - info, -vv - debug, -vvv - trace. \
                trace output is only available in debug builds, as it is extremely verbose"),
        )
        .subcommand(dump::command())
        .subcommand(rewrite::command())
}

fn main() {
    let matches = command().get_matches();

    let result = match matches.subcommand() {
        Some(("dump", sub)) => {
            try_to_initialize_logging(sub);
            dump::run(sub)
        }
        Some(("rewrite", sub)) => {
            try_to_initialize_logging(sub);
            rewrite::run(sub)
        }
        _ => Err(format_err!("a subcommand is required")),
    };

    if let Err(e) = result {
        eprintln!("{:?}", e);
        exit(1)
    }

    info!("Done");
}
