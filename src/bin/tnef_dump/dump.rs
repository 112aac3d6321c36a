use anyhow::{Context, Result, bail};
use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use indoc::indoc;
use log::warn;
use serde_json::json;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use tnef::{PropertyCollector, PropertyMap, TnefDecoder, TnefSettings, hexdump};

use crate::{CommonOptions, create_output_file};

/// Opaque attribute payloads are shown up to this many bytes.
const HEXDUMP_LIMIT: usize = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum DumpFormat {
    Text,
    Json,
    JsonLines,
}

pub fn command() -> Command {
    Command::new("dump")
        .about("Print the MAPI properties of TNEF streams")
        .long_about(indoc!(
            r#"
            Print the MAPI properties of one or more TNEF streams.

            Every property of every MapiProperties attribute is printed once, as
            `key = value`. Numbered properties are keyed `MAPI:<tag>`, named properties by
            their property set GUID and id or name. When a key repeats, the first value wins.
            Values that cannot be rendered are printed as `unknown`.
        "#
        ))
        .arg(
            Arg::new("INPUT")
                .required(true)
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("TNEF files (usually named winmail.dat) to dump."),
        )
        .arg(
            Arg::new("format")
                .short('o')
                .long("format")
                .value_parser(PossibleValuesParser::new(["text", "json", "jsonl"]))
                .default_value("text")
                .help("Sets the output format")
                .long_help(indoc!(
                    r#"
                    Sets the output format:
                        "text"  - `key = value` lines.
                        "json"  - one indented JSON object per input.
                        "jsonl" - same as json, one object per line.
                "#
                )),
        )
        .arg(
            Arg::new("output")
                .short('f')
                .long("output")
                .value_parser(value_parser!(PathBuf))
                .help(indoc!(
                    "Writes output to the file specified instead of stdout, errors will still be \
                     printed to stderr. Will ask for confirmation before overwriting files, to \
                     allow overwriting, pass `--no-confirm-overwrite`."
                )),
        )
        .arg(
            Arg::new("attributes")
                .long("attributes")
                .action(ArgAction::SetTrue)
                .help("Also list every attribute frame, with a hexdump of opaque payloads (text output only)."),
        )
        .arg(
            Arg::new("num-threads")
                .short('t')
                .long("threads")
                .value_parser(value_parser!(usize))
                .default_value("0")
                .help("Sets the number of worker threads, defaults to number of CPU cores."),
        )
}

struct DumpJob {
    settings: TnefSettings,
    format: DumpFormat,
    show_attributes: bool,
    show_headers: bool,
}

impl DumpJob {
    fn render(&self, input: &Path) -> Result<String> {
        let file = File::open(input)
            .with_context(|| format!("Failed to open file {}", input.display()))?;
        let map = PropertyCollector::new(self.settings.clone())
            .collect(BufReader::new(file))
            .with_context(|| format!("Failed to read {}", input.display()))?;

        for error in map.errors() {
            warn!("{}: {}", input.display(), error);
        }

        match self.format {
            DumpFormat::Text => self.render_text(input, &map),
            DumpFormat::Json => Ok(serde_json::to_string_pretty(&self.json_value(input, &map))?),
            DumpFormat::JsonLines => Ok(serde_json::to_string(&self.json_value(input, &map))?),
        }
    }

    fn json_value(&self, input: &Path, map: &PropertyMap) -> serde_json::Value {
        json!({
            "file": input.display().to_string(),
            "properties": map,
            "errors": map.errors().iter().map(ToString::to_string).collect::<Vec<_>>(),
        })
    }

    fn render_text(&self, input: &Path, map: &PropertyMap) -> Result<String> {
        let mut out = String::new();

        if self.show_headers {
            writeln!(out, "==> {} <==", input.display())?;
        }

        if self.show_attributes {
            self.render_attributes(input, &mut out)?;
        }

        if map.is_empty() {
            writeln!(out, "No MAPI properties found")?;
        }
        for line in map.lines() {
            writeln!(out, "{}", line)?;
        }

        Ok(out)
    }

    fn render_attributes(&self, input: &Path, out: &mut String) -> Result<()> {
        let file = File::open(input)
            .with_context(|| format!("Failed to open file {}", input.display()))?;
        let decoder = TnefDecoder::new(BufReader::new(file), self.settings.clone())?;

        for attribute in decoder {
            let attribute = match attribute {
                Ok(attribute) => attribute,
                Err(e) => {
                    writeln!(out, "Error: {}", e)?;
                    continue;
                }
            };

            write!(
                out,
                "Attribute {} at 0x{:08x}: {:?}, {} bytes, checksum 0x{:04X}",
                attribute.tag,
                attribute.offset,
                attribute.level,
                attribute.payload.len(),
                attribute.checksum
            )?;
            if !attribute.has_valid_checksum() {
                write!(out, " (computed 0x{:04X})", attribute.computed_checksum())?;
            }
            writeln!(out)?;

            if !attribute.is_mapi_properties() {
                out.push_str(&hexdump(&attribute.payload, 0, Some(HEXDUMP_LIMIT)));
            }
        }

        writeln!(out)?;
        Ok(())
    }
}

#[cfg(feature = "multithreading")]
fn render_all(job: &DumpJob, inputs: &[PathBuf], num_threads: usize) -> Result<Vec<Result<String>>> {
    use rayon::prelude::*;

    if num_threads == 1 || inputs.len() == 1 {
        return Ok(inputs.iter().map(|input| job.render(input)).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .context("Failed to start worker threads")?;

    Ok(pool.install(|| inputs.par_iter().map(|input| job.render(input)).collect()))
}

#[cfg(not(feature = "multithreading"))]
fn render_all(job: &DumpJob, inputs: &[PathBuf], num_threads: usize) -> Result<Vec<Result<String>>> {
    if num_threads > 1 {
        eprintln!(
            "turned on threads, but library was compiled without `multithreading` feature! using fallback sync iterator"
        );
    }

    Ok(inputs.iter().map(|input| job.render(input)).collect())
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    let common = CommonOptions::from_matches(matches)?;

    let inputs: Vec<PathBuf> = matches
        .get_many::<PathBuf>("INPUT")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let format = match matches.get_one::<String>("format").map(String::as_str) {
        Some("json") => DumpFormat::Json,
        Some("jsonl") => DumpFormat::JsonLines,
        _ => DumpFormat::Text,
    };

    let show_attributes = matches.get_flag("attributes");
    if show_attributes && format != DumpFormat::Text {
        eprintln!("`--attributes` only affects text output");
    }

    let job = DumpJob {
        settings: common.settings,
        format,
        show_attributes,
        show_headers: inputs.len() > 1,
    };

    let num_threads = matches.get_one::<usize>("num-threads").copied().unwrap_or(0);

    let mut output: Box<dyn Write> = match matches.get_one::<PathBuf>("output") {
        Some(path) => Box::new(create_output_file(path, !common.no_confirm_overwrite)?),
        None => Box::new(io::stdout().lock()),
    };

    let mut failed = 0;
    for (input, rendered) in inputs.iter().zip(render_all(&job, &inputs, num_threads)?) {
        match rendered {
            Ok(text) => {
                writeln!(output, "{}", text.trim_end_matches('\n'))
                    .context("Failed to write output")?;
            }
            Err(e) => {
                eprintln!("{}: {:?}", input.display(), e);
                failed += 1;
            }
        }
    }
    output.flush().context("Failed to write output")?;

    if failed > 0 {
        bail!("{} of {} inputs could not be dumped", failed, inputs.len());
    }

    Ok(())
}
