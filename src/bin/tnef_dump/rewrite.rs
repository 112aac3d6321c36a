use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command, value_parser};
use indoc::indoc;
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tnef::{
    DEFAULT_REPLACEMENT, DEFAULT_TARGET_PROPERTY, PropertyCollector, PropertyType, PropertyValue,
    RewriteEngine, TnefSettings,
};

use crate::{CommonOptions, prepare_output_path, temp_file_beside};

pub fn command() -> Command {
    Command::new("rewrite")
        .about("Replace the value of one property of a TNEF stream")
        .long_about(indoc!(
            r#"
            Replace the value of one numbered MAPI property of a TNEF stream.

            Everything else is copied byte for byte, including checksums and data this tool
            does not understand. By default the Unicode message class is set to IPM.Note.Custom.
            The output is written to a temporary file first and only moved into place once the
            whole stream has been rewritten.
        "#
        ))
        .arg(
            Arg::new("INPUT")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("TNEF file to rewrite."),
        )
        .arg(
            Arg::new("output")
                .short('f')
                .long("output")
                .value_parser(value_parser!(PathBuf))
                .help("Writes the rewritten stream to this file."),
        )
        .arg(
            Arg::new("in-place")
                .long("in-place")
                .action(ArgAction::SetTrue)
                .help("Replaces the input file with the rewritten stream."),
        )
        .group(
            ArgGroup::new("destination")
                .args(["output", "in-place"])
                .required(true),
        )
        .arg(
            Arg::new("property")
                .long("property")
                .default_value(DEFAULT_TARGET_PROPERTY)
                .help("Textual tag of the property to replace, e.g. `MessageClass (Unicode)`."),
        )
        .arg(
            Arg::new("value")
                .long("value")
                .default_value(DEFAULT_REPLACEMENT)
                .help("New value. Written as String8 when the property is a String8 one, as Unicode otherwise."),
        )
        .arg(
            Arg::new("dump-after")
                .long("dump-after")
                .action(ArgAction::SetTrue)
                .help("Print the properties of the rewritten stream."),
        )
}

fn replacement_for(settings: &TnefSettings, property: &str, value: &str) -> PropertyValue<'static> {
    if property.ends_with(&format!("({})", PropertyType::STRING8)) {
        PropertyValue::string8(value, settings.get_ansi_codec())
    } else {
        PropertyValue::unicode(value)
    }
}

pub fn run(matches: &ArgMatches) -> Result<()> {
    let common = CommonOptions::from_matches(matches)?;

    let input = matches
        .get_one::<PathBuf>("INPUT")
        .context("an input is required")?;
    let destination: &Path = match matches.get_one::<PathBuf>("output") {
        Some(path) => {
            prepare_output_path(path, !common.no_confirm_overwrite)?;
            path
        }
        None => input,
    };

    let property = matches
        .get_one::<String>("property")
        .map(String::as_str)
        .unwrap_or(DEFAULT_TARGET_PROPERTY);
    let value = matches
        .get_one::<String>("value")
        .map(String::as_str)
        .unwrap_or(DEFAULT_REPLACEMENT);

    let replacement = replacement_for(&common.settings, property, value);
    let settings = common
        .settings
        .clone()
        .target_property(property)
        .replacement(replacement);

    let source = File::open(input)
        .with_context(|| format!("Failed to open file {}", input.display()))?;

    let mut temp = temp_file_beside(destination)?;
    let report = RewriteEngine::new(settings)
        .rewrite(BufReader::new(source), temp.as_file_mut())
        .with_context(|| format!("Failed to rewrite {}", input.display()))?;

    temp.persist(destination)
        .with_context(|| format!("Failed to write {}", destination.display()))?;

    info!("{:?}", report);
    eprintln!(
        "{}: replaced {} of {} properties in {} attributes",
        destination.display(),
        report.overridden,
        report.properties,
        report.attributes
    );

    if matches.get_flag("dump-after") {
        let written = File::open(destination)
            .with_context(|| format!("Failed to open file {}", destination.display()))?;
        let map = PropertyCollector::new(common.settings).collect(BufReader::new(written))?;
        for line in map.lines() {
            println!("{}", line);
        }
    }

    Ok(())
}
