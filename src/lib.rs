#![deny(unused_must_use)]
#![forbid(unsafe_code)]
// Don't allow dbg! prints in release.
#![cfg_attr(not(debug_assertions), deny(clippy::dbg_macro))]

pub use agent::{
    AgentOutcome, AgentSettings, DiagnosticsPass, FileLogSink, LogSink, MemoryLogSink,
    MessageClassAgent,
};
pub use attribute_stream::Checksum;
pub use property_map::{PropertyCollector, PropertyMap, collect_properties};
pub use property_reader::{PropertyEntry, PropertyReader};
pub use property_tag::{NamedPropertyId, NamedPropertyKind, PropertyTag, PropertyType};
pub use property_value::{PropertyValue, Value};
pub use rewrite::{RewriteEngine, RewriteReport, rewrite_message_class};
pub use tnef_attribute::{Attribute, AttributeLevel, AttributeTag};
pub use tnef_decoder::{TNEF_SIGNATURE, TnefDecoder};
pub use tnef_encoder::{PropertiesWriter, TnefEncoder};
pub use tnef_settings::{ComplianceMode, DEFAULT_REPLACEMENT, DEFAULT_TARGET_PROPERTY, TnefSettings};
pub use utils::hexdump;

pub mod agent;
mod attribute_stream;
pub mod err;
pub mod property_id;
pub mod property_map;
mod property_reader;
mod property_tag;
mod property_value;
mod rewrite;
mod tnef_attribute;
mod tnef_decoder;
mod tnef_encoder;
mod tnef_settings;
mod utils;

#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
