use std::io::{Read, Write};

use log::{debug, trace};
use serde::Serialize;

use crate::err::Result;
use crate::property_value::PropertyValue;
use crate::tnef_decoder::TnefDecoder;
use crate::tnef_encoder::TnefEncoder;
use crate::tnef_settings::TnefSettings;

/// What a rewrite pass touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    pub attributes: usize,
    pub properties: usize,
    pub overridden: usize,
}

/// Copies a TNEF stream, replacing the value of one numbered property.
///
/// Attributes and properties keep their order, nothing is added or dropped. Named properties are
/// never rewritten, whatever their textual form.
#[derive(Debug, Clone, Default)]
pub struct RewriteEngine {
    settings: TnefSettings,
}

impl RewriteEngine {
    pub fn new(settings: TnefSettings) -> Self {
        RewriteEngine { settings }
    }

    pub fn settings(&self) -> &TnefSettings {
        &self.settings
    }

    /// Runs a single pass from `source` to `sink`.
    ///
    /// The first error aborts the pass. Attributes written before it are complete, the attribute
    /// that failed is not written at all.
    pub fn rewrite<R: Read, W: Write>(&self, source: R, sink: W) -> Result<RewriteReport> {
        let target = self.settings.get_target_property();
        let replacement = self.settings.get_replacement();

        let mut decoder = TnefDecoder::new(source, self.settings.clone())?;
        let mut encoder = TnefEncoder::new(sink, decoder.attachment_key())?;
        let mut report = RewriteReport::default();

        while let Some(attribute) = decoder.next_attribute() {
            let attribute = attribute?;
            report.attributes += 1;

            if !attribute.is_mapi_properties() {
                encoder.write_attribute_passthrough(&attribute)?;
                continue;
            }

            let mut reader = decoder.property_reader(&attribute)?;
            let mut properties = encoder.start_properties_attribute(&attribute)?;

            while let Some(entry) = reader.next_property() {
                let entry = entry?;
                report.properties += 1;

                if !entry.is_named() && entry.tag().to_string() == target {
                    debug!(
                        "Offset `0x{:08x}`: replacing value of {}",
                        attribute.offset,
                        entry.tag()
                    );
                    properties.write_property_override(entry.tag(), replacement);
                } else {
                    properties.write_property_passthrough(&entry);
                }
            }

            properties.write_trailing(reader.trailing());
            report.overridden += properties.overridden();
            properties.finish()?;
        }

        encoder.close()?;
        trace!("Rewrite complete: {:?}", report);

        Ok(report)
    }
}

/// Replaces the Unicode message class of the stream with `target_literal`.
pub fn rewrite_message_class<R: Read, W: Write>(
    source: R,
    sink: W,
    target_literal: &str,
) -> Result<RewriteReport> {
    let settings = TnefSettings::new().replacement(PropertyValue::unicode(target_literal));
    RewriteEngine::new(settings).rewrite(source, sink)
}
