use std::fmt;

use encoding::{Encoding, EncodingRef};

use crate::property_value::PropertyValue;

pub const DEFAULT_TARGET_PROPERTY: &str = "MessageClass (Unicode)";
pub const DEFAULT_REPLACEMENT: &str = "IPM.Note.Custom";

/// How strictly the framing rules are enforced while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComplianceMode {
    /// Declared checksums are read but never validated.
    #[default]
    Loose,
    /// Attributes whose declared checksum does not match their payload are reported as errors.
    Strict,
}

#[derive(Clone)]
pub struct TnefSettings {
    compliance: ComplianceMode,
    ansi_codec: EncodingRef,
    target_property: String,
    replacement: PropertyValue<'static>,
}

impl fmt::Debug for TnefSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TnefSettings")
            .field("compliance", &self.compliance)
            .field("ansi_codec", &self.ansi_codec.name())
            .field("target_property", &self.target_property)
            .field("replacement", &self.replacement)
            .finish()
    }
}

impl PartialEq for TnefSettings {
    fn eq(&self, other: &Self) -> bool {
        self.compliance == other.compliance
            && self.ansi_codec.name() == other.ansi_codec.name()
            && self.target_property == other.target_property
            && self.replacement == other.replacement
    }
}

impl Default for TnefSettings {
    fn default() -> Self {
        TnefSettings {
            compliance: ComplianceMode::default(),
            ansi_codec: encoding::all::WINDOWS_1252,
            target_property: DEFAULT_TARGET_PROPERTY.to_owned(),
            replacement: PropertyValue::unicode(DEFAULT_REPLACEMENT),
        }
    }
}

impl TnefSettings {
    pub fn new() -> Self {
        TnefSettings::default()
    }

    pub fn compliance(mut self, compliance: ComplianceMode) -> Self {
        self.compliance = compliance;
        self
    }

    /// Codec used for `String8` values when the stream does not declare a code page.
    pub fn ansi_codec(mut self, ansi_codec: EncodingRef) -> Self {
        self.ansi_codec = ansi_codec;
        self
    }

    /// Textual form of the numbered property tag to rewrite, e.g. `MessageClass (Unicode)`.
    pub fn target_property(mut self, target_property: impl Into<String>) -> Self {
        self.target_property = target_property.into();
        self
    }

    pub fn replacement(mut self, replacement: PropertyValue<'static>) -> Self {
        self.replacement = replacement;
        self
    }

    pub fn get_compliance(&self) -> ComplianceMode {
        self.compliance
    }

    pub fn get_ansi_codec(&self) -> EncodingRef {
        self.ansi_codec
    }

    pub fn get_target_property(&self) -> &str {
        &self.target_property
    }

    pub fn get_replacement(&self) -> &PropertyValue<'static> {
        &self.replacement
    }

    pub fn is_strict(&self) -> bool {
        self.compliance == ComplianceMode::Strict
    }
}
