use std::fmt;
use std::io::Read;

use ahash::RandomState;
use hashbrown::HashMap;
use log::{debug, trace, warn};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::err::{Result, TnefError};
use crate::property_reader::PropertyEntry;
use crate::tnef_attribute::Attribute;
use crate::tnef_decoder::TnefDecoder;
use crate::tnef_settings::TnefSettings;

/// Placeholder rendered for values that could not be read or render as nothing.
pub const UNKNOWN_VALUE: &str = "unknown";

/// Insertion ordered property dump. The first value inserted under a key wins.
#[derive(Debug, Default)]
pub struct PropertyMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize, RandomState>,
    errors: Vec<TnefError>,
}

impl PropertyMap {
    pub fn new() -> Self {
        PropertyMap::default()
    }

    /// Inserts `value` unless `key` is already present. Returns whether it was inserted.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.index.contains_key(&key) {
            return false;
        }

        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value.into()));
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `key = value` lines, in insertion order.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.iter().map(|(k, v)| format!("{} = {}", k, v))
    }

    /// Errors met while collecting that did not stop collection, plus the one that did, if any.
    pub fn errors(&self) -> &[TnefError] {
        &self.errors
    }

    /// Whether the stream ended before its last attribute was complete.
    pub fn is_truncated(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, TnefError::TruncatedStream { .. }))
    }

    fn record_error(&mut self, error: TnefError) {
        warn!("{}", error);
        self.errors.push(error);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl PartialEq for PropertyMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            writeln!(f, "{} = {}", key, value)?;
        }
        Ok(())
    }
}

impl Serialize for PropertyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Key under which a property is reported.
pub fn property_key(entry: &PropertyEntry<'_>) -> String {
    match entry.name_id() {
        Some(name_id) => name_id.to_string(),
        None => format!("MAPI:{}", entry.tag()),
    }
}

fn display_value(entry: &PropertyEntry<'_>) -> String {
    match entry.read_value() {
        Ok(value) => {
            let rendered = value.to_string();
            if rendered.is_empty() {
                UNKNOWN_VALUE.to_owned()
            } else {
                rendered
            }
        }
        Err(e) => {
            debug!("Cannot render {}: {}", entry.tag(), e);
            UNKNOWN_VALUE.to_owned()
        }
    }
}

/// Read-only pass building a [`PropertyMap`] of every property in a stream.
#[derive(Debug, Clone, Default)]
pub struct PropertyCollector {
    settings: TnefSettings,
}

impl PropertyCollector {
    pub fn new(settings: TnefSettings) -> Self {
        PropertyCollector { settings }
    }

    /// Collects the properties of every `MapiProperties` attribute.
    ///
    /// Only a source that is not a TNEF stream at all is an error. Anything that goes wrong later
    /// is recorded in [`PropertyMap::errors`], and an error that breaks framing ends collection
    /// with whatever was gathered so far, including the properties read from the attribute the
    /// stream was cut in.
    pub fn collect<R: Read>(&self, source: R) -> Result<PropertyMap> {
        let mut decoder = TnefDecoder::new(source, self.settings.clone())?;
        let mut map = PropertyMap::new();

        while let Some(attribute) = decoder.next_attribute() {
            match attribute {
                Ok(attribute) => {
                    if attribute.is_mapi_properties() {
                        collect_attribute(&decoder, &attribute, &mut map, false);
                    }
                }
                Err(e) => {
                    if let Some(partial) = decoder.take_truncated_attribute() {
                        if partial.is_mapi_properties() {
                            collect_attribute(&decoder, &partial, &mut map, true);
                        }
                    }
                    map.record_error(e);
                }
            }
        }

        Ok(map)
    }
}

/// Adds the properties of one attribute. For a truncated attribute, the error met at the cut is
/// the truncation itself and is left to the caller.
fn collect_attribute<R: Read>(
    decoder: &TnefDecoder<R>,
    attribute: &Attribute,
    map: &mut PropertyMap,
    truncated: bool,
) {
    let reader = match decoder.property_reader(attribute) {
        Ok(reader) => reader,
        Err(e) if truncated => {
            debug!("Nothing to collect from truncated attribute: {}", e);
            return;
        }
        Err(e) => {
            map.record_error(e);
            return;
        }
    };

    for entry in reader {
        match entry {
            Ok(entry) => {
                let key = property_key(&entry);
                if !map.insert(key.as_str(), display_value(&entry)) {
                    trace!("Ignoring duplicate property {}", key);
                }
            }
            // The property reader stops by itself after an error.
            Err(e) if truncated => debug!("Stopped at the end of truncated attribute: {}", e),
            Err(e) => map.record_error(e),
        }
    }
}

/// Collects properties with the default settings.
pub fn collect_properties<R: Read>(source: R) -> Result<PropertyMap> {
    PropertyCollector::default().collect(source)
}
