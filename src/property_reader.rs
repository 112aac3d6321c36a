use std::fmt;

use encoding::{Encoding, EncodingRef};
use log::trace;

use crate::err::Result;
use crate::property_tag::{NamedPropertyId, PropertyTag};
use crate::property_value::{PropertyValue, Value};
use crate::tnef_attribute::Attribute;
use crate::utils::ByteCursor;

/// One property of a `MapiProperties` attribute.
#[derive(Clone)]
pub struct PropertyEntry<'a> {
    tag: PropertyTag,
    value: PropertyValue<'a>,
    raw: &'a [u8],
    ansi_codec: EncodingRef,
}

impl<'a> PropertyEntry<'a> {
    pub fn tag(&self) -> &PropertyTag {
        &self.tag
    }

    pub fn is_named(&self) -> bool {
        self.tag.is_named()
    }

    pub fn name_id(&self) -> Option<&NamedPropertyId> {
        self.tag.name_id()
    }

    pub fn value(&self) -> &PropertyValue<'a> {
        &self.value
    }

    /// Tag, name and value exactly as they appeared in the stream.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// Decodes the value, applying the code page in effect when this property was read.
    pub fn read_value(&self) -> Result<Value> {
        self.value.decode(self.ansi_codec)
    }
}

impl fmt::Debug for PropertyEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyEntry")
            .field("tag", &self.tag)
            .field("value", &self.value)
            .field("ansi_codec", &self.ansi_codec.name())
            .finish()
    }
}

/// Lazily walks the properties of a `MapiProperties` attribute payload.
///
/// After an error nothing more is yielded: properties carry no length of their own, so there is
/// no way to find the start of the next one.
pub struct PropertyReader<'a> {
    cursor: ByteCursor<'a>,
    declared: u32,
    read: u32,
    ansi_codec: EncodingRef,
    failed: bool,
}

impl<'a> PropertyReader<'a> {
    pub(crate) fn new(attribute: &'a Attribute, ansi_codec: EncodingRef) -> Result<Self> {
        // The payload follows the level, tag and length fields.
        let mut cursor = ByteCursor::new(&attribute.payload, attribute.offset + 9);
        let declared = cursor.u32_named("property count")?;
        trace!(
            "Offset `0x{:08x}`: attribute declares {} properties",
            attribute.offset,
            declared
        );

        Ok(PropertyReader {
            cursor,
            declared,
            read: 0,
            ansi_codec,
            failed: false,
        })
    }

    /// Number of properties the attribute claims to hold.
    pub fn declared_count(&self) -> u32 {
        self.declared
    }

    pub fn next_property(&mut self) -> Option<Result<PropertyEntry<'a>>> {
        if self.failed || self.read >= self.declared {
            return None;
        }

        match self.read_property() {
            Ok(entry) => {
                self.read += 1;
                Some(Ok(entry))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    fn read_property(&mut self) -> Result<PropertyEntry<'a>> {
        let start = self.cursor.pos();
        let offset = self.cursor.position();

        let tag = PropertyTag::read(&mut self.cursor)?;
        let value = PropertyValue::read(&mut self.cursor, tag.prop_type())?;
        trace!("Offset `0x{:08x}`: read property {}", offset, tag);

        Ok(PropertyEntry {
            tag,
            value,
            raw: self.cursor.consumed_since(start),
            ansi_codec: self.ansi_codec,
        })
    }

    /// Bytes left in the payload after the last declared property.
    ///
    /// Only meaningful once every declared property has been read.
    pub fn trailing(&self) -> &'a [u8] {
        self.cursor.remaining()
    }
}

impl<'a> Iterator for PropertyReader<'a> {
    type Item = Result<PropertyEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_property()
    }
}
