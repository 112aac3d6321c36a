use std::io::Write;

use log::trace;

use crate::attribute_stream::{AttributeWriter, Checksum};
use crate::err::{Result, TnefError};
use crate::property_reader::PropertyEntry;
use crate::property_tag::PropertyTag;
use crate::property_value::PropertyValue;
use crate::tnef_attribute::{Attribute, AttributeLevel, AttributeTag};
use crate::tnef_decoder::TNEF_SIGNATURE;

/// Streaming TNEF encoder.
///
/// Output is buffered, nothing is guaranteed to have reached the sink until [`TnefEncoder::close`]
/// returns successfully.
pub struct TnefEncoder<W: Write> {
    stream: AttributeWriter<W>,
    attributes: usize,
}

impl<W: Write> TnefEncoder<W> {
    /// Writes the stream header.
    pub fn new(sink: W, attachment_key: u16) -> Result<Self> {
        let mut stream = AttributeWriter::new(sink);
        stream.write_u32(TNEF_SIGNATURE)?;
        stream.write_u16(attachment_key)?;

        Ok(TnefEncoder {
            stream,
            attributes: 0,
        })
    }

    /// Number of attributes written so far.
    pub fn attributes_written(&self) -> usize {
        self.attributes
    }

    /// Re-emits `attribute` exactly as it was read, declared checksum included.
    pub fn write_attribute_passthrough(&mut self, attribute: &Attribute) -> Result<()> {
        self.write_frame(
            attribute.level,
            attribute.tag,
            &attribute.payload,
            attribute.checksum,
        )
    }

    /// Writes a freshly built attribute with a computed checksum.
    pub fn write_attribute(
        &mut self,
        level: AttributeLevel,
        tag: AttributeTag,
        payload: &[u8],
    ) -> Result<()> {
        self.write_frame(level, tag, payload, Checksum::of(payload).value())
    }

    fn write_frame(
        &mut self,
        level: AttributeLevel,
        tag: AttributeTag,
        payload: &[u8],
        checksum: u16,
    ) -> Result<()> {
        trace!(
            "Offset `0x{:08x}`: writing attribute {} ({} bytes)",
            self.stream.offset(),
            tag,
            payload.len()
        );
        self.stream.write_u8(level.to_u8())?;
        self.stream.write_u32(tag.0)?;
        self.stream.write_len_prefixed(payload)?;
        self.stream.write_u16(checksum)?;
        self.attributes += 1;
        Ok(())
    }

    /// Opens a `MapiProperties` attribute modelled on `source`.
    ///
    /// Nothing reaches the stream until [`PropertiesWriter::finish`] is called, so an attribute
    /// abandoned halfway leaves the output untouched.
    pub fn start_properties_attribute<'e, 's>(
        &'e mut self,
        source: &'s Attribute,
    ) -> Result<PropertiesWriter<'e, 's, W>> {
        let count = source
            .payload
            .get(..4)
            .ok_or(TnefError::MalformedAttribute {
                offset: source.offset,
                level: source.level.to_u8(),
                tag: source.tag.0,
                message: "properties attribute has no property count",
            })?;

        let mut payload = Vec::with_capacity(source.payload.len());
        payload.extend_from_slice(count);

        Ok(PropertiesWriter {
            encoder: self,
            source,
            payload,
            overridden: 0,
        })
    }

    /// Flushes all buffered output and hands back the sink.
    pub fn close(self) -> Result<W> {
        self.stream.finish()
    }
}

/// Accumulates the payload of one `MapiProperties` attribute.
pub struct PropertiesWriter<'e, 's, W: Write> {
    encoder: &'e mut TnefEncoder<W>,
    source: &'s Attribute,
    payload: Vec<u8>,
    overridden: usize,
}

impl<W: Write> PropertiesWriter<'_, '_, W> {
    /// Copies a property byte for byte.
    pub fn write_property_passthrough(&mut self, entry: &PropertyEntry<'_>) {
        self.payload.extend_from_slice(entry.raw());
    }

    /// Serializes `tag` with a new value. The tag takes the type of the value.
    pub fn write_property_override(&mut self, tag: &PropertyTag, value: &PropertyValue<'_>) {
        tag.with_type(value.prop_type()).encode(&mut self.payload);
        self.payload.extend_from_slice(value.bytes());
        self.overridden += 1;
    }

    pub fn write_trailing(&mut self, bytes: &[u8]) {
        self.payload.extend_from_slice(bytes);
    }

    pub fn overridden(&self) -> usize {
        self.overridden
    }

    /// Writes the attribute to the stream.
    ///
    /// A payload identical to the source keeps the source's declared checksum, even when that
    /// checksum was wrong.
    pub fn finish(self) -> Result<()> {
        let checksum = if self.payload == self.source.payload {
            self.source.checksum
        } else {
            Checksum::of(&self.payload).value()
        };

        self.encoder.write_frame(
            self.source.level,
            self.source.tag,
            &self.payload,
            checksum,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property_id::ids;
    use crate::property_tag::PropertyType;
    use crate::tnef_decoder::TnefDecoder;
    use crate::tnef_settings::TnefSettings;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn properties_payload(properties: &[(PropertyTag, PropertyValue<'_>)]) -> Vec<u8> {
        let mut payload = (properties.len() as u32).to_le_bytes().to_vec();
        for (tag, value) in properties {
            tag.encode(&mut payload);
            payload.extend_from_slice(value.bytes());
        }
        payload
    }

    fn mapi_attribute(payload: Vec<u8>, checksum: u16) -> Attribute {
        Attribute {
            level: AttributeLevel::Message,
            tag: AttributeTag::MapiProperties,
            payload,
            checksum,
            offset: 6,
        }
    }

    #[test]
    fn test_header_and_fresh_attribute() {
        let mut encoder = TnefEncoder::new(Vec::new(), 0x0102).unwrap();
        encoder
            .write_attribute(AttributeLevel::Attachment, AttributeTag::AttachData, &[1, 2, 3])
            .unwrap();
        assert_eq!(encoder.attributes_written(), 1);
        let out = encoder.close().unwrap();

        let mut expected = vec![0x78, 0x9F, 0x3E, 0x22, 0x02, 0x01];
        expected.push(0x02);
        expected.extend_from_slice(&AttributeTag::AttachData.0.to_le_bytes());
        expected.extend_from_slice(&3_u32.to_le_bytes());
        expected.extend_from_slice(&[1, 2, 3]);
        expected.extend_from_slice(&6_u16.to_le_bytes());
        assert_eq!(out, expected);
    }

    #[test]
    fn test_passthrough_keeps_declared_checksum() {
        let attribute = Attribute {
            level: AttributeLevel::Message,
            tag: AttributeTag::Body,
            payload: b"hi".to_vec(),
            checksum: 0x1234,
            offset: 6,
        };

        let mut encoder = TnefEncoder::new(Vec::new(), 0).unwrap();
        encoder.write_attribute_passthrough(&attribute).unwrap();
        let out = encoder.close().unwrap();
        assert_eq!(&out[out.len() - 2..], &[0x34, 0x12]);
    }

    #[test]
    fn test_unmodified_properties_attribute_reuses_source_checksum() {
        let mut payload = properties_payload(&[(
            PropertyTag::numbered(ids::Importance, PropertyType::LONG),
            PropertyValue::long(2),
        )]);
        payload.extend_from_slice(&[0xAB, 0xCD]);
        let source = mapi_attribute(payload, 0xFFFF);

        let decoder = TnefDecoder::new(
            Cursor::new(vec![0x78, 0x9F, 0x3E, 0x22, 0, 0]),
            TnefSettings::default(),
        )
        .unwrap();
        let mut reader = decoder.property_reader(&source).unwrap();

        let mut encoder = TnefEncoder::new(Vec::new(), 0).unwrap();
        let mut properties = encoder.start_properties_attribute(&source).unwrap();
        for entry in reader.by_ref() {
            properties.write_property_passthrough(&entry.unwrap());
        }
        properties.write_trailing(reader.trailing());
        properties.finish().unwrap();
        let out = encoder.close().unwrap();

        let body = &out[6..];
        assert_eq!(&body[9..body.len() - 2], &source.payload[..]);
        assert_eq!(&body[body.len() - 2..], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_override_recomputes_length_and_checksum() {
        let tag = PropertyTag::numbered(ids::MessageClass, PropertyType::UNICODE);
        let source = mapi_attribute(
            properties_payload(&[(tag.clone(), PropertyValue::unicode("IPM.Note"))]),
            0,
        );

        let mut encoder = TnefEncoder::new(Vec::new(), 0).unwrap();
        let mut properties = encoder.start_properties_attribute(&source).unwrap();
        properties.write_property_override(&tag, &PropertyValue::unicode("IPM.Note.Custom"));
        assert_eq!(properties.overridden(), 1);
        properties.finish().unwrap();
        let out = encoder.close().unwrap();

        let expected_payload =
            properties_payload(&[(tag, PropertyValue::unicode("IPM.Note.Custom"))]);
        let body = &out[6..];
        assert_eq!(
            &body[5..9],
            &(expected_payload.len() as u32).to_le_bytes()
        );
        assert_eq!(&body[9..body.len() - 2], &expected_payload[..]);
        assert_eq!(
            &body[body.len() - 2..],
            &Checksum::of(&expected_payload).value().to_le_bytes()
        );
    }

    #[test]
    fn test_abandoned_properties_attribute_writes_nothing() {
        let source = mapi_attribute(0_u32.to_le_bytes().to_vec(), 0);
        let mut encoder = TnefEncoder::new(Vec::new(), 0).unwrap();
        {
            let mut properties = encoder.start_properties_attribute(&source).unwrap();
            properties.write_trailing(&[1, 2, 3]);
        }
        assert_eq!(encoder.attributes_written(), 0);
        assert_eq!(encoder.close().unwrap().len(), 6);
    }

    #[test]
    fn test_properties_attribute_needs_a_count() {
        let source = mapi_attribute(vec![1], 1);
        let mut encoder = TnefEncoder::new(Vec::new(), 0).unwrap();
        assert!(matches!(
            encoder.start_properties_attribute(&source),
            Err(TnefError::MalformedAttribute { .. })
        ));
    }
}
