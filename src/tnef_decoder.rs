use std::io::Read;

use encoding::label::encoding_from_windows_code_page;
use encoding::{Encoding, EncodingRef};
use log::{debug, trace, warn};

use crate::attribute_stream::{AttributeReader, Checksum};
use crate::err::{Result, TnefError};
use crate::property_reader::PropertyReader;
use crate::tnef_attribute::{Attribute, AttributeLevel, AttributeTag};
use crate::tnef_settings::TnefSettings;

pub const TNEF_SIGNATURE: u32 = 0x223E_9F78;

/// Streaming TNEF decoder.
///
/// Attributes are produced lazily, in stream order. An attribute that is framed correctly but
/// otherwise malformed is reported as an error and iteration carries on with the next one; an
/// error that leaves the position of the next attribute unknown is yielded once, after which the
/// reader is exhausted. When the stream ends inside an attribute, the part that was read is
/// available from [`TnefDecoder::take_truncated_attribute`].
pub struct TnefDecoder<R: Read> {
    stream: AttributeReader<R>,
    settings: TnefSettings,
    attachment_key: u16,
    ansi_codec: EncodingRef,
    truncated: Option<Attribute>,
    exhausted: bool,
}

impl<R: Read> TnefDecoder<R> {
    /// Reads the stream header. Fails if the source is not a TNEF stream.
    pub fn new(source: R, settings: TnefSettings) -> Result<Self> {
        let mut stream = AttributeReader::new(source);

        let signature = stream.try_u32_named("tnef signature")?;
        if signature != TNEF_SIGNATURE {
            return Err(TnefError::InvalidSignature { found: signature });
        }
        let attachment_key = stream.try_u16_named("legacy attachment key")?;
        debug!("TNEF stream with attachment key 0x{:04X}", attachment_key);

        Ok(TnefDecoder {
            stream,
            ansi_codec: settings.get_ansi_codec(),
            settings,
            attachment_key,
            truncated: None,
            exhausted: false,
        })
    }

    pub fn attachment_key(&self) -> u16 {
        self.attachment_key
    }

    /// Codec currently used for `String8` values.
    pub fn ansi_codec(&self) -> EncodingRef {
        self.ansi_codec
    }

    pub fn settings(&self) -> &TnefSettings {
        &self.settings
    }

    /// The attribute the stream ended in, holding the part of its payload that was present.
    ///
    /// Only available after a framing error was yielded while reading the payload or checksum of
    /// an attribute with a known level. Its checksum is the one computed over the bytes present.
    pub fn take_truncated_attribute(&mut self) -> Option<Attribute> {
        self.truncated.take()
    }

    pub fn next_attribute(&mut self) -> Option<Result<Attribute>> {
        if self.exhausted {
            return None;
        }

        match self.read_attribute() {
            Ok(None) => {
                self.exhausted = true;
                None
            }
            Ok(Some(attribute)) => Some(self.validate(attribute)),
            Err(e) => {
                if e.breaks_framing() {
                    self.exhausted = true;
                }
                Some(Err(e))
            }
        }
    }

    fn read_attribute(&mut self) -> Result<Option<Attribute>> {
        let offset = self.stream.offset();
        let level = match self.stream.try_u8_or_eof("attribute level")? {
            Some(level) => level,
            None => return Ok(None),
        };
        let tag = self.stream.try_u32_named("attribute tag")?;
        let length = self.stream.try_u32_named("attribute length")?;
        let mut payload = Vec::new();
        if let Err(e) = self
            .stream
            .try_blob_into(length, &mut payload, "attribute payload")
        {
            self.keep_truncated(offset, level, tag, payload);
            return Err(e);
        }
        let checksum = match self.stream.try_u16_named("attribute checksum") {
            Ok(checksum) => checksum,
            Err(e) => {
                self.keep_truncated(offset, level, tag, payload);
                return Err(e);
            }
        };

        trace!(
            "Offset `0x{:08x}`: attribute {} (level 0x{:02X}, {} bytes)",
            offset,
            AttributeTag(tag),
            level,
            length
        );

        // The frame is fully consumed at this point, so a bad level does not desynchronize us.
        let level = AttributeLevel::from_u8(level).ok_or(TnefError::MalformedAttribute {
            offset,
            level,
            tag,
            message: "unknown attribute level",
        })?;

        Ok(Some(Attribute {
            level,
            tag: AttributeTag(tag),
            payload,
            checksum,
            offset,
        }))
    }

    fn keep_truncated(&mut self, offset: u64, level: u8, tag: u32, payload: Vec<u8>) {
        let Some(level) = AttributeLevel::from_u8(level) else {
            return;
        };
        debug!(
            "Offset `0x{:08x}`: attribute {} cut short after {} bytes",
            offset,
            AttributeTag(tag),
            payload.len()
        );

        self.truncated = Some(Attribute {
            level,
            tag: AttributeTag(tag),
            checksum: Checksum::of(&payload).value(),
            payload,
            offset,
        });
    }

    fn validate(&mut self, attribute: Attribute) -> Result<Attribute> {
        if !attribute.has_valid_checksum() {
            let err = TnefError::ChecksumMismatch {
                offset: attribute.offset,
                tag: attribute.tag.0,
                declared: attribute.checksum,
                computed: attribute.computed_checksum(),
            };
            if self.settings.is_strict() {
                return Err(err);
            }
            debug!("{}, ignoring", err);
        }

        if let Some(code_page) = attribute.oem_code_page() {
            match encoding_from_windows_code_page(code_page as usize) {
                Some(codec) => {
                    debug!("Stream declares code page {} ({})", code_page, codec.name());
                    self.ansi_codec = codec;
                }
                None => warn!(
                    "Stream declares unsupported code page {}, keeping {}",
                    code_page,
                    self.ansi_codec.name()
                ),
            }
        }

        Ok(attribute)
    }

    /// Lazily reads the properties carried by a `MapiProperties` attribute.
    pub fn property_reader<'a>(&self, attribute: &'a Attribute) -> Result<PropertyReader<'a>> {
        if !attribute.is_mapi_properties() {
            return Err(TnefError::MalformedAttribute {
                offset: attribute.offset,
                level: attribute.level.to_u8(),
                tag: attribute.tag.0,
                message: "attribute does not carry MAPI properties",
            });
        }

        PropertyReader::new(attribute, self.ansi_codec)
    }
}

impl<R: Read> Iterator for TnefDecoder<R> {
    type Item = Result<Attribute>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_attribute()
    }
}
