use std::fmt;

use crate::attribute_stream::Checksum;

/// Scope of an attribute inside the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeLevel {
    Message,
    Attachment,
}

impl AttributeLevel {
    pub fn from_u8(level: u8) -> Option<Self> {
        match level {
            0x01 => Some(AttributeLevel::Message),
            0x02 => Some(AttributeLevel::Attachment),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            AttributeLevel::Message => 0x01,
            AttributeLevel::Attachment => 0x02,
        }
    }
}

/// A TNEF attribute tag, the low word is the attribute id and the high word its data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeTag(pub u32);

macro_rules! attribute_tags {
    ($($name:ident = $value:literal),+ $(,)?) => {
        #[allow(non_upper_case_globals)]
        impl AttributeTag {
            $(pub const $name: AttributeTag = AttributeTag($value);)+

            /// Well-known name of this tag, if any.
            pub fn name(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some(stringify!($name)),)+
                    _ => None,
                }
            }
        }
    };
}

attribute_tags! {
    Owner = 0x0006_0000,
    SentFor = 0x0006_0001,
    Delegate = 0x0006_0002,
    DateStart = 0x0003_0006,
    DateEnd = 0x0003_0007,
    AidOwner = 0x0005_0008,
    RequestResponse = 0x0004_0009,
    From = 0x0000_8000,
    Subject = 0x0001_8004,
    DateSent = 0x0003_8005,
    DateReceived = 0x0003_8006,
    MessageStatus = 0x0006_8007,
    MessageClass = 0x0007_8008,
    MessageId = 0x0001_8009,
    ParentId = 0x0001_800A,
    ConversationId = 0x0001_800B,
    Body = 0x0002_800C,
    Priority = 0x0004_800D,
    AttachData = 0x0006_800F,
    AttachTitle = 0x0001_8010,
    AttachMetaFile = 0x0006_8011,
    AttachCreateDate = 0x0003_8012,
    AttachModifyDate = 0x0003_8013,
    DateModified = 0x0003_8020,
    AttachTransportFilename = 0x0006_9001,
    AttachRenderData = 0x0006_9002,
    MapiProperties = 0x0006_9003,
    RecipientTable = 0x0004_9004,
    Attachment = 0x0006_9005,
    TnefVersion = 0x0008_9006,
    OemCodepage = 0x0006_9007,
    OriginalMessageClass = 0x0007_0600,
}

impl AttributeTag {
    pub fn id(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub fn data_type(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

impl fmt::Display for AttributeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

/// A single framed unit of a TNEF stream.
///
/// The payload is kept exactly as read, together with the checksum the producer declared for
/// it, so that attributes can be re-emitted byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub level: AttributeLevel,
    pub tag: AttributeTag,
    pub payload: Vec<u8>,
    pub checksum: u16,
    /// Offset of the level byte in the source stream.
    pub offset: u64,
}

impl Attribute {
    pub fn is_mapi_properties(&self) -> bool {
        self.tag == AttributeTag::MapiProperties
    }

    pub fn computed_checksum(&self) -> u16 {
        Checksum::of(&self.payload).value()
    }

    pub fn has_valid_checksum(&self) -> bool {
        self.checksum == self.computed_checksum()
    }

    /// Primary code page declared by an `OemCodepage` attribute.
    pub fn oem_code_page(&self) -> Option<u32> {
        if self.tag != AttributeTag::OemCodepage {
            return None;
        }

        let bytes: [u8; 4] = self.payload.get(0..4)?.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_display_uses_well_known_names() {
        assert_eq!(AttributeTag::MapiProperties.to_string(), "MapiProperties");
        assert_eq!(AttributeTag(0x0001_0042).to_string(), "0x00010042");
        assert_eq!(AttributeTag::MapiProperties.id(), 0x9003);
        assert_eq!(AttributeTag::MapiProperties.data_type(), 0x0006);
    }

    #[test]
    fn test_levels() {
        assert_eq!(AttributeLevel::from_u8(1), Some(AttributeLevel::Message));
        assert_eq!(AttributeLevel::from_u8(2), Some(AttributeLevel::Attachment));
        assert_eq!(AttributeLevel::from_u8(3), None);
        assert_eq!(AttributeLevel::Attachment.to_u8(), 2);
    }

    #[test]
    fn test_oem_code_page() {
        let attribute = Attribute {
            level: AttributeLevel::Message,
            tag: AttributeTag::OemCodepage,
            payload: vec![0xE3, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
            checksum: 0x00E7,
            offset: 6,
        };

        assert_eq!(attribute.oem_code_page(), Some(1251));
        assert!(attribute.has_valid_checksum());
    }
}
