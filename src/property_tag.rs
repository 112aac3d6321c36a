use std::fmt;

use encoding::all::UTF_16LE;
use encoding::{DecoderTrap, EncoderTrap, Encoding};
use winstructs::guid::Guid;

use crate::err::Result;
use crate::property_id::property_id_name;
use crate::utils::{ByteCursor, padding_for};

/// MAPI property type code, the low word of a property tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyType(pub u16);

impl PropertyType {
    pub const UNSPECIFIED: PropertyType = PropertyType(0x0000);
    pub const NULL: PropertyType = PropertyType(0x0001);
    pub const I2: PropertyType = PropertyType(0x0002);
    pub const LONG: PropertyType = PropertyType(0x0003);
    pub const R4: PropertyType = PropertyType(0x0004);
    pub const DOUBLE: PropertyType = PropertyType(0x0005);
    pub const CURRENCY: PropertyType = PropertyType(0x0006);
    pub const APP_TIME: PropertyType = PropertyType(0x0007);
    pub const ERROR: PropertyType = PropertyType(0x000A);
    pub const BOOLEAN: PropertyType = PropertyType(0x000B);
    pub const OBJECT: PropertyType = PropertyType(0x000D);
    pub const I8: PropertyType = PropertyType(0x0014);
    pub const STRING8: PropertyType = PropertyType(0x001E);
    pub const UNICODE: PropertyType = PropertyType(0x001F);
    pub const SYS_TIME: PropertyType = PropertyType(0x0040);
    pub const CLASS_ID: PropertyType = PropertyType(0x0048);
    pub const BINARY: PropertyType = PropertyType(0x0102);

    pub const MULTI_VALUED_FLAG: u16 = 0x1000;

    pub fn is_multi_valued(self) -> bool {
        self.0 & Self::MULTI_VALUED_FLAG != 0
    }

    /// The single-valued type of a multi-valued type.
    pub fn base(self) -> PropertyType {
        PropertyType(self.0 & !Self::MULTI_VALUED_FLAG)
    }

    pub fn multi_valued(self) -> PropertyType {
        PropertyType(self.0 | Self::MULTI_VALUED_FLAG)
    }

    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            PropertyType::UNSPECIFIED => "Unspecified",
            PropertyType::NULL => "Null",
            PropertyType::I2 => "I2",
            PropertyType::LONG => "Long",
            PropertyType::R4 => "R4",
            PropertyType::DOUBLE => "Double",
            PropertyType::CURRENCY => "Currency",
            PropertyType::APP_TIME => "AppTime",
            PropertyType::ERROR => "Error",
            PropertyType::BOOLEAN => "Boolean",
            PropertyType::OBJECT => "Object",
            PropertyType::I8 => "I8",
            PropertyType::STRING8 => "String8",
            PropertyType::UNICODE => "Unicode",
            PropertyType::SYS_TIME => "SysTime",
            PropertyType::CLASS_ID => "ClassId",
            PropertyType::BINARY => "Binary",
            _ => return None,
        };
        Some(name)
    }

    /// Whether values of this (base) type have a meaning we can decode.
    pub fn is_known(self) -> bool {
        self.base() != PropertyType::UNSPECIFIED && self.base().name().is_some()
    }

    /// Byte size of a single fixed-width value, before padding.
    pub(crate) fn fixed_size(self) -> Option<usize> {
        match self.base() {
            PropertyType::I2 | PropertyType::BOOLEAN => Some(2),
            PropertyType::NULL | PropertyType::LONG | PropertyType::R4 | PropertyType::ERROR => {
                Some(4)
            }
            PropertyType::DOUBLE
            | PropertyType::CURRENCY
            | PropertyType::APP_TIME
            | PropertyType::I8
            | PropertyType::SYS_TIME => Some(8),
            PropertyType::CLASS_ID => Some(16),
            // Strings, binaries, objects and anything we do not recognize are length prefixed.
            _ => None,
        }
    }
}

impl fmt::Debug for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyType({})", self)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_multi_valued(), self.base().name()) {
            (false, Some(name)) => write!(f, "{}", name),
            (true, Some(name)) => write!(f, "MultiValued {}", name),
            (_, None) => write!(f, "0x{:04X}", self.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamedPropertyKind {
    Id(u32),
    Name(String),
}

/// Identifier of a named property: a property set GUID plus a numeric id or a string name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedPropertyId {
    pub guid: [u8; 16],
    pub kind: NamedPropertyKind,
}

impl NamedPropertyId {
    pub fn guid(&self) -> Option<Guid> {
        Guid::from_buffer(&self.guid).ok()
    }

    pub(crate) fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let guid = cursor.array::<16>("named property guid")?;
        let kind = match cursor.u32_named("named property kind")? {
            0 => NamedPropertyKind::Id(cursor.u32_named("named property id")?),
            _ => {
                let raw = cursor.len_prefixed_padded("named property name")?;
                let name = UTF_16LE
                    .decode(raw, DecoderTrap::Replace)
                    .unwrap_or_default()
                    .trim_end_matches('\0')
                    .to_owned();
                NamedPropertyKind::Name(name)
            }
        };

        Ok(NamedPropertyId { guid, kind })
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.guid);
        match &self.kind {
            NamedPropertyKind::Id(id) => {
                out.extend_from_slice(&0_u32.to_le_bytes());
                out.extend_from_slice(&id.to_le_bytes());
            }
            NamedPropertyKind::Name(name) => {
                let mut raw = UTF_16LE
                    .encode(name, EncoderTrap::Replace)
                    .unwrap_or_default();
                raw.extend_from_slice(&[0, 0]);

                out.extend_from_slice(&1_u32.to_le_bytes());
                out.extend_from_slice(&(raw.len() as u32).to_le_bytes());
                out.extend_from_slice(&raw);
                out.resize(out.len() + padding_for(raw.len()), 0);
            }
        }
    }
}

impl fmt::Display for NamedPropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.guid() {
            Some(guid) => write!(f, "{{{}}}", guid)?,
            None => {
                for b in &self.guid {
                    write!(f, "{:02X}", b)?;
                }
            }
        }

        match &self.kind {
            NamedPropertyKind::Id(id) => write!(f, ":0x{:X}", id),
            NamedPropertyKind::Name(name) => write!(f, ":{}", name),
        }
    }
}

/// A property tag as found in a `MapiProperties` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyTag {
    Numbered {
        id: u16,
        prop_type: PropertyType,
    },
    Named {
        id: u16,
        prop_type: PropertyType,
        name_id: NamedPropertyId,
    },
}

impl PropertyTag {
    /// Ids at or above this value refer to named properties.
    pub const FIRST_NAMED_ID: u16 = 0x8000;

    pub fn numbered(id: u16, prop_type: PropertyType) -> Self {
        PropertyTag::Numbered { id, prop_type }
    }

    pub fn id(&self) -> u16 {
        match self {
            PropertyTag::Numbered { id, .. } | PropertyTag::Named { id, .. } => *id,
        }
    }

    pub fn prop_type(&self) -> PropertyType {
        match self {
            PropertyTag::Numbered { prop_type, .. } | PropertyTag::Named { prop_type, .. } => {
                *prop_type
            }
        }
    }

    pub fn raw(&self) -> u32 {
        (u32::from(self.id()) << 16) | u32::from(self.prop_type().0)
    }

    pub fn is_named(&self) -> bool {
        matches!(self, PropertyTag::Named { .. })
    }

    pub fn name_id(&self) -> Option<&NamedPropertyId> {
        match self {
            PropertyTag::Named { name_id, .. } => Some(name_id),
            PropertyTag::Numbered { .. } => None,
        }
    }

    /// The same property, declared with another value type.
    pub fn with_type(&self, prop_type: PropertyType) -> Self {
        match self {
            PropertyTag::Numbered { id, .. } => PropertyTag::Numbered { id: *id, prop_type },
            PropertyTag::Named { id, name_id, .. } => PropertyTag::Named {
                id: *id,
                prop_type,
                name_id: name_id.clone(),
            },
        }
    }

    pub(crate) fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let raw = cursor.u32_named("property tag")?;
        let id = (raw >> 16) as u16;
        let prop_type = PropertyType((raw & 0xFFFF) as u16);

        if id >= Self::FIRST_NAMED_ID {
            let name_id = NamedPropertyId::read(cursor)?;
            Ok(PropertyTag::Named {
                id,
                prop_type,
                name_id,
            })
        } else {
            Ok(PropertyTag::Numbered { id, prop_type })
        }
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.raw().to_le_bytes());
        if let PropertyTag::Named { name_id, .. } = self {
            name_id.encode(out);
        }
    }
}

impl fmt::Display for PropertyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match property_id_name(self.id()) {
            Some(name) if !self.is_named() => write!(f, "{}", name)?,
            _ => write!(f, "0x{:04X}", self.id())?,
        }
        write!(f, " ({})", self.prop_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property_id::ids;

    #[test]
    fn test_textual_form() {
        assert_eq!(
            PropertyTag::numbered(ids::MessageClass, PropertyType::UNICODE).to_string(),
            "MessageClass (Unicode)"
        );
        assert_eq!(
            PropertyTag::numbered(ids::MessageClass, PropertyType::STRING8).to_string(),
            "MessageClass (String8)"
        );
        assert_eq!(
            PropertyTag::numbered(ids::Languages, PropertyType::STRING8.multi_valued()).to_string(),
            "Languages (MultiValued String8)"
        );
        assert_eq!(
            PropertyTag::numbered(0x6001, PropertyType(0x0999)).to_string(),
            "0x6001 (0x0999)"
        );
    }

    #[test]
    fn test_multi_valued_types() {
        let mv = PropertyType::LONG.multi_valued();
        assert_eq!(mv, PropertyType(0x1003));
        assert!(mv.is_multi_valued());
        assert_eq!(mv.base(), PropertyType::LONG);
        assert_eq!(mv.fixed_size(), Some(4));
        assert_eq!(PropertyType::UNICODE.fixed_size(), None);
        assert!(!PropertyType(0x0999).is_known());
    }

    #[test]
    fn test_numbered_tag_round_trips_through_bytes() {
        let tag = PropertyTag::numbered(ids::Subject, PropertyType::STRING8);
        let mut out = Vec::new();
        tag.encode(&mut out);
        assert_eq!(out, vec![0x1E, 0x00, 0x37, 0x00]);

        let mut cursor = ByteCursor::new(&out, 0);
        assert_eq!(PropertyTag::read(&mut cursor).unwrap(), tag);
    }

    #[test]
    fn test_named_tag_with_string_name() {
        let tag = PropertyTag::Named {
            id: 0x8005,
            prop_type: PropertyType::UNICODE,
            name_id: NamedPropertyId {
                guid: [0x11; 16],
                kind: NamedPropertyKind::Name("Keywords".to_owned()),
            },
        };

        let mut out = Vec::new();
        tag.encode(&mut out);
        // tag + guid + kind + length + "Keywords\0" in UTF-16 (18 bytes) + 2 bytes padding
        assert_eq!(out.len(), 4 + 16 + 4 + 4 + 18 + 2);

        let mut cursor = ByteCursor::new(&out, 0);
        let decoded = PropertyTag::read(&mut cursor).unwrap();
        assert_eq!(decoded, tag);
        assert!(decoded.is_named());
        assert_eq!(cursor.remaining().len(), 0);
        assert!(decoded.name_id().unwrap().to_string().ends_with(":Keywords"));
    }
}
