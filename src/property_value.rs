//! Property values, kept as opaque wire bytes at the codec layer.
//!
//! A [`PropertyValue`] holds the exact bytes that follow a property tag in a `MapiProperties`
//! attribute (counts, length prefixes and padding included), so that it can be written back
//! verbatim. Interpreting those bytes is deferred to [`PropertyValue::decode`], which is only
//! needed for reporting.

use std::borrow::Cow;
use std::fmt;

use encoding::all::UTF_16LE;
use encoding::{DecoderTrap, EncoderTrap, Encoding, EncodingRef};
use jiff::Timestamp;
use winstructs::guid::Guid;

use crate::err::{Result, TnefError};
use crate::property_tag::PropertyType;
use crate::utils::{ByteCursor, padding_for};

/// 100ns intervals between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_EPOCH: i128 = 116_444_736_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue<'a> {
    prop_type: PropertyType,
    bytes: Cow<'a, [u8]>,
}

impl<'a> PropertyValue<'a> {
    /// Wraps already encoded wire bytes.
    pub fn from_wire(prop_type: PropertyType, bytes: impl Into<Cow<'a, [u8]>>) -> Self {
        PropertyValue {
            prop_type,
            bytes: bytes.into(),
        }
    }

    pub fn prop_type(&self) -> PropertyType {
        self.prop_type
    }

    /// The wire encoding of this value.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_owned(self) -> PropertyValue<'static> {
        PropertyValue {
            prop_type: self.prop_type,
            bytes: Cow::Owned(self.bytes.into_owned()),
        }
    }

    /// Consumes one value of type `prop_type` from `cursor`.
    pub(crate) fn read(cursor: &mut ByteCursor<'a>, prop_type: PropertyType) -> Result<Self> {
        let start = cursor.pos();

        if prop_type.is_multi_valued() {
            let count = cursor.u32_named("multi-valued property count")?;
            for _ in 0..count {
                read_single(cursor, prop_type.base())?;
            }
        } else if prop_type.fixed_size().is_some() {
            read_single(cursor, prop_type)?;
        } else {
            if !prop_type.is_known() {
                log::debug!(
                    "Offset `0x{:08x}`: framing value of unknown type {} as length prefixed",
                    cursor.position(),
                    prop_type
                );
            }
            let count = cursor.u32_named("property value count")?;
            for _ in 0..count {
                cursor.len_prefixed_padded("property value")?;
            }
        }

        Ok(PropertyValue {
            prop_type,
            bytes: Cow::Borrowed(cursor.consumed_since(start)),
        })
    }

    /// Interprets the wire bytes. `ansi_codec` is used for `String8` values.
    pub fn decode(&self, ansi_codec: EncodingRef) -> Result<Value> {
        let prop_type = self.prop_type;
        if !prop_type.is_known() {
            return Err(TnefError::UnsupportedPropertyType {
                prop_type: prop_type.0,
            });
        }

        let mut cursor = ByteCursor::new(&self.bytes, 0);
        let base = prop_type.base();

        if prop_type.is_multi_valued() {
            let count = cursor.u32_named("multi-valued property count")?;
            let mut values = Vec::new();
            for _ in 0..count {
                let raw = read_single(&mut cursor, base)?;
                values.push(decode_single(raw, base, ansi_codec)?);
            }
            return Ok(Value::MultiValued(values));
        }

        if prop_type.fixed_size().is_some() {
            let raw = read_single(&mut cursor, base)?;
            return decode_single(raw, base, ansi_codec);
        }

        let count = cursor.u32_named("property value count")?;
        let mut values = Vec::new();
        for _ in 0..count {
            let raw = cursor.len_prefixed_padded("property value")?;
            values.push(decode_single(raw, base, ansi_codec)?);
        }

        match values.len() {
            0 => Ok(Value::Null),
            1 => Ok(values.remove(0)),
            _ => Ok(Value::MultiValued(values)),
        }
    }
}

impl PropertyValue<'static> {
    /// A `Unicode` string value, NUL terminated as MAPI expects.
    pub fn unicode(value: &str) -> Self {
        let mut raw: Vec<u8> = value.encode_utf16().flat_map(u16::to_le_bytes).collect();
        raw.extend_from_slice(&[0, 0]);
        PropertyValue::variable(PropertyType::UNICODE, &raw)
    }

    /// A `String8` value in the given code page. Unmappable characters are replaced.
    pub fn string8(value: &str, ansi_codec: EncodingRef) -> Self {
        let mut raw = ansi_codec
            .encode(value, EncoderTrap::Replace)
            .unwrap_or_default();
        raw.push(0);
        PropertyValue::variable(PropertyType::STRING8, &raw)
    }

    pub fn binary(value: &[u8]) -> Self {
        PropertyValue::variable(PropertyType::BINARY, value)
    }

    pub fn long(value: i32) -> Self {
        PropertyValue::from_wire(PropertyType::LONG, value.to_le_bytes().to_vec())
    }

    pub fn boolean(value: bool) -> Self {
        let mut raw = u16::from(value).to_le_bytes().to_vec();
        raw.resize(4, 0);
        PropertyValue::from_wire(PropertyType::BOOLEAN, raw)
    }

    fn variable(prop_type: PropertyType, raw: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(raw.len() + 12);
        bytes.extend_from_slice(&1_u32.to_le_bytes());
        bytes.extend_from_slice(&(raw.len() as u32).to_le_bytes());
        bytes.extend_from_slice(raw);
        bytes.resize(bytes.len() + padding_for(raw.len()), 0);
        PropertyValue::from_wire(prop_type, bytes)
    }
}

/// Consumes a single element of a (possibly multi-valued) property, returning its bytes
/// without padding.
fn read_single<'a>(cursor: &mut ByteCursor<'a>, base: PropertyType) -> Result<&'a [u8]> {
    match base.fixed_size() {
        Some(size) => {
            let raw = cursor.take_bytes(size, "fixed size property value")?;
            cursor.skip_padding(size, "property value padding")?;
            Ok(raw)
        }
        None => cursor.len_prefixed_padded("property value"),
    }
}

fn decode_single(raw: &[u8], base: PropertyType, ansi_codec: EncodingRef) -> Result<Value> {
    let mut cursor = ByteCursor::new(raw, 0);
    let value = match base {
        PropertyType::NULL => Value::Null,
        PropertyType::I2 => Value::I2(cursor.u16_named("i2 value")? as i16),
        PropertyType::BOOLEAN => Value::Boolean(cursor.u16_named("boolean value")? != 0),
        PropertyType::LONG => Value::Long(cursor.u32_named("long value")? as i32),
        PropertyType::R4 => Value::R4(f32::from_bits(cursor.u32_named("r4 value")?)),
        PropertyType::ERROR => Value::Error(cursor.u32_named("error value")?),
        PropertyType::DOUBLE => Value::Double(f64::from_bits(cursor.u64_named("double value")?)),
        PropertyType::APP_TIME => {
            Value::AppTime(f64::from_bits(cursor.u64_named("apptime value")?))
        }
        PropertyType::CURRENCY => Value::Currency(cursor.u64_named("currency value")? as i64),
        PropertyType::I8 => Value::I8(cursor.u64_named("i8 value")? as i64),
        PropertyType::SYS_TIME => {
            Value::SysTime(filetime_to_timestamp(cursor.u64_named("systime value")?)?)
        }
        PropertyType::CLASS_ID => Value::ClassId(cursor.array::<16>("class id value")?),
        PropertyType::STRING8 => {
            let s = ansi_codec
                .decode(raw, DecoderTrap::Replace)
                .map_err(|e| TnefError::value_decode("string8 value", e))?;
            Value::String(s.trim_end_matches('\0').to_owned())
        }
        PropertyType::UNICODE => {
            if raw.len() % 2 != 0 {
                return Err(TnefError::value_decode(
                    "unicode value",
                    format!("odd byte length {}", raw.len()),
                ));
            }
            let s = UTF_16LE
                .decode(raw, DecoderTrap::Strict)
                .map_err(|e| TnefError::value_decode("unicode value", e))?;
            Value::String(s.trim_end_matches('\0').to_owned())
        }
        PropertyType::BINARY => Value::Binary(raw.to_vec()),
        PropertyType::OBJECT => Value::Object(raw.to_vec()),
        other => {
            return Err(TnefError::UnsupportedPropertyType {
                prop_type: other.0,
            });
        }
    };

    Ok(value)
}

fn filetime_to_timestamp(filetime: u64) -> Result<Timestamp> {
    let nanos = (i128::from(filetime) - FILETIME_UNIX_EPOCH) * 100;
    Timestamp::from_nanosecond(nanos).map_err(|e| TnefError::value_decode("systime value", e))
}

/// A decoded property value, used for reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    I2(i16),
    Long(i32),
    R4(f32),
    Double(f64),
    Currency(i64),
    AppTime(f64),
    Error(u32),
    Boolean(bool),
    I8(i64),
    SysTime(Timestamp),
    ClassId([u8; 16]),
    String(String),
    Binary(Vec<u8>),
    Object(Vec<u8>),
    MultiValued(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::I2(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::R4(v) => write!(f, "{}", v),
            Value::Double(v) | Value::AppTime(v) => write!(f, "{}", v),
            // Fixed point, scaled by 10000.
            Value::Currency(v) => {
                let sign = if *v < 0 { "-" } else { "" };
                let abs = v.unsigned_abs();
                write!(f, "{}{}.{:04}", sign, abs / 10_000, abs % 10_000)
            }
            Value::Error(v) => write!(f, "0x{:08X}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::SysTime(v) => write!(f, "{}", v),
            Value::ClassId(raw) => match Guid::from_buffer(raw) {
                Ok(guid) => write!(f, "{{{}}}", guid),
                Err(_) => write_hex(f, raw),
            },
            Value::String(s) => write!(f, "{}", s),
            Value::Binary(raw) | Value::Object(raw) => write_hex(f, raw),
            Value::MultiValued(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, raw: &[u8]) -> fmt::Result {
    for b in raw {
        write!(f, "{:02X}", b)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn read_all(bytes: &[u8], prop_type: PropertyType) -> Result<(PropertyValue<'_>, usize)> {
        let mut cursor = ByteCursor::new(bytes, 0);
        let value = PropertyValue::read(&mut cursor, prop_type)?;
        Ok((value, cursor.pos()))
    }

    #[test]
    fn test_unicode_wire_layout() {
        let value = PropertyValue::unicode("IPM");
        assert_eq!(
            value.bytes(),
            &[
                1, 0, 0, 0, // count
                8, 0, 0, 0, // length
                b'I', 0, b'P', 0, b'M', 0, 0, 0,
            ]
        );
        assert_eq!(
            value.decode(encoding::all::WINDOWS_1252).unwrap(),
            Value::String("IPM".to_owned())
        );
    }

    #[test]
    fn test_read_consumes_padding() {
        let value = PropertyValue::unicode("IPM.Note");
        let mut bytes = value.bytes().to_vec();
        bytes.extend_from_slice(&[0xEE; 4]);

        let (read, consumed) = read_all(&bytes, PropertyType::UNICODE).unwrap();
        // "IPM.Note\0" is 18 bytes, padded to 20.
        assert_eq!(consumed, 4 + 4 + 20);
        assert_eq!(read, value);
    }

    #[test]
    fn test_fixed_values() {
        let (value, consumed) = read_all(&[0x2A, 0x00, 0xFF, 0xFF], PropertyType::I2).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(
            value.decode(encoding::all::WINDOWS_1252).unwrap(),
            Value::I2(42)
        );

        let boolean = PropertyValue::boolean(true);
        assert_eq!(boolean.bytes().len(), 4);
        assert_eq!(
            boolean.decode(encoding::all::WINDOWS_1252).unwrap(),
            Value::Boolean(true)
        );

        let long = PropertyValue::long(-7);
        assert_eq!(long.decode(encoding::all::WINDOWS_1252).unwrap().to_string(), "-7");
    }

    #[test]
    fn test_string8_uses_code_page() {
        let value = PropertyValue::string8("Привет", encoding::all::WINDOWS_1251);
        assert_eq!(
            value.decode(encoding::all::WINDOWS_1251).unwrap(),
            Value::String("Привет".to_owned())
        );
        // The same bytes read as Windows-1252 are not Cyrillic.
        assert_ne!(
            value.decode(encoding::all::WINDOWS_1252).unwrap(),
            Value::String("Привет".to_owned())
        );
    }

    #[test]
    fn test_systime_renders_as_timestamp() {
        // 2020-01-01T00:00:00Z
        let filetime: u64 = 132_223_104_000_000_000;
        let value = PropertyValue::from_wire(PropertyType::SYS_TIME, filetime.to_le_bytes().to_vec());
        assert_eq!(
            value.decode(encoding::all::WINDOWS_1252).unwrap().to_string(),
            "2020-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_multi_valued_long() {
        let mut bytes = vec![2, 0, 0, 0];
        bytes.extend_from_slice(&1_i32.to_le_bytes());
        bytes.extend_from_slice(&2_i32.to_le_bytes());

        let (value, consumed) = read_all(&bytes, PropertyType::LONG.multi_valued()).unwrap();
        assert_eq!(consumed, 12);
        assert_eq!(
            value.decode(encoding::all::WINDOWS_1252).unwrap().to_string(),
            "[1, 2]"
        );
    }

    #[test]
    fn test_unknown_type_is_opaque() {
        let bytes = [1, 0, 0, 0, 3, 0, 0, 0, 0xAA, 0xBB, 0xCC, 0x00];
        let (value, consumed) = read_all(&bytes, PropertyType(0x0999)).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(value.bytes(), &bytes[..]);
        assert!(matches!(
            value.decode(encoding::all::WINDOWS_1252),
            Err(TnefError::UnsupportedPropertyType { prop_type: 0x0999 })
        ));
    }

    #[test]
    fn test_invalid_unicode_fails_to_decode() {
        // A lone high surrogate.
        let value = PropertyValue::variable(PropertyType::UNICODE, &[0x00, 0xD8, 0x41, 0x00]);
        assert!(matches!(
            value.decode(encoding::all::WINDOWS_1252),
            Err(TnefError::ValueDecodeFailed { .. })
        ));
    }

    #[test]
    fn test_truncated_value() {
        let bytes = [1, 0, 0, 0, 40, 0, 0, 0, b'x'];
        assert!(matches!(
            read_all(&bytes, PropertyType::BINARY),
            Err(TnefError::TruncatedStream { .. })
        ));
    }

    #[test]
    fn test_currency_display() {
        assert_eq!(Value::Currency(123_4500).to_string(), "123.4500");
        assert_eq!(Value::Currency(-5000).to_string(), "-0.5000");
    }
}
