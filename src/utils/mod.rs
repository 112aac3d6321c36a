mod byte_cursor;
mod hexdump;

pub(crate) use self::byte_cursor::{ByteCursor, padding_for};
pub use self::hexdump::hexdump;
