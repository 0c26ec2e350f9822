//! Typed sfnt tables.
//!
//! Each table parses from its raw bytes with a [`ByteBuffer`] and, where the
//! subsetter rebuilds it, writes itself back in the same layout.

use crate::byte_buffer::ByteBuffer;
use crate::error::{Error, Result};
use crate::fonts::Tag;

pub mod cmap;
pub mod head;
pub mod hhea;
pub mod hmtx;
pub mod loca;
pub mod maxp;
pub mod name;
pub mod os2;
pub mod post;
pub mod vorg;

pub use cmap::{CmapSubtable, CmapTable};
pub use head::HeadTable;
pub use hhea::HheaTable;
pub use hmtx::HmtxTable;
pub use loca::LocaTable;
pub use maxp::MaxpTable;
pub use name::{NameRecord, NameTable};
pub use os2::Os2Table;
pub use post::PostTable;
pub use vorg::VorgTable;

/// Run a table reader over `data`, reporting a short table as a font error.
pub(crate) fn read_table<T>(
    tag: Tag,
    data: &[u8],
    read: impl FnOnce(&mut ByteBuffer) -> Result<T>,
) -> Result<T> {
    let mut buf = ByteBuffer::from(data);
    read(&mut buf).map_err(|e| match e {
        Error::UnexpectedEof => Error::Font(format!("{} table is truncated", tag)),
        other => other,
    })
}
