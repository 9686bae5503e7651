//! Data-message wire format — the binary envelope that carries object chunks.
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! magic      : u32
//! version    : u32
//! fieldCount : u32
//! fieldCount times:
//!     fieldType   : u32
//!     fieldLength : u32
//!     fieldValue  : fieldLength bytes
//! ```
//!
//! Field types the decoder understands are listed below. Unknown field types
//! are skipped using their declared length — never re-scanned — so newer
//! senders can add fields without breaking older receivers.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Sentinel marking a tether data message.
pub const MAGIC: u32 = 0x5445_5448;

/// Current wire format version.
pub const VERSION: u32 = 1;

/// Number of fields every encoder writes.
const FIELD_COUNT: u32 = 6;

const FIELD_ORG_ID: u32 = 0;
const FIELD_OBJECT_TYPE: u32 = 1;
const FIELD_OBJECT_ID: u32 = 2;
const FIELD_OFFSET: u32 = 3;
const FIELD_DATA: u32 = 4;
const FIELD_INSTANCE_ID: u32 = 5;

/// A decoded data message. `data` is a zero-copy slice of the input buffer,
/// bounded to exactly the declared payload length.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMessage {
    pub org_id: String,
    pub object_type: String,
    pub object_id: String,
    pub offset: i64,
    pub instance_id: i64,
    pub data: Bytes,
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting a data message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("bad magic: 0x{0:08x}")]
    InvalidMagic(u32),

    #[error("unsupported wire version {0} (expected {VERSION})")]
    WrongVersion(u32),

    #[error("{field} field declared {len} bytes, expected 8")]
    InvalidFieldLength { field: &'static str, len: u32 },

    #[error("message truncated while reading {0}")]
    ShortRead(&'static str),

    #[error("data message missing {0} field")]
    MissingField(&'static str),
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encode a data message carrying `data` at `offset` of the named object.
///
/// Fields are written in the interop order orgID, objectType, objectID,
/// offset, instanceID, data. A zero-length `data` is legal and produces a
/// header-only chunk.
pub fn encode_data_message(
    org_id: &str,
    object_type: &str,
    object_id: &str,
    offset: i64,
    instance_id: i64,
    data: &[u8],
) -> Bytes {
    let mut buf = BytesMut::with_capacity(
        12 + 6 * 8 + org_id.len() + object_type.len() + object_id.len() + 16 + data.len(),
    );

    buf.put_u32(MAGIC);
    buf.put_u32(VERSION);
    buf.put_u32(FIELD_COUNT);

    put_string_field(&mut buf, FIELD_ORG_ID, org_id);
    put_string_field(&mut buf, FIELD_OBJECT_TYPE, object_type);
    put_string_field(&mut buf, FIELD_OBJECT_ID, object_id);
    put_i64_field(&mut buf, FIELD_OFFSET, offset);
    put_i64_field(&mut buf, FIELD_INSTANCE_ID, instance_id);

    buf.put_u32(FIELD_DATA);
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);

    buf.freeze()
}

fn put_string_field(buf: &mut BytesMut, field_type: u32, value: &str) {
    buf.put_u32(field_type);
    buf.put_u32(value.len() as u32);
    buf.put_slice(value.as_bytes());
}

fn put_i64_field(buf: &mut BytesMut, field_type: u32, value: i64) {
    buf.put_u32(field_type);
    buf.put_u32(8);
    buf.put_i64(value);
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decode a data message.
///
/// Accepts fields in any order. The organization field may be absent
/// (defaults to empty); objectType, objectID, and the data section are
/// required. Offset and instance id must be declared as exactly 8 bytes.
pub fn decode_data_message(mut buf: Bytes) -> Result<DataMessage, WireError> {
    if buf.remaining() < 12 {
        return Err(WireError::ShortRead("header"));
    }

    let magic = buf.get_u32();
    if magic != MAGIC {
        return Err(WireError::InvalidMagic(magic));
    }
    let version = buf.get_u32();
    if version != VERSION {
        return Err(WireError::WrongVersion(version));
    }
    let field_count = buf.get_u32();

    let mut org_id = String::new();
    let mut object_type = None;
    let mut object_id = None;
    let mut offset = 0i64;
    let mut instance_id = 0i64;
    let mut data = None;

    for _ in 0..field_count {
        if buf.remaining() < 8 {
            return Err(WireError::ShortRead("field header"));
        }
        let field_type = buf.get_u32();
        let field_len = buf.get_u32();

        match field_type {
            FIELD_ORG_ID => org_id = get_string(&mut buf, field_len, "orgID")?,
            FIELD_OBJECT_TYPE => {
                object_type = Some(get_string(&mut buf, field_len, "objectType")?)
            }
            FIELD_OBJECT_ID => object_id = Some(get_string(&mut buf, field_len, "objectID")?),
            FIELD_OFFSET => offset = get_i64(&mut buf, field_len, "offset")?,
            FIELD_INSTANCE_ID => instance_id = get_i64(&mut buf, field_len, "instanceID")?,
            FIELD_DATA => {
                let len = field_len as usize;
                if buf.remaining() < len {
                    return Err(WireError::ShortRead("data"));
                }
                data = Some(buf.slice(0..len));
                buf.advance(len);
            }
            // Unknown field: skip the declared length for forward
            // compatibility.
            _ => {
                let len = field_len as usize;
                if buf.remaining() < len {
                    return Err(WireError::ShortRead("unknown field"));
                }
                buf.advance(len);
            }
        }
    }

    let object_type = object_type.ok_or(WireError::MissingField("objectType"))?;
    let object_id = object_id.ok_or(WireError::MissingField("objectID"))?;
    let data = data.ok_or(WireError::MissingField("data"))?;

    Ok(DataMessage {
        org_id,
        object_type,
        object_id,
        offset,
        instance_id,
        data,
    })
}

fn get_string(buf: &mut Bytes, field_len: u32, field: &'static str) -> Result<String, WireError> {
    let len = field_len as usize;
    if buf.remaining() < len {
        return Err(WireError::ShortRead(field));
    }
    let value = String::from_utf8_lossy(&buf.slice(0..len)).into_owned();
    buf.advance(len);
    Ok(value)
}

fn get_i64(buf: &mut Bytes, field_len: u32, field: &'static str) -> Result<i64, WireError> {
    if field_len != 8 {
        return Err(WireError::InvalidFieldLength {
            field,
            len: field_len,
        });
    }
    if buf.remaining() < 8 {
        return Err(WireError::ShortRead(field));
    }
    Ok(buf.get_i64())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
