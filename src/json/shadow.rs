//! Helpers for cloud shadow documents.
//!
//! A shadow delta looks like `{"state":{"networkId":42,...},"version":7}`.
//! The members of `state` are matched to attributes by name.

use bitmaps::{Bits, BitsImpl};

use crate::{
    attr::{AttrError, AttrId, AttrType, AttributeStore, ChangeSink, ParamStore, param_file},
    json::{Parent, ScanSession, TokenKind},
};

/// Index of the `state` object, searched from the start of the document.
pub fn find_state<const T: usize>(session: &mut ScanSession<'_, '_, T>) -> Option<usize> {
    session.reset_index();
    session.find("state", TokenKind::Object, Parent::Any)
}

/// Decimal value of the first primitive named `key` anywhere in the document.
pub fn find_uint<const T: usize>(session: &mut ScanSession<'_, '_, T>, key: &str) -> Option<u32> {
    session.reset_index();
    match session.find(key, TokenKind::Primitive, Parent::Any) {
        Some(i) => Some(session.convert_uint(i)),
        None => {
            log::debug!("{} not found", key);
            None
        }
    }
}

/// Writes every direct member of `state` whose key names an attribute.
///
/// Each member goes through [`AttributeStore::set`], so read-only entries
/// and lockable entries under lock are refused like any other outside
/// write. Members that name no attribute or hold an object or array are
/// skipped.
/// A member whose value is rejected is logged and skipped. Returns how many
/// attributes were written.
pub fn apply_state<const T: usize, const N: usize, const TS: usize, const FS: usize, PS, CS>(
    session: &mut ScanSession<'_, '_, T>,
    store: &AttributeStore<N, TS, FS, PS, CS>,
) -> Result<usize, AttrError>
where
    PS: ParamStore,
    CS: ChangeSink,
    BitsImpl<N>: Bits,
{
    if !session.valid() {
        return Err(AttrError::Parse);
    }
    let state = find_state(session).ok_or(AttrError::NotFound)?;
    let count = session.result().unwrap_or(0);

    let mut applied = 0;
    for i in state + 1..count.saturating_sub(1) {
        let key = session.token(i);
        if key.kind != TokenKind::String || key.parent != Some(state) {
            continue;
        }
        let name = session.string(i);
        let Some(id) = store.get_id(name) else {
            log::debug!("No attribute named {}", name);
            continue;
        };
        match apply_member(session, store, id, i + 1) {
            Ok(()) => applied += 1,
            Err(e) => log::warn!("Unable to set {} from shadow: {}", name, e),
        }
    }
    Ok(applied)
}

fn apply_member<const T: usize, const N: usize, const TS: usize, const FS: usize, PS, CS>(
    session: &ScanSession<'_, '_, T>,
    store: &AttributeStore<N, TS, FS, PS, CS>,
    id: AttrId,
    value: usize,
) -> Result<(), AttrError>
where
    PS: ParamStore,
    CS: ChangeSink,
    BitsImpl<N>: Bits,
{
    let kind = session.kind(value);
    let text = session.string(value);
    let ty = store.get_type(id).ok_or(AttrError::NotFound)?;
    match (ty, kind) {
        (AttrType::String, TokenKind::String) => store.set(id, AttrType::Any, text.as_bytes()),
        (AttrType::ByteArray, TokenKind::String) => {
            let mut bin = [0u8; param_file::MAX_BIN_SIZE];
            let n = param_file::decode_hex(text, &mut bin)?;
            store.set(id, AttrType::Any, &bin[..n])
        }
        (_, TokenKind::Primitive) => {
            let mut raw = [0u8; 8];
            let n = encode_primitive(ty, text, &mut raw)?;
            store.set(id, AttrType::Any, &raw[..n])
        }
        _ => Err(AttrError::InvalidArgument),
    }
}

/// Little-endian bytes of a primitive token, as [`AttributeStore::set`]
/// expects them for an entry of type `ty`.
fn encode_primitive(ty: AttrType, text: &str, raw: &mut [u8; 8]) -> Result<usize, AttrError> {
    match (ty, text) {
        (_, "null") => Err(AttrError::InvalidArgument),
        (AttrType::Bool, "true") => {
            raw[0] = 1;
            Ok(1)
        }
        (AttrType::Bool, "false") => Ok(1),
        (AttrType::Float, _) => {
            let v = text.parse::<f32>().map_err(|_| AttrError::InvalidArgument)?;
            raw[..4].copy_from_slice(&v.to_le_bytes());
            Ok(4)
        }
        (ty, _) if ty.is_signed() => {
            let v = text.parse::<i64>().map_err(|_| AttrError::InvalidArgument)?;
            *raw = v.to_le_bytes();
            Ok(8)
        }
        (ty, _) if ty.is_unsigned() => {
            let v = text.parse::<u64>().map_err(|_| AttrError::OutOfRange)?;
            *raw = v.to_le_bytes();
            Ok(8)
        }
        _ => Err(AttrError::InvalidArgument),
    }
}
