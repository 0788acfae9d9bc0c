//! Validation and conditional write of candidate values.
//!
//! A single implementation per type family handles every entry; the
//! [`Validator`] tag only selects between compare-before-write and
//! always-write semantics, plus an optional extra acceptance rule.

use crate::attr::{AttrEntry, AttrError, AttrType, Value, WriteResult};

/// Write semantics of an entry.
#[derive(Debug, Clone, Copy)]
pub enum Validator {
    /// Write only when the candidate differs from the stored value.
    Stateful,
    /// Every accepted write counts as a change.
    ControlPoint,
    /// Stateful, after the rule accepts the candidate.
    Custom(fn(&Value<'_>) -> bool),
}

/// Validates `value` against `entry` and, when `do_write` is set, stores it
/// into `slot`.
///
/// Returns `Dirty` exactly when the caller must mark the entry modified.
/// With `do_write == false` nothing is mutated and the result is `Clean`.
pub fn validate(
    entry: &AttrEntry,
    slot: &mut [u8],
    value: &Value<'_>,
    do_write: bool,
) -> Result<WriteResult<()>, AttrError> {
    debug_assert_eq!(slot.len(), entry.size);

    if let Validator::Custom(rule) = entry.validator {
        if !rule(value) {
            return Err(AttrError::OutOfRange);
        }
    }

    match entry.ty {
        AttrType::String => {
            let Value::Text(text) = *value else {
                return Err(AttrError::InvalidArgument);
            };
            let text = match text.iter().position(|b| *b == 0) {
                Some(end) => &text[..end],
                None => text,
            };
            if text.len() >= entry.size || text.len() < entry.min.as_unsigned() as usize {
                return Err(AttrError::InvalidArgument);
            }
            // must survive a round trip through the parameter file
            let line_break = text.iter().any(|b| *b == b'\n' || *b == b'\r');
            if line_break || core::str::from_utf8(text).is_err() {
                return Err(AttrError::InvalidArgument);
            }
            let unchanged = slot[..text.len()] == *text && slot[text.len()] == 0;
            Ok(commit(entry, do_write, unchanged, || {
                slot.fill(0);
                slot[..text.len()].copy_from_slice(text);
            }))
        }
        AttrType::ByteArray => {
            let Value::Bytes(bytes) = *value else {
                return Err(AttrError::InvalidArgument);
            };
            if bytes.len() != entry.size {
                return Err(AttrError::InvalidArgument);
            }
            let unchanged = *slot == *bytes;
            Ok(commit(entry, do_write, unchanged, || {
                slot.copy_from_slice(bytes)
            }))
        }
        AttrType::Float => {
            let Value::Float(v) = *value else {
                return Err(AttrError::InvalidArgument);
            };
            let (min, max) = (entry.min.as_float(), entry.max.as_float());
            // exact equality marks an unbounded entry
            if min != max && !(min <= v && v <= max) {
                return Err(AttrError::OutOfRange);
            }
            let native = v.to_le_bytes();
            let unchanged = *slot == native;
            Ok(commit(entry, do_write, unchanged, || {
                slot.copy_from_slice(&native)
            }))
        }
        AttrType::Bool => {
            let b = match *value {
                Value::Bool(b) => b,
                Value::Unsigned(0) | Value::Signed(0) => false,
                Value::Unsigned(1) | Value::Signed(1) => true,
                _ => return Err(AttrError::InvalidArgument),
            };
            let unchanged = slot[0] == b as u8;
            Ok(commit(entry, do_write, unchanged, || slot[0] = b as u8))
        }
        ty => {
            let Some((lo, hi)) = ty.integer_range() else {
                return Err(AttrError::InvalidArgument);
            };
            let v = value.as_integer().ok_or(AttrError::InvalidArgument)?;
            if v < lo || v > hi || !within_bounds(entry, v) {
                return Err(AttrError::OutOfRange);
            }
            let wide = if ty.is_signed() {
                (v as i64).to_le_bytes()
            } else {
                (v as u64).to_le_bytes()
            };
            let native = &wide[..entry.size];
            let unchanged = *slot == *native;
            Ok(commit(entry, do_write, unchanged, || {
                slot.copy_from_slice(native)
            }))
        }
    }
}

fn within_bounds(entry: &AttrEntry, v: i128) -> bool {
    if entry.ty.is_signed() {
        let (min, max) = (entry.min.as_signed(), entry.max.as_signed());
        min == max || (min as i128 <= v && v <= max as i128)
    } else {
        let (min, max) = (entry.min.as_unsigned(), entry.max.as_unsigned());
        min == max || (min as i128 <= v && v <= max as i128)
    }
}

fn commit(
    entry: &AttrEntry,
    do_write: bool,
    unchanged: bool,
    write: impl FnOnce(),
) -> WriteResult<()> {
    if !do_write {
        return WriteResult::Clean(());
    }
    match entry.validator {
        Validator::ControlPoint => {
            write();
            WriteResult::Dirty(())
        }
        Validator::Stateful | Validator::Custom(_) if !unchanged => {
            write();
            WriteResult::Dirty(())
        }
        _ => WriteResult::Clean(()),
    }
}

/// Transmit powers (dBm) supported by the BLE radio.
pub fn tx_power(value: &Value<'_>) -> bool {
    const SUPPORTED: [i128; 14] = [-40, -20, -16, -12, -8, -4, 0, 2, 3, 4, 5, 6, 7, 8];
    value
        .as_integer()
        .is_some_and(|v| SUPPORTED.contains(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(entry: &AttrEntry, slot: &mut [u8], value: Value<'_>) -> Result<bool, AttrError> {
        validate(entry, slot, &value, true).map(|r| r.is_dirty())
    }

    #[test]
    fn unsigned_bounds_are_inclusive() {
        let e = AttrEntry::u32(0).range_u(10, 20);
        let mut slot = [0u8; 4];
        assert_eq!(run(&e, &mut slot, Value::Unsigned(9)), Err(AttrError::OutOfRange));
        assert_eq!(run(&e, &mut slot, Value::Unsigned(21)), Err(AttrError::OutOfRange));
        assert_eq!(run(&e, &mut slot, Value::Unsigned(10)), Ok(true));
        assert_eq!(run(&e, &mut slot, Value::Unsigned(20)), Ok(true));
        assert_eq!(slot, 20u32.to_le_bytes());
    }

    #[test]
    fn equal_bounds_mean_unbounded_but_width_still_applies() {
        let e = AttrEntry::u8(0);
        let mut slot = [0u8; 1];
        assert_eq!(run(&e, &mut slot, Value::Unsigned(255)), Ok(true));
        assert_eq!(run(&e, &mut slot, Value::Unsigned(256)), Err(AttrError::OutOfRange));
        assert_eq!(run(&e, &mut slot, Value::Signed(-1)), Err(AttrError::OutOfRange));
    }

    #[test]
    fn signed_bounds_use_signed_view() {
        let e = AttrEntry::i8(0).range_i(-40, 8);
        let mut slot = [0u8; 1];
        assert_eq!(run(&e, &mut slot, Value::Signed(-41)), Err(AttrError::OutOfRange));
        assert_eq!(run(&e, &mut slot, Value::Signed(-40)), Ok(true));
        assert_eq!(slot, [(-40i8) as u8]);
        assert_eq!(run(&e, &mut slot, Value::Unsigned(9)), Err(AttrError::OutOfRange));
    }

    #[test]
    fn stateful_write_is_dirty_only_on_change() {
        let e = AttrEntry::u16(0);
        let mut slot = [0u8; 2];
        assert_eq!(run(&e, &mut slot, Value::Unsigned(42)), Ok(true));
        assert_eq!(run(&e, &mut slot, Value::Unsigned(42)), Ok(false));
        assert_eq!(run(&e, &mut slot, Value::Unsigned(43)), Ok(true));
    }

    #[test]
    fn control_point_is_always_dirty() {
        let e = AttrEntry::u32(0).control_point().range_u(0, 4);
        let mut slot = [0u8; 4];
        assert_eq!(run(&e, &mut slot, Value::Unsigned(1)), Ok(true));
        assert_eq!(run(&e, &mut slot, Value::Unsigned(1)), Ok(true));
        // bounds still apply
        assert_eq!(run(&e, &mut slot, Value::Unsigned(5)), Err(AttrError::OutOfRange));
    }

    #[test]
    fn validate_only_never_mutates() {
        let e = AttrEntry::u32(0).control_point();
        let mut slot = [0u8; 4];
        let r = validate(&e, &mut slot, &Value::Unsigned(7), false);
        assert_eq!(r, Ok(WriteResult::Clean(())));
        assert_eq!(slot, [0; 4]);
    }

    #[test]
    fn bool_accepts_only_literal_truth_values() {
        let e = AttrEntry::boolean(false);
        let mut slot = [0u8; 1];
        assert_eq!(run(&e, &mut slot, Value::Bool(true)), Ok(true));
        assert_eq!(run(&e, &mut slot, Value::Unsigned(1)), Ok(false));
        assert_eq!(run(&e, &mut slot, Value::Unsigned(0)), Ok(true));
        assert_eq!(run(&e, &mut slot, Value::Unsigned(2)), Err(AttrError::InvalidArgument));
        assert_eq!(run(&e, &mut slot, Value::Float(1.0)), Err(AttrError::InvalidArgument));
    }

    #[test]
    fn float_range_and_sentinel() {
        let bounded = AttrEntry::float(0.0).range_f(0.0, 10.0);
        let mut slot = [0u8; 4];
        assert_eq!(run(&bounded, &mut slot, Value::Float(10.0)), Ok(true));
        assert_eq!(run(&bounded, &mut slot, Value::Float(10.5)), Err(AttrError::OutOfRange));
        assert_eq!(run(&bounded, &mut slot, Value::Float(f32::NAN)), Err(AttrError::OutOfRange));

        let open = AttrEntry::float(0.13);
        assert_eq!(run(&open, &mut slot, Value::Float(-1e9)), Ok(true));
        assert_eq!(run(&open, &mut slot, Value::Unsigned(1)), Err(AttrError::InvalidArgument));
    }

    #[test]
    fn string_capacity_and_minimum() {
        let e = AttrEntry::string(4, "").min_len(1);
        let mut slot = [0u8; 5];
        assert_eq!(run(&e, &mut slot, Value::Text(b"abcd")), Ok(true));
        assert_eq!(slot, *b"abcd\0");
        assert_eq!(run(&e, &mut slot, Value::Text(b"abcde")), Err(AttrError::InvalidArgument));
        assert_eq!(run(&e, &mut slot, Value::Text(b"")), Err(AttrError::InvalidArgument));

        // Shorter value clears the tail
        assert_eq!(run(&e, &mut slot, Value::Text(b"ab")), Ok(true));
        assert_eq!(slot, *b"ab\0\0\0");
        assert_eq!(run(&e, &mut slot, Value::Text(b"ab")), Ok(false));
    }

    #[test]
    fn string_rejects_text_the_file_cannot_hold() {
        let e = AttrEntry::string(8, "gw");
        let mut slot = *b"gw\0\0\0\0\0\0\0";
        assert_eq!(run(&e, &mut slot, Value::Text(b"a\nb")), Err(AttrError::InvalidArgument));
        assert_eq!(run(&e, &mut slot, Value::Text(b"a\rb")), Err(AttrError::InvalidArgument));
        assert_eq!(run(&e, &mut slot, Value::Text(&[0xC3, 0x28])), Err(AttrError::InvalidArgument));
        assert_eq!(slot, *b"gw\0\0\0\0\0\0\0");
        assert_eq!(run(&e, &mut slot, Value::Text("caf\u{e9}".as_bytes())), Ok(true));
    }

    #[test]
    fn byte_array_requires_exact_length() {
        let e = AttrEntry::bytes(&[0; 4]);
        let mut slot = [0u8; 4];
        assert_eq!(run(&e, &mut slot, Value::Bytes(&[1, 2, 3])), Err(AttrError::InvalidArgument));
        assert_eq!(run(&e, &mut slot, Value::Bytes(&[1, 2, 3, 4, 5])), Err(AttrError::InvalidArgument));
        assert_eq!(run(&e, &mut slot, Value::Bytes(&[1, 2, 3, 4])), Ok(true));
        assert_eq!(run(&e, &mut slot, Value::Bytes(&[1, 2, 3, 4])), Ok(false));
    }

    #[test]
    fn tx_power_accepts_only_supported_levels() {
        let e = AttrEntry::i8(0).custom(tx_power);
        let mut slot = [0u8; 1];
        assert_eq!(run(&e, &mut slot, Value::Signed(-20)), Ok(true));
        assert_eq!(run(&e, &mut slot, Value::Signed(-20)), Ok(false));
        assert_eq!(run(&e, &mut slot, Value::Signed(-19)), Err(AttrError::OutOfRange));
        assert_eq!(run(&e, &mut slot, Value::Signed(1)), Err(AttrError::OutOfRange));
        assert_eq!(run(&e, &mut slot, Value::Signed(8)), Ok(true));
    }
}
