//! The match evaluator: walks the test forest against a file's bytes, resolving offsets,
//! reading typed fields, applying masks and comparators, and assembling the description chain.
//!
//! Every read failure in here (offset past end-of-file, short read, bad pointer arithmetic) is a
//! local non-match, never an error: a truncated file is simply a file that matches fewer tests.

use scry_core::prelude::*;

use crate::forest::MagicDatabase;
use crate::record::{
    CompareOp, Endianness, OffsetSpec, PointerKind, SignatureRecord, StringModifiers, TestValue,
    TypeKind, TypeSpec,
};

/// A successful magic identification: the joined description chain of the matched records, and
/// the first mime annotation encountered along that chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicMatch {
    pub description: String,
    pub mime: Option<String>,
}

/// The field value actually read from the file, carried through comparison and description
/// substitution.
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Int(u64),
    Float(f64),
    Bytes(Vec<u8>),
}

pub(crate) fn evaluate(database: &MagicDatabase, data: &[u8]) -> Option<MagicMatch> {
    for root in database.roots() {
        let mut fragments = Vec::new();
        let mut mime = None;
        // Per-evaluation scratch; the forest itself is never touched.
        let mut cursor = DataCursor::new(data, Endian::Little);
        if eval_record(root, &mut cursor, &mut fragments, &mut mime) {
            let description = join_fragments(&fragments);
            log::debug!("magic match: {description}");
            return Some(MagicMatch { description, mime });
        }
    }
    None
}

/// Evaluates one record and, on a match, all of its children. Matching children each append
/// their fragment in file order; a parent with no matching children still stands on its own
/// description. Child offsets are file-absolute, not relative to where the parent matched.
fn eval_record(
    record: &SignatureRecord,
    cursor: &mut DataCursor,
    fragments: &mut Vec<String>,
    mime: &mut Option<String>,
) -> bool {
    let Some(offset) = resolve_offset(&record.offset, cursor) else {
        return false;
    };
    let Some(value) = read_field(record, offset, cursor) else {
        return false;
    };
    if !compare(record, &value) {
        return false;
    }

    if !record.description.is_empty() {
        fragments.push(substitute(&record.description, &value, &record.test_type));
    }
    if mime.is_none() {
        mime.clone_from(&record.mime);
    }
    for child in &record.children {
        eval_record(child, cursor, fragments, mime);
    }
    true
}

/// Resolves a record's offset to an absolute file offset, reading the pointer field for the
/// indirect form. Returns `None` if the pointer lies past end-of-file or the arithmetic leaves
/// the addressable range.
fn resolve_offset(spec: &OffsetSpec, cursor: &mut DataCursor) -> Option<usize> {
    match *spec {
        OffsetSpec::Direct(offset) => usize::try_from(offset).ok(),
        OffsetSpec::Indirect { base, pointer, adjust } => {
            cursor.set_position(usize::try_from(base).ok()?);
            cursor.set_endian(pointer.endian.byte_order());
            let value = match pointer.kind {
                PointerKind::Byte => u64::from(cursor.read_u8().ok()?),
                PointerKind::Short => u64::from(cursor.read_u16().ok()?),
                PointerKind::Long => u64::from(cursor.read_u32().ok()?),
                PointerKind::Double => cursor.read_f64().ok()? as u64,
            };
            let resolved = match adjust {
                Some(adjust) => i64::try_from(value).ok()?.checked_add(adjust)?,
                None => i64::try_from(value).ok()?,
            };
            usize::try_from(resolved).ok()
        }
    }
}

/// Reads the record's test field at the resolved offset. A short read is `None`, a non-match.
fn read_field(record: &SignatureRecord, offset: usize, cursor: &mut DataCursor) -> Option<FieldValue> {
    let spec = &record.test_type;
    match spec.kind {
        TypeKind::String => {
            let want = match &record.datum {
                TestValue::Bytes(datum) => datum.len(),
                _ => 0,
            };
            let bytes = cursor.get(offset..)?;
            Some(FieldValue::Bytes(collect_string(bytes, want, spec.modifiers)))
        }
        TypeKind::PString => {
            // A pstring leads with its own length byte.
            let bytes = cursor.get(offset..)?;
            let (&length, content) = bytes.split_first()?;
            let content = content.get(..usize::from(length))?;
            Some(FieldValue::Bytes(collect_string(content, content.len(), spec.modifiers)))
        }
        TypeKind::Float => {
            cursor.set_position(offset);
            cursor.set_endian(spec.endian.byte_order());
            Some(FieldValue::Float(f64::from(cursor.read_f32().ok()?)))
        }
        TypeKind::Double => {
            cursor.set_position(offset);
            cursor.set_endian(spec.endian.byte_order());
            Some(FieldValue::Float(cursor.read_f64().ok()?))
        }
        TypeKind::Integer { .. } | TypeKind::Date => {
            cursor.set_position(offset);
            let raw = if spec.endian == Endianness::Middle {
                // PDP-11 halfword-swapped order, defined for 4-byte fields only.
                let bytes = cursor.read_exact::<4>().ok()?;
                u64::from(u32::from_be_bytes([bytes[1], bytes[0], bytes[3], bytes[2]]))
            } else {
                cursor.set_endian(spec.endian.byte_order());
                match spec.width {
                    1 => u64::from(cursor.read_u8().ok()?),
                    2 => u64::from(cursor.read_u16().ok()?),
                    4 => u64::from(cursor.read_u32().ok()?),
                    8 => cursor.read_u64().ok()?,
                    _ => return None,
                }
            };
            let masked = match record.mask {
                Some(mask) => raw & mask,
                None => raw,
            };
            Some(FieldValue::Int(masked & width_mask(spec.width)))
        }
    }
}

/// Collects up to `want` comparison bytes from the file, applying string modifiers: case folding
/// and blank-run compaction.
fn collect_string(bytes: &[u8], want: usize, modifiers: StringModifiers) -> Vec<u8> {
    let mut out = Vec::with_capacity(want);
    let mut index = 0;
    while index < bytes.len() && out.len() < want {
        let mut byte = bytes[index];
        if modifiers.contains(StringModifiers::CASE_FOLD) {
            byte = byte.to_ascii_lowercase();
        }
        out.push(byte);
        if modifiers.contains(StringModifiers::COMPACT_WHITESPACE) && byte == b' ' {
            while index + 1 < bytes.len() && bytes[index + 1] == b' ' {
                index += 1;
            }
        }
        index += 1;
    }
    out
}

/// Applies the record's comparator flags. Each set relation contributes its own verdict and the
/// verdicts are OR-ed; `NEGATE` inverts the combined result at the end.
fn compare(record: &SignatureRecord, value: &FieldValue) -> bool {
    let op = record.compare;
    let mut verdict = op.contains(CompareOp::ALWAYS);

    match (value, &record.datum) {
        (FieldValue::Int(field), TestValue::Unsigned(datum)) => {
            let spec = &record.test_type;
            let mask = width_mask(spec.width);
            let field = *field & mask;
            let datum = *datum & mask;
            let signed = matches!(spec.kind, TypeKind::Integer { signed: true });

            if op.contains(CompareOp::EQUAL) {
                verdict |= field == datum;
            }
            if op.contains(CompareOp::LESS) {
                verdict |= match signed {
                    true => sign_extend(field, spec.width) < sign_extend(datum, spec.width),
                    false => field < datum,
                };
            }
            if op.contains(CompareOp::GREATER) {
                verdict |= match signed {
                    true => sign_extend(field, spec.width) > sign_extend(datum, spec.width),
                    false => field > datum,
                };
            }
            if op.contains(CompareOp::BITS_SET) {
                verdict |= field & datum == datum;
            }
            if op.contains(CompareOp::BITS_CLEAR) {
                verdict |= field & datum == 0;
            }
            if op.contains(CompareOp::BITS_NEGATE) {
                verdict |= !field & mask == datum;
            }
        }
        (FieldValue::Float(field), TestValue::Float(datum)) => {
            if op.contains(CompareOp::EQUAL) {
                verdict |= field == datum;
            }
            if op.contains(CompareOp::LESS) {
                verdict |= field < datum;
            }
            if op.contains(CompareOp::GREATER) {
                verdict |= field > datum;
            }
        }
        (FieldValue::Bytes(field), TestValue::Bytes(datum)) => {
            let datum = match record.test_type.modifiers.contains(StringModifiers::CASE_FOLD) {
                true => datum.to_ascii_lowercase(),
                false => datum.clone(),
            };
            if op.contains(CompareOp::EQUAL) {
                verdict |= *field == datum;
            }
            if op.contains(CompareOp::LESS) {
                verdict |= *field < datum;
            }
            if op.contains(CompareOp::GREATER) {
                verdict |= *field > datum;
            }
        }
        // A kind mismatch cannot be produced by the parser; treat it as a non-match.
        _ => {}
    }

    match op.contains(CompareOp::NEGATE) {
        true => !verdict,
        false => verdict,
    }
}

#[inline]
fn width_mask(width: usize) -> u64 {
    match width {
        8 | 0 => u64::MAX,
        _ => (1u64 << (width * 8)) - 1,
    }
}

#[inline]
fn sign_extend(value: u64, width: usize) -> i64 {
    let shift = 64 - (width.clamp(1, 8) * 8) as u32;
    ((value << shift) as i64) >> shift
}

/// Substitutes the matched value into printf-style placeholders in a description fragment.
/// Flags, field widths, precision, and `l`/`h` length modifiers are accepted and ignored.
fn substitute(description: &str, value: &FieldValue, spec: &TypeSpec) -> String {
    let mut out = String::with_capacity(description.len());
    let mut chars = description.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        while matches!(chars.peek(), Some('-' | '+' | ' ' | '#' | '.' | '0'..='9')) {
            chars.next();
        }
        while matches!(chars.peek(), Some('l' | 'h')) {
            chars.next();
        }
        match chars.next() {
            None => out.push('%'),
            Some('%') => out.push('%'),
            Some(conversion) => out.push_str(&format_value(conversion, value, spec)),
        }
    }
    out
}

fn format_value(conversion: char, value: &FieldValue, spec: &TypeSpec) -> String {
    match (conversion, value) {
        ('d' | 'i', FieldValue::Int(v)) => match spec.kind {
            TypeKind::Integer { signed: true } => sign_extend(*v, spec.width).to_string(),
            _ => v.to_string(),
        },
        ('u', FieldValue::Int(v)) => v.to_string(),
        ('x', FieldValue::Int(v)) => format!("{v:x}"),
        ('X', FieldValue::Int(v)) => format!("{v:X}"),
        ('o', FieldValue::Int(v)) => format!("{v:o}"),
        ('c', FieldValue::Int(v)) => char::from(*v as u8).to_string(),
        ('s', FieldValue::Int(v)) => v.to_string(),
        ('s' | 'c', FieldValue::Bytes(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
        ('d' | 'i' | 'u', FieldValue::Float(f)) => (*f as i64).to_string(),
        ('f' | 'g', FieldValue::Float(f)) => f.to_string(),
        ('e', FieldValue::Float(f)) => format!("{f:e}"),
        // An unknown conversion or a kind mismatch passes through untouched.
        (other, _) => format!("%{other}"),
    }
}

/// Joins description fragments with single spaces. A fragment starting with the two characters
/// `\b` glues onto the previous fragment without a separator, file(1) style.
fn join_fragments(fragments: &[String]) -> String {
    let mut out = String::new();
    for fragment in fragments {
        match fragment.strip_prefix("\\b") {
            Some(glued) => out.push_str(glued),
            None => {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(fragment);
            }
        }
    }
    out
}
