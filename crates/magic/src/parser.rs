//! The grammar parser: converts one logical line into a [`SignatureRecord`] or a mime
//! annotation, rejecting malformed lines with their line number attached.

use snafu::prelude::*;

use crate::error::{
    BadMaskSnafu, BadModifierSnafu, BadOffsetSnafu, BadTestValueSnafu, MissingFieldSnafu, Result,
    UnknownTypeSnafu, UnsupportedTypeSnafu, UnterminatedOffsetSnafu,
};
use crate::record::{
    CompareOp, Endianness, OffsetSpec, PointerKind, PointerType, SignatureRecord, StringModifiers,
    TestValue, TypeKind, TypeSpec,
};

/// One successfully parsed logical line. A mime annotation never produces a new record; the
/// forest builder binds it to the nearest preceding record instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Record(SignatureRecord),
    Mime(String),
}

/// Parses one logical line of the database.
///
/// # Errors
/// Returns a per-line [`Error`](crate::Error) carrying `lineno` if any field is missing or
/// malformed. Callers are expected to log it and move on to the next line.
pub fn parse_line(line: &str, lineno: usize) -> Result<ParsedLine> {
    if let Some(rest) = line.strip_prefix("!:mime") {
        let value = rest.trim();
        ensure!(!value.is_empty(), MissingFieldSnafu { lineno });
        return Ok(ParsedLine::Mime(value.to_owned()));
    }

    let (offset_field, rest) = split_token(line);
    let (type_field, rest) = split_token(rest);
    let (test_field, rest) = split_token(rest);
    ensure!(
        !offset_field.is_empty() && !type_field.is_empty() && !test_field.is_empty(),
        MissingFieldSnafu { lineno }
    );
    // The description is the literal remainder of the line, never re-split.
    let description = rest.trim().to_owned();

    let (level, offset) = parse_level_offset(offset_field, lineno)?;
    let (test_type, mask) = parse_type(type_field, lineno)?;
    let (compare, datum) = parse_test(test_field, test_type.kind, lineno)?;

    Ok(ParsedLine::Record(SignatureRecord {
        level,
        offset,
        test_type,
        mask,
        compare,
        datum,
        description,
        mime: None,
        children: Vec::new(),
    }))
}

/// Splits off the next whitespace-delimited token, honoring backslash-escaped blanks inside it
/// (string test data escapes its spaces). Returns the token and the trimmed remainder.
fn split_token(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'\\' && index + 1 < bytes.len() && bytes[index + 1].is_ascii() {
            index += 2;
            continue;
        }
        if bytes[index].is_ascii_whitespace() {
            break;
        }
        index += 1;
    }
    (&text[..index], text[index..].trim_start())
}

fn parse_level_offset(field: &str, lineno: usize) -> Result<(u32, OffsetSpec)> {
    let expression = field.trim_start_matches('>');
    let level = (field.len() - expression.len()) as u32;
    Ok((level, parse_offset(expression, lineno)?))
}

/// Parses an offset expression: a bare numeric literal, or the indirect form
/// `(base[.itype][+-adjust])`.
pub(crate) fn parse_offset(text: &str, lineno: usize) -> Result<OffsetSpec> {
    let Some(inner) = text.strip_prefix('(') else {
        let offset = parse_number(text).context(BadOffsetSnafu { lineno, text })?;
        return Ok(OffsetSpec::Direct(offset));
    };
    let inner = inner.strip_suffix(')').context(UnterminatedOffsetSnafu { lineno })?;

    let (base_text, pointer, adjust_text) = match inner.split_once('.') {
        Some((base_text, after)) => {
            let mut chars = after.chars();
            let code = chars.next().context(BadOffsetSnafu { lineno, text })?;
            let pointer = pointer_type(code).context(BadOffsetSnafu { lineno, text })?;
            (base_text, pointer, chars.as_str())
        }
        None => {
            let split = inner.find(['+', '-']).unwrap_or(inner.len());
            (&inner[..split], PointerType::default(), &inner[split..])
        }
    };

    let base = parse_number(base_text).context(BadOffsetSnafu { lineno, text })?;
    let adjust = match adjust_text.is_empty() {
        true => None,
        false => Some(parse_adjust(adjust_text).context(BadOffsetSnafu { lineno, text })?),
    };

    Ok(OffsetSpec::Indirect { base, pointer, adjust })
}

/// One-character pointer type codes for indirect offsets.
fn pointer_type(code: char) -> Option<PointerType> {
    let (kind, endian) = match code {
        'b' | 'c' | 'B' | 'C' => (PointerKind::Byte, Endianness::Little),
        'h' | 's' => (PointerKind::Short, Endianness::Little),
        'S' => (PointerKind::Short, Endianness::Big),
        'l' => (PointerKind::Long, Endianness::Little),
        'L' => (PointerKind::Long, Endianness::Big),
        'e' | 'f' | 'g' => (PointerKind::Double, Endianness::Little),
        'E' | 'F' | 'G' => (PointerKind::Double, Endianness::Big),
        _ => return None,
    };
    Some(PointerType { kind, endian })
}

/// Parses an unsigned numeric literal with the standard prefix rules: `0x` hex, leading `0`
/// octal, decimal otherwise.
pub(crate) fn parse_number(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if text.len() > 1 && text.starts_with('0') {
        u64::from_str_radix(&text[1..], 8).ok()
    } else {
        text.parse().ok()
    }
}

/// Like [`parse_number`] but accepts a leading minus, returning the two's-complement bits.
fn parse_integer(text: &str) -> Option<u64> {
    match text.strip_prefix('-') {
        Some(rest) => parse_number(rest).map(|value| (value as i64).wrapping_neg() as u64),
        None => parse_number(text),
    }
}

fn parse_adjust(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = i64::try_from(parse_number(digits)?).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parses the type field: `name[&mask]` for numeric types, `name[/modifiers]` for string types.
fn parse_type(field: &str, lineno: usize) -> Result<(TypeSpec, Option<u64>)> {
    let (name, mask_text) = match field.split_once('&') {
        Some((name, mask_text)) => (name, Some(mask_text)),
        None => (field, None),
    };
    let (name, modifier_text) = match name.split_once('/') {
        Some((name, modifier_text)) => (name, Some(modifier_text)),
        None => (name, None),
    };

    let (kind, endian, width) = lookup_type(name, lineno)?;

    let mask = match mask_text {
        Some(text) => {
            // Masks only make sense for numeric comparisons.
            ensure!(!kind.is_string(), BadMaskSnafu { lineno, text });
            Some(parse_number(text).context(BadMaskSnafu { lineno, text })?)
        }
        None => None,
    };

    let mut modifiers = StringModifiers::empty();
    if let Some(text) = modifier_text {
        ensure!(
            kind.is_string(),
            BadModifierSnafu { lineno, modifier: text.chars().next().unwrap_or('/') }
        );
        for modifier in text.chars() {
            match modifier {
                'c' | 'C' => modifiers.insert(StringModifiers::CASE_FOLD),
                'w' | 'W' => modifiers.insert(StringModifiers::COMPACT_WHITESPACE),
                'b' => modifiers.insert(StringModifiers::BINARY),
                't' => modifiers.insert(StringModifiers::TEXT),
                _ => return BadModifierSnafu { lineno, modifier }.fail(),
            }
        }
    }

    Ok((TypeSpec { kind, endian, width, modifiers }, mask))
}

/// The fixed type-name table. Unqualified names read in native byte order; `be`/`le`/`me`
/// prefixes qualify the same base names. `regex`, `search` and `default` are recognized
/// vocabulary that this evaluator does not implement.
fn lookup_type(name: &str, lineno: usize) -> Result<(TypeKind, Endianness, usize)> {
    if matches!(name, "regex" | "search" | "default") {
        return UnsupportedTypeSnafu { lineno, name }.fail();
    }
    if let Some(found) = base_type(name, Endianness::Native) {
        return Ok(found);
    }
    for (prefix, endian) in
        [("be", Endianness::Big), ("le", Endianness::Little), ("me", Endianness::Middle)]
    {
        let Some(base) = name.strip_prefix(prefix) else { continue };
        let Some(found @ (kind, _, width)) = base_type(base, endian) else { continue };
        // Byte-order prefixes only qualify multi-byte numeric types, and the middle-endian
        // order is only defined for 4-byte fields.
        if kind.is_string() || width < 2 {
            break;
        }
        if endian == Endianness::Middle && width != 4 {
            break;
        }
        return Ok(found);
    }
    UnknownTypeSnafu { lineno, name }.fail()
}

fn base_type(name: &str, endian: Endianness) -> Option<(TypeKind, Endianness, usize)> {
    let (kind, width) = match name {
        "byte" => (TypeKind::Integer { signed: true }, 1),
        "ubyte" => (TypeKind::Integer { signed: false }, 1),
        "short" => (TypeKind::Integer { signed: true }, 2),
        "ushort" => (TypeKind::Integer { signed: false }, 2),
        "long" => (TypeKind::Integer { signed: true }, 4),
        "ulong" => (TypeKind::Integer { signed: false }, 4),
        "quad" => (TypeKind::Integer { signed: true }, 8),
        "uquad" => (TypeKind::Integer { signed: false }, 8),
        "float" => (TypeKind::Float, 4),
        "double" => (TypeKind::Double, 8),
        "date" | "ldate" => (TypeKind::Date, 4),
        "qdate" | "qldate" => (TypeKind::Date, 8),
        "string" => (TypeKind::String, 0),
        "pstring" => (TypeKind::PString, 0),
        _ => return None,
    };
    Some((kind, endian, width))
}

/// Parses the test-data field: a greedy prefix of comparator flags, then a typed literal.
fn parse_test(field: &str, kind: TypeKind, lineno: usize) -> Result<(CompareOp, TestValue)> {
    let mut compare = CompareOp::empty();
    let mut rest = field;
    while let Some(c) = rest.chars().next() {
        let flag = match c {
            '=' => CompareOp::EQUAL,
            '<' => CompareOp::LESS,
            '>' => CompareOp::GREATER,
            '&' => CompareOp::BITS_SET,
            '^' => CompareOp::BITS_CLEAR,
            '~' => CompareOp::BITS_NEGATE,
            'x' => CompareOp::ALWAYS,
            '!' => CompareOp::NEGATE,
            _ => break,
        };
        compare.insert(flag);
        rest = &rest[c.len_utf8()..];
    }
    if compare.is_empty() {
        compare = CompareOp::EQUAL;
    } else if compare == CompareOp::NEGATE {
        // A bare `!` negates the default equality test.
        compare |= CompareOp::EQUAL;
    }

    if rest.is_empty() {
        // Only an unconditional test can get away without a literal.
        ensure!(compare.contains(CompareOp::ALWAYS), BadTestValueSnafu { lineno, text: field });
        let datum = match kind.is_string() {
            true => TestValue::Bytes(Vec::new()),
            false => TestValue::Unsigned(0),
        };
        return Ok((compare, datum));
    }

    let datum = match kind {
        TypeKind::String | TypeKind::PString => TestValue::Bytes(decode_string(rest)),
        TypeKind::Float | TypeKind::Double => TestValue::Float(
            rest.parse().ok().context(BadTestValueSnafu { lineno, text: field })?,
        ),
        TypeKind::Integer { .. } | TypeKind::Date => TestValue::Unsigned(
            parse_integer(rest).context(BadTestValueSnafu { lineno, text: field })?,
        ),
    };
    Ok((compare, datum))
}

/// Decodes a C-style escaped byte string: `\n \r \t \f \v \a \b \0`, `\xNN` hex, `\NNN` octal,
/// and any other escaped character (notably blanks) taken literally.
pub(crate) fn decode_string(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buffer = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buffer).as_bytes());
            continue;
        }
        match chars.next() {
            None => out.push(b'\\'),
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('f') => out.push(0x0c),
            Some('v') => out.push(0x0b),
            Some('a') => out.push(0x07),
            Some('b') => out.push(0x08),
            Some('x') => {
                let mut value: u8 = 0;
                let mut digits = 0;
                while digits < 2 {
                    match chars.peek().and_then(|d| d.to_digit(16)) {
                        Some(digit) => {
                            value = (value << 4) | digit as u8;
                            chars.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                match digits {
                    0 => out.push(b'x'),
                    _ => out.push(value),
                }
            }
            Some(first @ '0'..='7') => {
                let mut value = first.to_digit(8).unwrap_or(0) as u32;
                let mut digits = 1;
                while digits < 3 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            value = (value << 3) | digit;
                            chars.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                out.push(value as u8);
            }
            Some(other) => {
                let mut buffer = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buffer).as_bytes());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn record(line: &str) -> SignatureRecord {
        match parse_line(line, 1).unwrap() {
            ParsedLine::Record(record) => record,
            ParsedLine::Mime(_) => panic!("expected a record"),
        }
    }

    #[test]
    fn direct_offset_and_level() {
        let rec = record(">>0x10 byte 1 nested");
        assert_eq!(rec.level, 2);
        assert_eq!(rec.offset, OffsetSpec::Direct(0x10));
        assert_eq!(rec.test_type.kind, TypeKind::Integer { signed: true });
        assert_eq!(rec.test_type.width, 1);
        assert_eq!(rec.description, "nested");
    }

    #[test]
    fn octal_offset() {
        assert_eq!(record("010 byte 0 x").offset, OffsetSpec::Direct(8));
    }

    #[test]
    fn indirect_offset_full_form() {
        let rec = record("(4.S+2) belong 1 pointed-at");
        assert_eq!(rec.offset, OffsetSpec::Indirect {
            base: 4,
            pointer: PointerType { kind: PointerKind::Short, endian: Endianness::Big },
            adjust: Some(2),
        });
    }

    #[test]
    fn indirect_offset_defaults_to_le_long() {
        let rec = record("(8) byte 1 x");
        assert_eq!(rec.offset, OffsetSpec::Indirect {
            base: 8,
            pointer: PointerType::default(),
            adjust: None,
        });
        let rec = record("(8-4) byte 1 x");
        assert_eq!(rec.offset, OffsetSpec::Indirect {
            base: 8,
            pointer: PointerType::default(),
            adjust: Some(-4),
        });
    }

    #[test]
    fn unterminated_indirect_offset_is_an_error() {
        assert!(matches!(
            parse_line("(4.l byte 1 x", 7),
            Err(Error::UnterminatedOffset { lineno: 7 })
        ));
    }

    #[test]
    fn offset_round_trips_through_display() {
        for text in ["17", "(4.S+2)", "(8.e-1)", "(0.b)"] {
            let parsed = parse_offset(text, 1).unwrap();
            let reparsed = parse_offset(&parsed.to_string(), 1).unwrap();
            assert_eq!(parsed, reparsed, "{text}");
        }
    }

    #[test]
    fn endian_qualified_types() {
        assert_eq!(record("0 beshort 1 x").test_type.endian, Endianness::Big);
        assert_eq!(record("0 lelong 1 x").test_type.endian, Endianness::Little);
        let rec = record("0 melong 1 x");
        assert_eq!(rec.test_type.endian, Endianness::Middle);
        assert_eq!(rec.test_type.width, 4);
        assert_eq!(record("0 quad 1 x").test_type.width, 8);
        assert_eq!(record("0 bedate 1 x").test_type.kind, TypeKind::Date);
    }

    #[test]
    fn middle_endian_is_four_bytes_only() {
        assert!(matches!(parse_line("0 meshort 1 x", 3), Err(Error::UnknownType { .. })));
    }

    #[test]
    fn unknown_and_unsupported_types() {
        assert!(matches!(
            parse_line("0 wibble 1 x", 2),
            Err(Error::UnknownType { lineno: 2, .. })
        ));
        assert!(matches!(
            parse_line("0 regex foo x", 4),
            Err(Error::UnsupportedType { lineno: 4, .. })
        ));
    }

    #[test]
    fn mask_is_extracted_from_type_field() {
        let rec = record("0 long&0xff 7 masked");
        assert_eq!(rec.mask, Some(0xff));
        assert!(matches!(parse_line("0 string&3 x y", 1), Err(Error::BadMask { .. })));
    }

    #[test]
    fn string_modifiers() {
        let rec = record("0 string/c abc folded");
        assert!(rec.test_type.modifiers.contains(StringModifiers::CASE_FOLD));
        let rec = record("0 string/cW abc both");
        assert!(rec.test_type.modifiers.contains(StringModifiers::COMPACT_WHITESPACE));
        let rec = record("0 string/bt abc carried");
        assert!(rec.test_type.modifiers.contains(StringModifiers::BINARY | StringModifiers::TEXT));
        assert!(matches!(parse_line("0 string/z x y", 1), Err(Error::BadModifier { .. })));
    }

    #[test]
    fn comparator_prefix_flags() {
        let rec = record("0 byte <10 small");
        assert_eq!(rec.compare, CompareOp::LESS);
        assert_eq!(rec.datum, TestValue::Unsigned(10));

        let rec = record("0 byte !=0 nonzero");
        assert_eq!(rec.compare, CompareOp::NEGATE | CompareOp::EQUAL);

        // A bare `!` is negated equality, not negation of nothing.
        let rec = record("0 byte !0 nonzero");
        assert_eq!(rec.compare, CompareOp::NEGATE | CompareOp::EQUAL);

        let rec = record("0 byte x anything");
        assert_eq!(rec.compare, CompareOp::ALWAYS);

        let rec = record("0 byte &0x80 high-bit");
        assert_eq!(rec.compare, CompareOp::BITS_SET);
        assert_eq!(rec.datum, TestValue::Unsigned(0x80));
    }

    #[test]
    fn default_comparator_is_equal() {
        assert_eq!(record("0 byte 5 five").compare, CompareOp::EQUAL);
    }

    #[test]
    fn negative_test_value_keeps_twos_complement_bits() {
        assert_eq!(record("0 byte -1 x").datum, TestValue::Unsigned((-1i64) as u64));
    }

    #[test]
    fn missing_test_field_is_an_error() {
        assert!(matches!(parse_line("0 string", 12), Err(Error::MissingField { lineno: 12 })));
    }

    #[test]
    fn bare_comparator_without_literal_is_an_error() {
        assert!(matches!(parse_line("0 byte > big", 1), Err(Error::BadTestValue { .. })));
    }

    #[test]
    fn string_datum_with_escaped_blank() {
        let rec = record("0 string POSIX\\ tar tar archive");
        assert_eq!(rec.datum, TestValue::Bytes(b"POSIX tar".to_vec()));
        assert_eq!(rec.description, "tar archive");
    }

    #[test]
    fn mime_line() {
        assert_eq!(
            parse_line("!:mime application/x-tar", 9).unwrap(),
            ParsedLine::Mime("application/x-tar".to_owned())
        );
        assert!(matches!(parse_line("!:mime", 9), Err(Error::MissingField { lineno: 9 })));
    }

    #[test]
    fn escape_decoding() {
        assert_eq!(decode_string(r"a\nb"), b"a\nb");
        assert_eq!(decode_string(r"\x7fELF"), b"\x7fELF");
        assert_eq!(decode_string(r"\0\1\377"), &[0, 1, 0o377]);
        assert_eq!(decode_string(r"\\"), b"\\");
        assert_eq!(decode_string(r"end\"), b"end\\");
        assert_eq!(decode_string(r"\q"), b"q");
        assert_eq!(decode_string(r"\x"), b"x");
    }
}
