//! The parsed data model: everything the grammar parser produces and the evaluator consumes.

use core::fmt;

use bitflags::bitflags;
use scry_core::prelude::*;

/// Byte order a typed field is read with. `Middle` is the PDP-11 halfword-swapped order and only
/// applies to 4-byte reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Native,
    Little,
    Big,
    Middle,
}

impl Endianness {
    /// The plain byte order for two's-complement reads. Middle-endian reads are assembled by the
    /// evaluator from raw bytes, so they never reach this mapping in a meaningful way.
    #[inline]
    #[must_use]
    pub fn byte_order(self) -> Endian {
        match self {
            Endianness::Native => Endian::default(),
            Endianness::Little | Endianness::Middle => Endian::Little,
            Endianness::Big => Endian::Big,
        }
    }
}

/// What family of test a record performs. Date variants evaluate as their underlying unsigned
/// integers; formatting them as calendar dates is left to future work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TypeKind {
    Integer { signed: bool },
    Float,
    Double,
    Date,
    String,
    PString,
}

impl TypeKind {
    #[inline]
    #[must_use]
    pub fn is_string(self) -> bool {
        matches!(self, TypeKind::String | TypeKind::PString)
    }
}

/// A fully resolved test type: kind, byte order, field width in bytes (0 for string kinds, whose
/// width comes from the test datum), and any string modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSpec {
    pub kind: TypeKind,
    pub endian: Endianness,
    pub width: usize,
    pub modifiers: StringModifiers,
}

/// Field width of a pointer read for an indirect offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Byte,
    Short,
    Long,
    Double,
}

/// How the pointer value of an indirect offset is read from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerType {
    pub kind: PointerKind,
    pub endian: Endianness,
}

impl Default for PointerType {
    /// An omitted itype defaults to a little-endian long.
    #[inline]
    fn default() -> Self {
        Self { kind: PointerKind::Long, endian: Endianness::Little }
    }
}

/// Where in the file a record's test field lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetSpec {
    /// A literal absolute offset.
    Direct(u64),
    /// Read a pointer of `pointer` type at absolute offset `base`, add `adjust`, and use the
    /// result as the test offset.
    Indirect { base: u64, pointer: PointerType, adjust: Option<i64> },
}

impl fmt::Display for OffsetSpec {
    /// Renders the canonical textual form, which re-parses to the same structure.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffsetSpec::Direct(offset) => write!(f, "{offset}"),
            OffsetSpec::Indirect { base, pointer, adjust } => {
                let code = match (pointer.kind, pointer.endian) {
                    (PointerKind::Byte, _) => 'b',
                    (PointerKind::Short, Endianness::Big) => 'S',
                    (PointerKind::Short, _) => 's',
                    (PointerKind::Long, Endianness::Big) => 'L',
                    (PointerKind::Long, _) => 'l',
                    (PointerKind::Double, Endianness::Big) => 'E',
                    (PointerKind::Double, _) => 'e',
                };
                write!(f, "({base}.{code}")?;
                if let Some(adjust) = adjust {
                    write!(f, "{adjust:+}")?;
                }
                write!(f, ")")
            }
        }
    }
}

bitflags! {
    /// Comparison operators, set by the prefix of the test-data field. Flags are additive: each
    /// set relation contributes its own verdict and the verdicts are OR-ed, then `NEGATE`
    /// inverts the combined result. An empty prefix means `EQUAL`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CompareOp: u8 {
        const EQUAL = 1 << 0;
        const LESS = 1 << 1;
        const GREATER = 1 << 2;
        const BITS_SET = 1 << 3;
        const BITS_CLEAR = 1 << 4;
        const BITS_NEGATE = 1 << 5;
        const ALWAYS = 1 << 6;
        const NEGATE = 1 << 7;
    }
}

bitflags! {
    /// Modifiers for string tests, parsed from the `/` suffix of the type field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StringModifiers: u8 {
        /// Compare case-insensitively (ASCII).
        const CASE_FOLD = 1 << 0;
        /// Treat any run of blanks in the file as a single blank.
        const COMPACT_WHITESPACE = 1 << 1;
        /// Force binary-file treatment. Parsed and carried; comparison is bytewise either way.
        const BINARY = 1 << 2;
        /// Force text-file treatment. Parsed and carried; comparison is bytewise either way.
        const TEXT = 1 << 3;
    }
}

/// The typed literal a record compares the field against.
#[derive(Debug, Clone, PartialEq)]
pub enum TestValue {
    Unsigned(u64),
    Float(f64),
    Bytes(Vec<u8>),
}

/// One parsed test line from the magic database, with any child refinements attached by the
/// forest builder. Immutable once the forest is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureRecord {
    /// Nesting depth, from the run of leading `>` markers.
    pub level: u32,
    pub offset: OffsetSpec,
    pub test_type: TypeSpec,
    /// AND-ed onto the field before comparison (numeric tests only).
    pub mask: Option<u64>,
    pub compare: CompareOp,
    pub datum: TestValue,
    /// Appended to the output on match; may contain printf-style placeholders.
    pub description: String,
    /// Attached by a `!:mime` annotation line.
    pub mime: Option<String>,
    pub children: Vec<SignatureRecord>,
}
