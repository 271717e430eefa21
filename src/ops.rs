//! CIGAR operation registry
//!
//! The nine alignment operations as a closed descriptor set, with lookups by
//! symbol character, by binary code, and by descriptor identity. The binary
//! codes 0..=8 match the packed encoding used by aligned-read binary formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur in the CIGAR subsystem
#[derive(Debug, Error)]
pub enum CigarError {
    #[error("unknown CIGAR operator: {0}")]
    NotFound(String),

    #[error("invalid operator type: {0}")]
    InvalidOperatorType(String),

    #[error("CIGAR string ends in trailing digits: {0:?}")]
    TrailingDigits(String),

    #[error("operator {0} has no defined inverse")]
    UnsupportedInverse(CigarOp),

    #[error("pop from an empty CIGAR sequence")]
    EmptySequence,

    #[error("negative clip count: {0}")]
    InvalidClip(i64),

    #[error("CIGAR overruns the {side} sequence: needs {required} bases, {available} available")]
    LengthMismatch {
        side: &'static str,
        required: u64,
        available: u64,
    },

    #[error("out of memory growing CIGAR buffer")]
    OutOfMemory,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CigarResult<T> = Result<T, CigarError>;

/// An alignment edit operation. The discriminant is the operation's binary
/// code in the packed 32-bit word encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CigarOp {
    Match = 0,
    Insertion = 1,
    Deletion = 2,
    Skipped = 3,
    SoftClip = 4,
    HardClip = 5,
    Padding = 6,
    SeqMatch = 7,
    SeqMismatch = 8,
}

impl CigarOp {
    /// All nine operations, indexed by binary code.
    pub const ALL: [CigarOp; 9] = [
        CigarOp::Match,
        CigarOp::Insertion,
        CigarOp::Deletion,
        CigarOp::Skipped,
        CigarOp::SoftClip,
        CigarOp::HardClip,
        CigarOp::Padding,
        CigarOp::SeqMatch,
        CigarOp::SeqMismatch,
    ];

    /// Human-readable descriptor name
    pub const fn name(self) -> &'static str {
        match self {
            CigarOp::Match => "MATCH",
            CigarOp::Insertion => "INSERTION",
            CigarOp::Deletion => "DELETION",
            CigarOp::Skipped => "SKIPPED",
            CigarOp::SoftClip => "SOFT_CLIP",
            CigarOp::HardClip => "HARD_CLIP",
            CigarOp::Padding => "PADDING",
            CigarOp::SeqMatch => "SEQ_MATCH",
            CigarOp::SeqMismatch => "SEQ_MISMATCH",
        }
    }

    /// One-byte operation symbol as used in CIGAR strings
    pub const fn code_char(self) -> u8 {
        match self {
            CigarOp::Match => b'M',
            CigarOp::Insertion => b'I',
            CigarOp::Deletion => b'D',
            CigarOp::Skipped => b'N',
            CigarOp::SoftClip => b'S',
            CigarOp::HardClip => b'H',
            CigarOp::Padding => b'P',
            CigarOp::SeqMatch => b'=',
            CigarOp::SeqMismatch => b'X',
        }
    }

    /// Binary code in the packed word encoding (0..=8)
    pub const fn bin_code(self) -> u32 {
        self as u32
    }

    /// Whether the operation consumes reference bases
    pub const fn consumes_ref(self) -> bool {
        matches!(
            self,
            CigarOp::Match
                | CigarOp::Deletion
                | CigarOp::Skipped
                | CigarOp::SeqMatch
                | CigarOp::SeqMismatch
        )
    }

    /// Whether the operation consumes read (query) bases
    pub const fn consumes_read(self) -> bool {
        matches!(
            self,
            CigarOp::Match
                | CigarOp::Insertion
                | CigarOp::SoftClip
                | CigarOp::SeqMatch
                | CigarOp::SeqMismatch
        )
    }

    /// Look up an operation by its CIGAR symbol
    pub fn from_char(symbol: u8) -> CigarResult<Self> {
        match symbol {
            b'M' => Ok(CigarOp::Match),
            b'I' => Ok(CigarOp::Insertion),
            b'D' => Ok(CigarOp::Deletion),
            b'N' => Ok(CigarOp::Skipped),
            b'S' => Ok(CigarOp::SoftClip),
            b'H' => Ok(CigarOp::HardClip),
            b'P' => Ok(CigarOp::Padding),
            b'=' => Ok(CigarOp::SeqMatch),
            b'X' => Ok(CigarOp::SeqMismatch),
            other => Err(CigarError::NotFound(format!(
                "character {:?}",
                other as char
            ))),
        }
    }

    /// Look up an operation by its binary code
    pub fn from_bin(code: u32) -> CigarResult<Self> {
        CigarOp::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| CigarError::NotFound(format!("binary code {code}")))
    }

    /// Look up an operation from a single-character byte string
    pub fn from_symbol(symbol: &[u8]) -> CigarResult<Self> {
        match symbol {
            [c] => Self::from_char(*c),
            other => Err(CigarError::NotFound(format!(
                "symbol {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// The operation describing the same edit with reference and query roles
    /// swapped. Only match-like and gap operations have one.
    pub fn inverse(self) -> CigarResult<Self> {
        match self {
            CigarOp::Match => Ok(CigarOp::Match),
            CigarOp::Insertion => Ok(CigarOp::Deletion),
            CigarOp::Deletion => Ok(CigarOp::Insertion),
            CigarOp::SeqMatch => Ok(CigarOp::SeqMatch),
            CigarOp::SeqMismatch => Ok(CigarOp::SeqMismatch),
            other => Err(CigarError::UnsupportedInverse(other)),
        }
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code_char() as char)
    }
}

/// Polymorphic operation identifier accepted at the API edge: an operation
/// value, a binary code, a symbol byte, or a one-byte symbol string. Decoded
/// once on entry; the internal representation is always the binary code.
#[derive(Debug, Clone, Copy)]
pub enum OpId<'a> {
    Op(CigarOp),
    Code(u32),
    Char(u8),
    Bytes(&'a [u8]),
}

impl OpId<'_> {
    pub fn resolve(self) -> CigarResult<CigarOp> {
        match self {
            OpId::Op(op) => Ok(op),
            OpId::Code(code) => CigarOp::from_bin(code),
            OpId::Char(symbol) => CigarOp::from_char(symbol),
            OpId::Bytes([symbol]) => CigarOp::from_char(*symbol),
            OpId::Bytes(other) => Err(CigarError::InvalidOperatorType(format!(
                "expected a single-byte symbol, got {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

impl From<CigarOp> for OpId<'static> {
    fn from(op: CigarOp) -> Self {
        OpId::Op(op)
    }
}

impl From<u32> for OpId<'static> {
    fn from(code: u32) -> Self {
        OpId::Code(code)
    }
}

impl From<u8> for OpId<'static> {
    fn from(symbol: u8) -> Self {
        OpId::Char(symbol)
    }
}

impl<'a> From<&'a [u8]> for OpId<'a> {
    fn from(symbol: &'a [u8]) -> Self {
        OpId::Bytes(symbol)
    }
}
