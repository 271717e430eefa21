//! Packed run-length CIGAR sequences
//!
//! A `CigarSequence` stores (operation, count) runs as 32-bit words with the
//! count in the upper 28 bits and the operation code in the lower 4 bits,
//! bit-compatible with the words found in aligned-read binary records.
//! Every append, extend, and parse coalesces a run into its predecessor when
//! the operation codes match, so adjacent runs never share a code.

use crate::ops::{CigarError, CigarOp, CigarResult, OpId};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

const OP_BITS: u32 = 4;
const OP_MASK: u32 = 0xf;

#[inline]
fn pack(op: CigarOp, count: u32) -> u32 {
    (count << OP_BITS) | op.bin_code()
}

#[inline]
fn word_op(word: u32) -> CigarOp {
    // Constructors validate codes, so the index is always in range.
    CigarOp::ALL[(word & OP_MASK) as usize]
}

#[inline]
fn word_count(word: u32) -> u32 {
    word >> OP_BITS
}

/// A mutable run-length sequence of CIGAR operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CigarSequence {
    words: Vec<u32>,
}

impl Default for CigarSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl CigarSequence {
    /// Create an empty sequence. Small CIGARs fit the initial four-word
    /// reservation without reallocating.
    pub fn new() -> Self {
        Self {
            words: Vec::with_capacity(4),
        }
    }

    /// Parse a CIGAR byte string such as `b"150M3I5D"`. A bare operation
    /// character means count 1; zero-count runs are dropped.
    pub fn parse_bytes(text: &[u8]) -> CigarResult<Self> {
        let mut cigar = Self::new();
        let mut count: u32 = 0;
        let mut have_digits = false;
        for &b in text {
            if b.is_ascii_digit() {
                count = count * 10 + u32::from(b - b'0');
                have_digits = true;
            } else {
                let op = CigarOp::from_char(b)?;
                cigar.push(op, if have_digits { count } else { 1 })?;
                count = 0;
                have_digits = false;
            }
        }
        if have_digits {
            return Err(CigarError::TrailingDigits(
                String::from_utf8_lossy(text).into_owned(),
            ));
        }
        Ok(cigar)
    }

    /// Build from packed binary words.
    pub fn from_words(words: &[u32]) -> CigarResult<Self> {
        let mut cigar = Self::new();
        cigar.extend_from_words(words)?;
        Ok(cigar)
    }

    /// Append packed binary words. Incoming words are trusted to be
    /// normalized (as produced by aligned-read records) and are copied
    /// verbatim, except that the first incoming word folds into the current
    /// tail run when their operation codes match. Counts are trusted to stay
    /// within 28 bits.
    pub fn extend_from_words(&mut self, words: &[u32]) -> CigarResult<()> {
        for &word in words {
            CigarOp::from_bin(word & OP_MASK)?;
        }
        let mut rest = words;
        if let (Some(&first), Some(tail)) = (words.first(), self.words.last_mut()) {
            if *tail & OP_MASK == first & OP_MASK {
                *tail += first & !OP_MASK;
                rest = &words[1..];
            }
        }
        self.words
            .try_reserve(rest.len())
            .map_err(|_| CigarError::OutOfMemory)?;
        self.words.extend_from_slice(rest);
        Ok(())
    }

    /// Read `n_words` little-endian 32-bit packed words from a binary CIGAR
    /// buffer.
    pub fn read_binary<R: Read>(mut reader: R, n_words: usize) -> CigarResult<Self> {
        let mut words = Vec::new();
        words
            .try_reserve_exact(n_words)
            .map_err(|_| CigarError::OutOfMemory)?;
        for _ in 0..n_words {
            words.push(reader.read_u32::<LittleEndian>()?);
        }
        Self::from_words(&words)
    }

    /// Write the packed words as little-endian 32-bit values.
    pub fn write_binary<W: Write>(&self, mut writer: W) -> CigarResult<()> {
        for &word in &self.words {
            writer.write_u32::<LittleEndian>(word)?;
        }
        Ok(())
    }

    /// The little-endian byte serialization of the packed words.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.words.len() * 4);
        for &word in &self.words {
            buf.extend_from_slice(&word.to_le_bytes());
        }
        buf
    }

    /// Build from (operation identifier, count) pairs, decoding each
    /// identifier polymorphically.
    pub fn from_pairs<'a, I>(pairs: I) -> CigarResult<Self>
    where
        I: IntoIterator<Item = (OpId<'a>, u32)>,
    {
        let mut cigar = Self::new();
        for (id, count) in pairs {
            cigar.push(id.resolve()?, count)?;
        }
        Ok(cigar)
    }

    /// Append a run, folding it into the tail run when the operations match.
    /// A zero count is a no-op.
    pub fn push(&mut self, op: CigarOp, count: u32) -> CigarResult<()> {
        if count == 0 {
            return Ok(());
        }
        if let Some(tail) = self.words.last_mut() {
            if *tail & OP_MASK == op.bin_code() {
                *tail += count << OP_BITS;
                return Ok(());
            }
        }
        self.words
            .try_reserve(1)
            .map_err(|_| CigarError::OutOfMemory)?;
        self.words.push(pack(op, count));
        Ok(())
    }

    /// Append every run of another sequence, coalescing at the boundary.
    pub fn extend_from(&mut self, other: &CigarSequence) -> CigarResult<()> {
        for (op, count) in other.iter() {
            self.push(op, count)?;
        }
        Ok(())
    }

    /// Remove and return the last run.
    pub fn pop(&mut self) -> CigarResult<(CigarOp, u32)> {
        match self.words.pop() {
            Some(word) => Ok((word_op(word), word_count(word))),
            None => Err(CigarError::EmptySequence),
        }
    }

    /// Reverse the run order in place. A normalized sequence stays
    /// normalized under reversal.
    pub fn reverse(&mut self) {
        self.words.reverse();
    }

    /// Extract runs `start..stop` with the given step into a new sequence.
    /// For a negative step the walk runs downward from `start`, with `stop`
    /// still exclusive. The original words are copied as-is; a slice with
    /// |step| != 1 may therefore hold adjacent runs with equal codes.
    ///
    /// Panics if `step == 0`, like `Iterator::step_by`.
    pub fn slice(&self, start: usize, stop: usize, step: isize) -> CigarSequence {
        assert!(step != 0, "slice step cannot be zero");
        let len = self.words.len();
        let mut words = Vec::new();
        if step > 0 {
            let stop = stop.min(len);
            let mut i = start;
            while i < stop {
                words.push(self.words[i]);
                i += step as usize;
            }
        } else if len > 0 {
            let mut i = start.min(len - 1) as isize;
            while i > stop as isize {
                words.push(self.words[i as usize]);
                i += step;
            }
        }
        CigarSequence { words }
    }

    /// Replace runs `start..stop` with the runs of `replacement`, verbatim.
    pub fn splice(&mut self, start: usize, stop: usize, replacement: &CigarSequence) {
        let stop = stop.min(self.words.len());
        let start = start.min(stop);
        self.words
            .splice(start..stop, replacement.words.iter().copied());
    }

    /// Produce the reverse-role sequence (reference and query swapped).
    ///
    /// Hard and soft clips are stripped from the body; the first stripped
    /// soft clip is returned as `s_left`, any later ones accumulate into
    /// `s_right`. Remaining operations are replaced by their inverses.
    /// `left_clip` and `right_clip` bracket the result with fresh soft-clip
    /// runs; negative counts fail.
    pub fn invert(
        &self,
        left_clip: i64,
        right_clip: i64,
    ) -> CigarResult<(CigarSequence, u32, u32)> {
        if left_clip < 0 {
            return Err(CigarError::InvalidClip(left_clip));
        }
        if right_clip < 0 {
            return Err(CigarError::InvalidClip(right_clip));
        }
        let mut inverted = CigarSequence::new();
        inverted.push(CigarOp::SoftClip, left_clip as u32)?;
        let mut s_left = 0u32;
        let mut s_right = 0u32;
        let mut seen_soft = false;
        for (op, count) in self.iter() {
            match op {
                CigarOp::HardClip => {}
                CigarOp::SoftClip => {
                    if seen_soft {
                        s_right += count;
                    } else {
                        s_left = count;
                        seen_soft = true;
                    }
                }
                other => inverted.push(other.inverse()?, count)?,
            }
        }
        inverted.push(CigarOp::SoftClip, right_clip as u32)?;
        Ok((inverted, s_left, s_right))
    }

    /// Rewrite every SKIPPED run into a SOFT_CLIP run in place, keeping the
    /// counts and the run boundaries untouched.
    pub fn convert_n_to_s(&mut self) {
        for word in &mut self.words {
            if *word & OP_MASK == CigarOp::Skipped.bin_code() {
                *word = (*word & !OP_MASK) | CigarOp::SoftClip.bin_code();
            }
        }
    }

    /// Total base count carried by runs of the given operation.
    pub fn count(&self, op: CigarOp) -> u64 {
        self.iter()
            .filter(|&(o, _)| o == op)
            .map(|(_, n)| u64::from(n))
            .sum()
    }

    /// Length of the gapped alignment: the counts of every run consuming
    /// reference or read bases, with soft clips included only on request.
    pub fn gapped_len(&self, include_soft_clip: bool) -> u64 {
        self.iter()
            .map(|(op, n)| match op {
                CigarOp::SoftClip if !include_soft_clip => 0,
                op if op.consumes_ref() || op.consumes_read() => u64::from(n),
                _ => 0,
            })
            .sum()
    }

    /// Reference bases consumed. With `query_bases` set, a run whose read
    /// contribution would meet or exceed the cap is counted only for the
    /// portion that fits and the walk stops there.
    pub fn ref_len(&self, query_bases: Option<u64>) -> u64 {
        let mut ref_total = 0u64;
        let mut read_total = 0u64;
        for (op, n) in self.iter() {
            let n = u64::from(n);
            let ref_c = if op.consumes_ref() { n } else { 0 };
            let read_c = if op.consumes_read() { n } else { 0 };
            if let Some(cap) = query_bases {
                if read_total + read_c >= cap {
                    let fits = cap - read_total;
                    return ref_total + ref_c.min(fits);
                }
            }
            ref_total += ref_c;
            read_total += read_c;
        }
        ref_total
    }

    /// Read bases consumed, the mirror of [`ref_len`](Self::ref_len): soft
    /// clips count only on request, and with `ref_bases` set the walk stops
    /// at the run whose reference contribution meets the cap, counting only
    /// the portion that fits.
    pub fn query_len(&self, ref_bases: Option<u64>, include_soft_clip: bool) -> u64 {
        let mut read_total = 0u64;
        let mut ref_total = 0u64;
        for (op, n) in self.iter() {
            let n = u64::from(n);
            let ref_c = if op.consumes_ref() { n } else { 0 };
            let read_c = if op.consumes_read() && (op != CigarOp::SoftClip || include_soft_clip)
            {
                n
            } else {
                0
            };
            if let Some(cap) = ref_bases {
                if ref_total + ref_c >= cap {
                    let fits = cap - ref_total;
                    return read_total + read_c.min(fits);
                }
            }
            read_total += read_c;
            ref_total += ref_c;
        }
        read_total
    }

    /// Number of runs
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Iterate over (operation, count) runs.
    pub fn iter(&self) -> impl Iterator<Item = (CigarOp, u32)> + '_ {
        self.words.iter().map(|&w| (word_op(w), word_count(w)))
    }

    /// The raw packed words
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Runs as (binary code, count) pairs
    pub fn to_pairs(&self) -> Vec<(u32, u32)> {
        self.words
            .iter()
            .map(|&w| (w & OP_MASK, word_count(w)))
            .collect()
    }

    /// Runs as (operation, count) pairs
    pub fn to_op_pairs(&self) -> Vec<(CigarOp, u32)> {
        self.iter().collect()
    }
}

impl fmt::Display for CigarSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (op, count) in self.iter() {
            write!(f, "{}{}", count, op.code_char() as char)?;
        }
        Ok(())
    }
}

impl FromStr for CigarSequence {
    type Err = CigarError;

    fn from_str(s: &str) -> CigarResult<Self> {
        Self::parse_bytes(s.as_bytes())
    }
}

/// Expand a basic CIGAR into the extended form: every MATCH run is split
/// base-by-base into SEQ_MATCH / SEQ_MISMATCH runs against the given
/// sequences, all other runs are copied unchanged. `ref_start` and
/// `query_start` offset the comparison into the supplied slices.
pub fn cigar_to_extended(
    cigar: &CigarSequence,
    reference: &[u8],
    query: &[u8],
    ref_start: usize,
    query_start: usize,
) -> CigarResult<CigarSequence> {
    let mut out = CigarSequence::new();
    let mut ri = ref_start;
    let mut qi = query_start;
    for (op, count) in cigar.iter() {
        let n = count as usize;
        if op.consumes_ref() && ri + n > reference.len() {
            return Err(CigarError::LengthMismatch {
                side: "reference",
                required: (ri + n) as u64,
                available: reference.len() as u64,
            });
        }
        if op.consumes_read() && qi + n > query.len() {
            return Err(CigarError::LengthMismatch {
                side: "query",
                required: (qi + n) as u64,
                available: query.len() as u64,
            });
        }
        match op {
            CigarOp::Match => {
                for k in 0..n {
                    let kind = if reference[ri + k] == query[qi + k] {
                        CigarOp::SeqMatch
                    } else {
                        CigarOp::SeqMismatch
                    };
                    out.push(kind, 1)?;
                }
            }
            other => out.push(other, count)?,
        }
        if op.consumes_ref() {
            ri += n;
        }
        if op.consumes_read() {
            qi += n;
        }
    }
    Ok(out)
}
