//! Pairwise alignment engine
//!
//! Gotoh affine-gap dynamic programming over a reference and a query under
//! four scoring regimes (global, local, glocal, local-global), plus the
//! Altschul-Erickson global variant with a tie-resolving traceback.

use crate::cigar::CigarSequence;
use crate::ops::{CigarError, CigarOp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub(crate) mod altschul;
pub(crate) mod gotoh;

/// Errors that can occur during alignment
#[derive(Debug, Error)]
pub enum AlignError {
    #[error("invalid scoring: {0}")]
    InvalidScoring(String),

    #[error("invalid alignment mode: {0:?}")]
    InvalidMode(String),

    #[error("traceback produced an invalid edit operation at ({0}, {1})")]
    InvalidEditOperation(usize, usize),

    #[error("out of memory allocating alignment matrices")]
    OutOfMemory,

    #[error(transparent)]
    Cigar(#[from] CigarError),
}

pub type AlignResult<T> = Result<T, AlignError>;

/// Sentinel seeding forbidden gap states. Far enough above `i32::MIN` that
/// adding two gap penalties still stays below every reachable score.
pub const MIN_SCORE: i32 = i32::MIN + 1_000_000;

/// Scoring parameters for the affine gap model: a gap of length k costs
/// `gap_open + (k - 1) * gap_extend`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scoring {
    /// Score for a matching base pair
    pub match_score: i32,
    /// Penalty for a mismatching base pair
    pub mismatch_penalty: i32,
    /// Penalty opening a gap run
    pub gap_open: i32,
    /// Penalty extending a gap run by one base
    pub gap_extend: i32,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            match_score: 10,
            mismatch_penalty: -9,
            gap_open: -15,
            gap_extend: -6,
        }
    }
}

impl Scoring {
    pub fn new(match_score: i32, mismatch_penalty: i32, gap_open: i32, gap_extend: i32) -> Self {
        Self {
            match_score,
            mismatch_penalty,
            gap_open,
            gap_extend,
        }
    }

    /// Check the parameter preconditions shared by every kernel.
    pub fn validate(&self) -> AlignResult<()> {
        if self.match_score <= self.mismatch_penalty {
            return Err(AlignError::InvalidScoring(format!(
                "match score {} must exceed mismatch penalty {}",
                self.match_score, self.mismatch_penalty
            )));
        }
        if self.match_score <= self.gap_open {
            return Err(AlignError::InvalidScoring(format!(
                "match score {} must exceed gap open {}",
                self.match_score, self.gap_open
            )));
        }
        if self.match_score <= self.gap_extend {
            return Err(AlignError::InvalidScoring(format!(
                "match score {} must exceed gap extend {}",
                self.match_score, self.gap_extend
            )));
        }
        if self.gap_open > self.gap_extend {
            return Err(AlignError::InvalidScoring(format!(
                "gap open {} must not exceed gap extend {}",
                self.gap_open, self.gap_extend
            )));
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn substitution(&self, a: u8, b: u8) -> i32 {
        if a == b {
            self.match_score
        } else {
            self.mismatch_penalty
        }
    }
}

/// The alignment scoring regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    /// Needleman-Wunsch: both sequences consumed end to end
    Global,
    /// Smith-Waterman: best-scoring subsequence pair, scores floored at 0
    Local,
    /// Free leading gaps on both sequences; the path ends wherever the last
    /// row or column scores best
    Glocal,
    /// Glocal boundaries, but the path is forced to end at the far corner
    LocalGlobal,
}

impl AlignmentMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            AlignmentMode::Global => "global",
            AlignmentMode::Local => "local",
            AlignmentMode::Glocal => "glocal",
            AlignmentMode::LocalGlobal => "local_global",
        }
    }
}

impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlignmentMode {
    type Err = AlignError;

    fn from_str(s: &str) -> AlignResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(AlignmentMode::Global),
            "local" => Ok(AlignmentMode::Local),
            "glocal" => Ok(AlignmentMode::Glocal),
            "local_global" => Ok(AlignmentMode::LocalGlobal),
            _ => Err(AlignError::InvalidMode(s.to_string())),
        }
    }
}

/// Per-call options for the alignment entry point
#[derive(Debug, Clone, Default)]
pub struct AlignOptions {
    /// Skip the traceback matrix and report only the score and end
    /// coordinates
    pub score_only: bool,
    /// Emit `=`/`X` instead of `M`
    pub extended_cigar: bool,
    /// Bracket local/glocal cigars with soft clips covering the unaligned
    /// query prefix and suffix
    pub soft_clip: bool,
}

/// A pairwise alignment. Score-only kernels leave the start coordinates and
/// the cigar unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub reference: Vec<u8>,
    pub ref_start: Option<usize>,
    pub ref_stop: usize,
    pub query: Vec<u8>,
    pub query_start: Option<usize>,
    pub query_stop: usize,
    pub cigar: Option<CigarSequence>,
    pub score: i32,
}

impl Alignment {
    /// Fraction of aligned columns (matches, mismatches, and gaps) that are
    /// matches. Zero for score-only alignments.
    pub fn identity(&self) -> f64 {
        let (Some(cigar), Some(ref_start), Some(query_start)) =
            (&self.cigar, self.ref_start, self.query_start)
        else {
            return 0.0;
        };
        let mut ri = ref_start;
        let mut qi = query_start;
        let mut matches = 0u64;
        let mut columns = 0u64;
        for (op, count) in cigar.iter() {
            let n = count as usize;
            match op {
                CigarOp::Match => {
                    for k in 0..n {
                        if self.reference[ri + k] == self.query[qi + k] {
                            matches += 1;
                        }
                    }
                    columns += count as u64;
                }
                CigarOp::SeqMatch => {
                    matches += count as u64;
                    columns += count as u64;
                }
                CigarOp::SeqMismatch | CigarOp::Insertion | CigarOp::Deletion => {
                    columns += count as u64;
                }
                _ => {}
            }
            if op.consumes_ref() {
                ri += n;
            }
            if op.consumes_read() {
                qi += n;
            }
        }
        if columns == 0 {
            0.0
        } else {
            matches as f64 / columns as f64
        }
    }

    /// Three-line gapped rendering of the aligned region: reference line,
    /// glyph line (`|` match, `.` mismatch, space on gaps), query line.
    pub fn pretty(&self) -> String {
        let (Some(cigar), Some(ref_start), Some(query_start)) =
            (&self.cigar, self.ref_start, self.query_start)
        else {
            return String::new();
        };
        let mut r_line = String::new();
        let mut g_line = String::new();
        let mut q_line = String::new();
        let mut ri = ref_start;
        let mut qi = query_start;
        for (op, count) in cigar.iter() {
            let n = count as usize;
            match op {
                CigarOp::Match | CigarOp::SeqMatch | CigarOp::SeqMismatch => {
                    for k in 0..n {
                        let (rc, qc) = (self.reference[ri + k], self.query[qi + k]);
                        r_line.push(rc as char);
                        g_line.push(if rc == qc { '|' } else { '.' });
                        q_line.push(qc as char);
                    }
                }
                CigarOp::Deletion | CigarOp::Skipped => {
                    for k in 0..n {
                        r_line.push(self.reference[ri + k] as char);
                        g_line.push(' ');
                        q_line.push('-');
                    }
                }
                CigarOp::Insertion => {
                    for k in 0..n {
                        r_line.push('-');
                        g_line.push(' ');
                        q_line.push(self.query[qi + k] as char);
                    }
                }
                // Clips and padding are not part of the aligned region.
                _ => {}
            }
            if op.consumes_ref() {
                ri += n;
            }
            if op.consumes_read() {
                qi += n;
            }
        }
        format!("{r_line}\n{g_line}\n{q_line}")
    }
}

/// Align `query` against `reference`, dispatching on the mode and the
/// `score_only` flag.
pub fn align(
    reference: &[u8],
    query: &[u8],
    mode: AlignmentMode,
    scoring: &Scoring,
    options: &AlignOptions,
) -> AlignResult<Alignment> {
    scoring.validate()?;
    if options.score_only {
        match mode {
            AlignmentMode::Global => gotoh::global_score(reference, query, scoring),
            AlignmentMode::Local => gotoh::local_score(reference, query, scoring),
            AlignmentMode::Glocal => gotoh::glocal_score(reference, query, scoring, false),
            AlignmentMode::LocalGlobal => gotoh::glocal_score(reference, query, scoring, true),
        }
    } else {
        match mode {
            AlignmentMode::Global => gotoh::global_full(reference, query, scoring, options),
            AlignmentMode::Local => gotoh::local_full(reference, query, scoring, options),
            AlignmentMode::Glocal => gotoh::glocal_full(reference, query, scoring, options, false),
            AlignmentMode::LocalGlobal => {
                gotoh::glocal_full(reference, query, scoring, options, true)
            }
        }
    }
}

/// Global alignment via the Altschul-Erickson traceback encoding. The score
/// always equals the Gotoh global kernel's; under scoring ties the cigar is
/// the unique canonical path rather than the Gotoh tie-break choice.
pub fn align_altschul_erickson(
    reference: &[u8],
    query: &[u8],
    scoring: &Scoring,
    extended_cigar: bool,
) -> AlignResult<Alignment> {
    scoring.validate()?;
    altschul::global_full(reference, query, scoring, extended_cigar)
}

/// Build an [`Alignment`] from an externally produced CIGAR, validating that
/// its consumption fits both sequences from the given start coordinates.
pub fn cigar_alignment(
    reference: &[u8],
    query: &[u8],
    cigar: &CigarSequence,
    ref_start: usize,
    query_start: usize,
    score: i32,
) -> AlignResult<Alignment> {
    let ref_used = cigar.ref_len(None) as usize;
    let query_used = cigar.query_len(None, true) as usize;
    if ref_start + ref_used > reference.len() {
        return Err(CigarError::LengthMismatch {
            side: "reference",
            required: (ref_start + ref_used) as u64,
            available: reference.len() as u64,
        }
        .into());
    }
    if query_start + query_used > query.len() {
        return Err(CigarError::LengthMismatch {
            side: "query",
            required: (query_start + query_used) as u64,
            available: query.len() as u64,
        }
        .into());
    }
    Ok(Alignment {
        reference: reference.to_vec(),
        ref_start: Some(ref_start),
        ref_stop: ref_start + ref_used,
        query: query.to_vec(),
        query_start: Some(query_start),
        query_stop: query_start + query_used,
        cigar: Some(cigar.clone()),
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scoring_is_valid() {
        assert!(Scoring::default().validate().is_ok());
    }

    #[test]
    fn test_scoring_preconditions() {
        let bad = [
            Scoring::new(-9, -9, -15, -6),
            Scoring::new(10, 11, -15, -6),
            Scoring::new(10, -9, 10, -6),
            Scoring::new(10, -9, -15, 10),
            Scoring::new(10, -9, -5, -6),
        ];
        for scoring in bad {
            assert!(matches!(
                scoring.validate(),
                Err(AlignError::InvalidScoring(_))
            ));
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "GLOBAL".parse::<AlignmentMode>().unwrap(),
            AlignmentMode::Global
        );
        assert_eq!(
            "local".parse::<AlignmentMode>().unwrap(),
            AlignmentMode::Local
        );
        assert_eq!(
            "Glocal".parse::<AlignmentMode>().unwrap(),
            AlignmentMode::Glocal
        );
        assert_eq!(
            "Local_Global".parse::<AlignmentMode>().unwrap(),
            AlignmentMode::LocalGlobal
        );
        assert!(matches!(
            "semiglobal".parse::<AlignmentMode>(),
            Err(AlignError::InvalidMode(_))
        ));
        assert_eq!(AlignmentMode::LocalGlobal.to_string(), "local_global");
    }

    #[test]
    fn test_cigar_alignment_checks_consumption() {
        let cigar: CigarSequence = "4M2D".parse().unwrap();
        let aln = cigar_alignment(b"ACGTAC", b"ACGT", &cigar, 0, 0, 13).unwrap();
        assert_eq!(aln.ref_stop, 6);
        assert_eq!(aln.query_stop, 4);
        assert_eq!(aln.score, 13);

        assert!(matches!(
            cigar_alignment(b"ACGTA", b"ACGT", &cigar, 0, 0, 13),
            Err(AlignError::Cigar(CigarError::LengthMismatch { .. }))
        ));
        assert!(matches!(
            cigar_alignment(b"ACGTAC", b"ACG", &cigar, 0, 0, 13),
            Err(AlignError::Cigar(CigarError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn test_identity_and_pretty() {
        let cigar: CigarSequence = "2M1D1M".parse().unwrap();
        let aln = cigar_alignment(b"ACGT", b"ACT", &cigar, 0, 0, 0).unwrap();
        assert!((aln.identity() - 0.75).abs() < 1e-9);
        assert_eq!(aln.pretty(), "ACGT\n|| |\nAC-T");
    }
}
