//! gapalign core library
//!
//! Affine-gap pairwise alignment (Gotoh kernels plus the Altschul-Erickson
//! global variant) and a packed run-length CIGAR toolkit.

pub mod align;
pub mod cigar;
pub mod ops;

// Re-export commonly used types and functions
pub use align::{
    align, align_altschul_erickson, cigar_alignment, AlignError, AlignOptions, AlignResult,
    Alignment, AlignmentMode, Scoring, MIN_SCORE,
};
pub use cigar::{cigar_to_extended, CigarSequence};
pub use ops::{CigarError, CigarOp, CigarResult, OpId};

/// Version information for the gapalign core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
