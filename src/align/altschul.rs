//! Altschul-Erickson global alignment
//!
//! A global Gotoh variant whose traceback matrix stores seven edge flags per
//! cell instead of the packed direction byte: the diagonal edge, a close bit
//! for each gap plane (the plane's value reached the cell score), and an
//! open/extend pair for each plane recording how the plane value itself was
//! formed. A reverse post-pass drops the extend bit wherever the matching
//! open bit offers an equal-score exit and reduces multiple close bits to
//! one, so the backward walk reads a single canonical path. The score always
//! equals the Gotoh global kernel's; the cigar may differ under ties.

use super::gotoh::flag_matrix;
use super::{AlignError, AlignResult, Alignment, Scoring, MIN_SCORE};
use crate::cigar::CigarSequence;
use crate::ops::CigarOp;

const AE_DIAG: u8 = 0x01;
const AE_DEL_CLOSE: u8 = 0x02;
const AE_INS_CLOSE: u8 = 0x04;
const AE_DEL_EXT: u8 = 0x08;
const AE_DEL_OPEN: u8 = 0x10;
const AE_INS_EXT: u8 = 0x20;
const AE_INS_OPEN: u8 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plane {
    Main,
    Del,
    Ins,
}

pub(crate) fn global_full(
    reference: &[u8],
    query: &[u8],
    scoring: &Scoring,
    extended_cigar: bool,
) -> AlignResult<Alignment> {
    let n = reference.len();
    let m = query.len();
    let cols = m + 1;
    let mut tb = flag_matrix(n, m)?;
    let mut s = vec![0i32; m + 1];
    let mut d = vec![MIN_SCORE; m + 1];

    for j in 1..=m {
        s[j] = scoring.gap_open + (j as i32 - 1) * scoring.gap_extend;
        tb[j] = AE_INS_CLOSE | if j > 1 { AE_INS_EXT } else { AE_INS_OPEN };
    }
    for i in 1..=n {
        let mut diag = s[0];
        s[0] = scoring.gap_open + (i as i32 - 1) * scoring.gap_extend;
        tb[i * cols] = AE_DEL_CLOSE | if i > 1 { AE_DEL_EXT } else { AE_DEL_OPEN };
        let mut ins = MIN_SCORE;
        let rc = reference[i - 1];
        for j in 1..=m {
            let d_open = s[j] + scoring.gap_open;
            let d_ext = d[j] + scoring.gap_extend;
            let del = d_open.max(d_ext);
            let i_open = s[j - 1] + scoring.gap_open;
            let i_ext = ins + scoring.gap_extend;
            ins = i_open.max(i_ext);
            let mat = diag + scoring.substitution(rc, query[j - 1]);
            let cell = mat.max(del).max(ins);
            let mut flags = 0u8;
            if cell == mat {
                flags |= AE_DIAG;
            }
            if cell == del {
                flags |= AE_DEL_CLOSE;
            }
            if cell == ins {
                flags |= AE_INS_CLOSE;
            }
            if del == d_ext {
                flags |= AE_DEL_EXT;
            }
            if del == d_open {
                flags |= AE_DEL_OPEN;
            }
            if ins == i_ext {
                flags |= AE_INS_EXT;
            }
            if ins == i_open {
                flags |= AE_INS_OPEN;
            }
            tb[i * cols + j] = flags;
            diag = s[j];
            s[j] = cell;
            d[j] = del;
        }
    }
    let score = s[m];

    // Tie-resolution pass, walked in reverse: a gap continuation is
    // redundant wherever an equal-score opening exits the plane, and only
    // one close bit may survive per cell (diagonal > deletion > insertion).
    for flags in tb.iter_mut().rev() {
        if *flags & AE_DEL_OPEN != 0 {
            *flags &= !AE_DEL_EXT;
        }
        if *flags & AE_INS_OPEN != 0 {
            *flags &= !AE_INS_EXT;
        }
        if *flags & AE_DIAG != 0 {
            *flags &= !(AE_DEL_CLOSE | AE_INS_CLOSE);
        } else if *flags & AE_DEL_CLOSE != 0 {
            *flags &= !AE_INS_CLOSE;
        }
    }

    let mut cigar = CigarSequence::new();
    let mut i = n;
    let mut j = m;
    let mut plane = Plane::Main;
    loop {
        let flags = tb[i * cols + j];
        match plane {
            Plane::Main => {
                if flags & AE_DIAG != 0 {
                    if i == 0 || j == 0 {
                        return Err(AlignError::InvalidEditOperation(i, j));
                    }
                    let op = if extended_cigar {
                        if reference[i - 1] == query[j - 1] {
                            CigarOp::SeqMatch
                        } else {
                            CigarOp::SeqMismatch
                        }
                    } else {
                        CigarOp::Match
                    };
                    cigar.push(op, 1)?;
                    i -= 1;
                    j -= 1;
                } else if flags & AE_DEL_CLOSE != 0 {
                    plane = Plane::Del;
                } else if flags & AE_INS_CLOSE != 0 {
                    plane = Plane::Ins;
                } else {
                    break;
                }
            }
            Plane::Del => {
                if i == 0 {
                    return Err(AlignError::InvalidEditOperation(i, j));
                }
                cigar.push(CigarOp::Deletion, 1)?;
                i -= 1;
                if flags & AE_DEL_EXT != 0 {
                    // run continues in the deletion plane
                } else if flags & AE_DEL_OPEN != 0 {
                    plane = Plane::Main;
                } else {
                    return Err(AlignError::InvalidEditOperation(i, j));
                }
            }
            Plane::Ins => {
                if j == 0 {
                    return Err(AlignError::InvalidEditOperation(i, j));
                }
                cigar.push(CigarOp::Insertion, 1)?;
                j -= 1;
                if flags & AE_INS_EXT != 0 {
                    // run continues in the insertion plane
                } else if flags & AE_INS_OPEN != 0 {
                    plane = Plane::Main;
                } else {
                    return Err(AlignError::InvalidEditOperation(i, j));
                }
            }
        }
    }
    cigar.reverse();

    Ok(Alignment {
        reference: reference.to_vec(),
        ref_start: Some(i),
        ref_stop: n,
        query: query.to_vec(),
        query_start: Some(j),
        query_stop: m,
        cigar: Some(cigar),
        score,
    })
}
