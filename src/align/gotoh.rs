//! Gotoh affine-gap kernels and traceback
//!
//! Five kernel variants: local, global, and glocal, each as a full
//! (traceback-recording) and a score-only loop; the glocal kernels also
//! serve local-global alignment by forcing the terminal cell to the far
//! corner. All kernels keep the running score row `S` and the deletion
//! plane `D` in O(m) vectors with the insertion plane as a scalar; the full
//! kernels additionally fill one contiguous row-major byte matrix of packed
//! traceback flags.

use super::{AlignError, AlignOptions, AlignResult, Alignment, Scoring, MIN_SCORE};
use crate::cigar::CigarSequence;
use crate::ops::CigarOp;

/// A deletion ending here achieved the cell score.
pub(crate) const TB_DEL: u8 = 0x01;
/// An insertion ending here achieved the cell score.
pub(crate) const TB_INS: u8 = 0x02;
/// The diagonal step achieved the cell score.
pub(crate) const TB_MATCH: u8 = 0x04;
/// The deletion plane reached this cell by extending, not opening.
pub(crate) const TB_NEXT_DEL: u8 = 0x08;
/// The insertion plane reached this cell by extending, not opening.
pub(crate) const TB_NEXT_INS: u8 = 0x10;

/// One contiguous (n+1)*(m+1) flag matrix, row-major.
pub(crate) fn flag_matrix(n: usize, m: usize) -> AlignResult<Vec<u8>> {
    let size = (n + 1) * (m + 1);
    let mut matrix = Vec::new();
    matrix
        .try_reserve_exact(size)
        .map_err(|_| AlignError::OutOfMemory)?;
    matrix.resize(size, 0);
    Ok(matrix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Match,
    Del,
    Ins,
}

/// Walk the flag matrix back from the terminal cell, emitting one edit
/// operation per step and coalescing as it goes.
///
/// Once a gap step is taken, the plane decision made where the gap base was
/// emitted (the `TB_NEXT_*` bit of that cell) is carried forward, so the
/// reconstructed run always follows the plane the score came from.
fn run_traceback(
    tb: &[u8],
    cols: usize,
    end_i: usize,
    end_j: usize,
    reference: &[u8],
    query: &[u8],
    options: &AlignOptions,
    global: bool,
) -> AlignResult<(CigarSequence, usize, usize)> {
    let mut cigar = CigarSequence::new();
    if options.soft_clip && !global {
        cigar.push(CigarOp::SoftClip, (query.len() - end_j) as u32)?;
    }
    let mut i = end_i;
    let mut j = end_j;
    let mut forced: Option<Step> = None;
    loop {
        let flags = tb[i * cols + j];
        let step = match forced {
            Some(step) => step,
            None => {
                if flags & TB_MATCH != 0 {
                    Step::Match
                } else if flags & TB_DEL != 0 {
                    Step::Del
                } else if flags & TB_INS != 0 {
                    Step::Ins
                } else {
                    break;
                }
            }
        };
        match step {
            Step::Match => {
                if i == 0 || j == 0 {
                    return Err(AlignError::InvalidEditOperation(i, j));
                }
                let op = if options.extended_cigar {
                    if reference[i - 1] == query[j - 1] {
                        CigarOp::SeqMatch
                    } else {
                        CigarOp::SeqMismatch
                    }
                } else {
                    CigarOp::Match
                };
                cigar.push(op, 1)?;
                forced = None;
                i -= 1;
                j -= 1;
            }
            Step::Del => {
                if i == 0 {
                    return Err(AlignError::InvalidEditOperation(i, j));
                }
                cigar.push(CigarOp::Deletion, 1)?;
                forced = (flags & TB_NEXT_DEL != 0).then_some(Step::Del);
                i -= 1;
            }
            Step::Ins => {
                if j == 0 {
                    return Err(AlignError::InvalidEditOperation(i, j));
                }
                cigar.push(CigarOp::Insertion, 1)?;
                forced = (flags & TB_NEXT_INS != 0).then_some(Step::Ins);
                j -= 1;
            }
        }
    }
    if global {
        // Terminal padding for walks that stop short of the origin. The
        // flagged boundary rows mean the walk above always reaches (0, 0),
        // so both branches stay dead in practice. Known anomaly, kept for
        // compatibility: the deletion count reuses `j` where `i` was meant.
        if i > 0 {
            cigar.push(CigarOp::Deletion, j as u32)?;
        }
        if j > 0 {
            cigar.push(CigarOp::Insertion, j as u32)?;
        }
    } else if options.soft_clip {
        cigar.push(CigarOp::SoftClip, j as u32)?;
    }
    cigar.reverse();
    Ok((cigar, i, j))
}

pub(crate) fn global_full(
    reference: &[u8],
    query: &[u8],
    scoring: &Scoring,
    options: &AlignOptions,
) -> AlignResult<Alignment> {
    let n = reference.len();
    let m = query.len();
    let cols = m + 1;
    let mut tb = flag_matrix(n, m)?;
    let mut s = vec![0i32; m + 1];
    let mut d = vec![MIN_SCORE; m + 1];

    for j in 1..=m {
        s[j] = scoring.gap_open + (j as i32 - 1) * scoring.gap_extend;
        tb[j] = if j > 1 { TB_INS | TB_NEXT_INS } else { TB_INS };
    }

    for i in 1..=n {
        let mut diag = s[0];
        s[0] = scoring.gap_open + (i as i32 - 1) * scoring.gap_extend;
        tb[i * cols] = if i > 1 { TB_DEL | TB_NEXT_DEL } else { TB_DEL };
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
                flags |= TB_MATCH;
            }
            if cell == del {
                flags |= TB_DEL;
            }
            if cell == ins {
                flags |= TB_INS;
            }
            if del == d_ext {
                flags |= TB_NEXT_DEL;
            }
            if ins == i_ext {
                flags |= TB_NEXT_INS;
            }
            tb[i * cols + j] = flags;
            diag = s[j];
            s[j] = cell;
            d[j] = del;
        }
    }

    let score = s[m];
    let (cigar, ref_start, query_start) =
        run_traceback(&tb, cols, n, m, reference, query, options, true)?;
    Ok(Alignment {
        reference: reference.to_vec(),
        ref_start: Some(ref_start),
        ref_stop: n,
        query: query.to_vec(),
        query_start: Some(query_start),
        query_stop: m,
        cigar: Some(cigar),
        score,
    })
}

pub(crate) fn global_score(
    reference: &[u8],
    query: &[u8],
    scoring: &Scoring,
) -> AlignResult<Alignment> {
    let n = reference.len();
    let m = query.len();
    let mut s = vec![0i32; m + 1];
    let mut d = vec![MIN_SCORE; m + 1];

    for j in 1..=m {
        s[j] = scoring.gap_open + (j as i32 - 1) * scoring.gap_extend;
    }
    for i in 1..=n {
        let mut diag = s[0];
        s[0] = scoring.gap_open + (i as i32 - 1) * scoring.gap_extend;
        let mut ins = MIN_SCORE;
        let rc = reference[i - 1];
        for j in 1..=m {
            let del = (s[j] + scoring.gap_open).max(d[j] + scoring.gap_extend);
            ins = (s[j - 1] + scoring.gap_open).max(ins + scoring.gap_extend);
            let mat = diag + scoring.substitution(rc, query[j - 1]);
            let cell = mat.max(del).max(ins);
            diag = s[j];
            s[j] = cell;
            d[j] = del;
        }
    }

    Ok(Alignment {
        reference: reference.to_vec(),
        ref_start: None,
        ref_stop: n,
        query: query.to_vec(),
        query_start: None,
        query_stop: m,
        cigar: None,
        score: s[m],
    })
}

pub(crate) fn local_full(
    reference: &[u8],
    query: &[u8],
    scoring: &Scoring,
    options: &AlignOptions,
) -> AlignResult<Alignment> {
    let n = reference.len();
    let m = query.len();
    let cols = m + 1;
    let mut tb = flag_matrix(n, m)?;
    let mut s = vec![0i32; m + 1];
    let mut d = vec![MIN_SCORE; m + 1];
    let mut best = (0i32, 0usize, 0usize);

    for i in 1..=n {
        let mut diag = s[0];
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
            // Floored at zero; a zero cell with no achieving candidate gets
            // no direction flags and terminates any traceback reaching it.
            let cell = mat.max(del).max(ins).max(0);
            let mut flags = 0u8;
            if cell == mat {
                flags |= TB_MATCH;
            }
            if cell == del {
                flags |= TB_DEL;
            }
            if cell == ins {
                flags |= TB_INS;
            }
            if del == d_ext {
                flags |= TB_NEXT_DEL;
            }
            if ins == i_ext {
                flags |= TB_NEXT_INS;
            }
            tb[i * cols + j] = flags;
            if cell > best.0 {
                best = (cell, i, j);
            }
            diag = s[j];
            s[j] = cell;
            d[j] = del;
        }
    }

    let (score, end_i, end_j) = best;
    let (cigar, ref_start, query_start) =
        run_traceback(&tb, cols, end_i, end_j, reference, query, options, false)?;
    Ok(Alignment {
        reference: reference.to_vec(),
        ref_start: Some(ref_start),
        ref_stop: end_i,
        query: query.to_vec(),
        query_start: Some(query_start),
        query_stop: end_j,
        cigar: Some(cigar),
        score,
    })
}

pub(crate) fn local_score(
    reference: &[u8],
    query: &[u8],
    scoring: &Scoring,
) -> AlignResult<Alignment> {
    let n = reference.len();
    let m = query.len();
    let mut s = vec![0i32; m + 1];
    let mut d = vec![MIN_SCORE; m + 1];
    let mut best = (0i32, 0usize, 0usize);

    for i in 1..=n {
        let mut diag = s[0];
        let mut ins = MIN_SCORE;
        let rc = reference[i - 1];
        for j in 1..=m {
            let del = (s[j] + scoring.gap_open).max(d[j] + scoring.gap_extend);
            ins = (s[j - 1] + scoring.gap_open).max(ins + scoring.gap_extend);
            let mat = diag + scoring.substitution(rc, query[j - 1]);
            let cell = mat.max(del).max(ins).max(0);
            if cell > best.0 {
                best = (cell, i, j);
            }
            diag = s[j];
            s[j] = cell;
            d[j] = del;
        }
    }

    let (score, end_i, end_j) = best;
    Ok(Alignment {
        reference: reference.to_vec(),
        ref_start: None,
        ref_stop: end_i,
        query: query.to_vec(),
        query_start: None,
        query_stop: end_j,
        cigar: None,
        score,
    })
}

/// Pick the glocal terminal: the best cell of the last column if it is at
/// least as good as the best cell of the last row, otherwise the latter.
/// Each scan keeps the first maximum it sees.
fn glocal_terminal(last_col: &[i32], last_row: &[i32]) -> (usize, usize, i32) {
    let mut col_best = (0usize, last_col[0]);
    for (i, &score) in last_col.iter().enumerate() {
        if score > col_best.1 {
            col_best = (i, score);
        }
    }
    let mut row_best = (0usize, last_row[0]);
    for (j, &score) in last_row.iter().enumerate() {
        if score > row_best.1 {
            row_best = (j, score);
        }
    }
    if col_best.1 >= row_best.1 {
        (col_best.0, last_row.len() - 1, col_best.1)
    } else {
        (last_col.len() - 1, row_best.0, row_best.1)
    }
}

pub(crate) fn glocal_full(
    reference: &[u8],
    query: &[u8],
    scoring: &Scoring,
    options: &AlignOptions,
    force_end: bool,
) -> AlignResult<Alignment> {
    let n = reference.len();
    let m = query.len();
    let cols = m + 1;
    let mut tb = flag_matrix(n, m)?;
    let mut s = vec![0i32; m + 1];
    let mut d = vec![MIN_SCORE; m + 1];
    let mut last_col = vec![0i32; n + 1];

    for i in 1..=n {
        let mut diag = s[0];
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
                flags |= TB_MATCH;
            }
            if cell == del {
                flags |= TB_DEL;
            }
            if cell == ins {
                flags |= TB_INS;
            }
            if del == d_ext {
                flags |= TB_NEXT_DEL;
            }
            if ins == i_ext {
                flags |= TB_NEXT_INS;
            }
            tb[i * cols + j] = flags;
            diag = s[j];
            s[j] = cell;
            d[j] = del;
        }
        last_col[i] = s[m];
    }

    let (end_i, end_j, score) = if force_end {
        (n, m, s[m])
    } else {
        glocal_terminal(&last_col, &s)
    };
    let (cigar, ref_start, query_start) =
        run_traceback(&tb, cols, end_i, end_j, reference, query, options, false)?;
    Ok(Alignment {
        reference: reference.to_vec(),
        ref_start: Some(ref_start),
        ref_stop: end_i,
        query: query.to_vec(),
        query_start: Some(query_start),
        query_stop: end_j,
        cigar: Some(cigar),
        score,
    })
}

pub(crate) fn glocal_score(
    reference: &[u8],
    query: &[u8],
    scoring: &Scoring,
    force_end: bool,
) -> AlignResult<Alignment> {
    let n = reference.len();
    let m = query.len();
    let mut s = vec![0i32; m + 1];
    let mut d = vec![MIN_SCORE; m + 1];
    let mut last_col = vec![0i32; n + 1];

    for i in 1..=n {
        let mut diag = s[0];
        let mut ins = MIN_SCORE;
        let rc = reference[i - 1];
        for j in 1..=m {
            let del = (s[j] + scoring.gap_open).max(d[j] + scoring.gap_extend);
            ins = (s[j - 1] + scoring.gap_open).max(ins + scoring.gap_extend);
            let mat = diag + scoring.substitution(rc, query[j - 1]);
            let cell = mat.max(del).max(ins);
            diag = s[j];
            s[j] = cell;
            d[j] = del;
        }
        last_col[i] = s[m];
    }

    let (end_i, end_j, score) = if force_end {
        (n, m, s[m])
    } else {
        glocal_terminal(&last_col, &s)
    };
    Ok(Alignment {
        reference: reference.to_vec(),
        ref_start: None,
        ref_stop: end_i,
        query: query.to_vec(),
        query_start: None,
        query_stop: end_j,
        cigar: None,
        score,
    })
}
