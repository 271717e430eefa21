use anyhow::Result;
use gapalign::{
    align, align_altschul_erickson, AlignOptions, Alignment, AlignmentMode, CigarOp,
    CigarSequence, Scoring,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MODES: [AlignmentMode; 4] = [
    AlignmentMode::Global,
    AlignmentMode::Local,
    AlignmentMode::Glocal,
    AlignmentMode::LocalGlobal,
];

fn random_sequence(rng: &mut StdRng, max_len: usize) -> Vec<u8> {
    let len = rng.gen_range(0..=max_len);
    (0..len).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect()
}

/// Recompute the affine score of a reconstructed path directly from the
/// cigar and the sequences it claims to align.
fn score_of(
    cigar: &CigarSequence,
    reference: &[u8],
    query: &[u8],
    ref_start: usize,
    query_start: usize,
    scoring: &Scoring,
) -> i32 {
    let mut ri = ref_start;
    let mut qi = query_start;
    let mut total = 0i32;
    for (op, count) in cigar.iter() {
        let n = count as usize;
        match op {
            CigarOp::Match | CigarOp::SeqMatch | CigarOp::SeqMismatch => {
                for k in 0..n {
                    total += if reference[ri + k] == query[qi + k] {
                        scoring.match_score
                    } else {
                        scoring.mismatch_penalty
                    };
                }
            }
            CigarOp::Deletion | CigarOp::Insertion => {
                total += scoring.gap_open + (count as i32 - 1) * scoring.gap_extend;
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
    total
}

fn full_options() -> AlignOptions {
    AlignOptions::default()
}

fn score_options() -> AlignOptions {
    AlignOptions {
        score_only: true,
        ..AlignOptions::default()
    }
}

fn check_path_is_score_consistent(aln: &Alignment, scoring: &Scoring) {
    let cigar = aln.cigar.as_ref().expect("full alignment carries a cigar");
    let recomputed = score_of(
        cigar,
        &aln.reference,
        &aln.query,
        aln.ref_start.unwrap(),
        aln.query_start.unwrap(),
        scoring,
    );
    assert_eq!(
        recomputed, aln.score,
        "cigar {cigar} does not reproduce the reported score"
    );
}

#[test]
fn full_and_score_only_kernels_agree() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let scoring = Scoring::default();
    for _ in 0..150 {
        let reference = random_sequence(&mut rng, 30);
        let query = random_sequence(&mut rng, 30);
        for mode in MODES {
            let fast = align(&reference, &query, mode, &scoring, &score_options())?;
            let slow = align(&reference, &query, mode, &scoring, &full_options())?;
            assert_eq!(fast.score, slow.score, "{mode} scores diverge");
            assert_eq!(fast.ref_stop, slow.ref_stop, "{mode} ref stops diverge");
            assert_eq!(fast.query_stop, slow.query_stop, "{mode} query stops diverge");
            assert!(fast.cigar.is_none() && fast.ref_start.is_none());
        }
    }
    Ok(())
}

#[test]
fn global_alignments_consume_both_sequences() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let scoring = Scoring::default();
    for _ in 0..150 {
        let reference = random_sequence(&mut rng, 40);
        let query = random_sequence(&mut rng, 40);
        let aln = align(
            &reference,
            &query,
            AlignmentMode::Global,
            &scoring,
            &full_options(),
        )?;
        let cigar = aln.cigar.as_ref().unwrap();
        assert_eq!(cigar.ref_len(None) as usize, reference.len());
        assert_eq!(cigar.query_len(None, true) as usize, query.len());
        check_path_is_score_consistent(&aln, &scoring);
    }
    Ok(())
}

#[test]
fn local_alignments_report_consistent_windows() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let scoring = Scoring::default();
    for _ in 0..150 {
        let reference = random_sequence(&mut rng, 35);
        let query = random_sequence(&mut rng, 35);
        let aln = align(
            &reference,
            &query,
            AlignmentMode::Local,
            &scoring,
            &full_options(),
        )?;
        let cigar = aln.cigar.as_ref().unwrap();
        assert_eq!(
            cigar.ref_len(None) as usize,
            aln.ref_stop - aln.ref_start.unwrap()
        );
        assert_eq!(
            cigar.query_len(None, false) as usize,
            aln.query_stop - aln.query_start.unwrap()
        );
        assert!(aln.score >= 0);
        check_path_is_score_consistent(&aln, &scoring);
    }
    Ok(())
}

#[test]
fn glocal_and_local_global_paths_reproduce_their_scores() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(1234);
    let scoring = Scoring::default();
    for _ in 0..150 {
        let reference = random_sequence(&mut rng, 30);
        let query = random_sequence(&mut rng, 30);
        for mode in [AlignmentMode::Glocal, AlignmentMode::LocalGlobal] {
            let aln = align(&reference, &query, mode, &scoring, &full_options())?;
            check_path_is_score_consistent(&aln, &scoring);
            if mode == AlignmentMode::LocalGlobal {
                assert_eq!(aln.ref_stop, reference.len());
                assert_eq!(aln.query_stop, query.len());
            }
        }
    }
    Ok(())
}

#[test]
fn extended_cigars_match_basic_geometry() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(99);
    let scoring = Scoring::default();
    let extended = AlignOptions {
        extended_cigar: true,
        ..AlignOptions::default()
    };
    for _ in 0..100 {
        let reference = random_sequence(&mut rng, 25);
        let query = random_sequence(&mut rng, 25);
        for mode in MODES {
            let basic = align(&reference, &query, mode, &scoring, &full_options())?;
            let ext = align(&reference, &query, mode, &scoring, &extended)?;
            assert_eq!(basic.score, ext.score);
            let basic_cigar = basic.cigar.as_ref().unwrap();
            let ext_cigar = ext.cigar.as_ref().unwrap();
            assert_eq!(basic_cigar.ref_len(None), ext_cigar.ref_len(None));
            assert_eq!(
                basic_cigar.query_len(None, true),
                ext_cigar.query_len(None, true)
            );
            // Basic mode never emits =/X, extended mode never emits M.
            assert_eq!(basic_cigar.count(CigarOp::SeqMatch), 0);
            assert_eq!(basic_cigar.count(CigarOp::SeqMismatch), 0);
            assert_eq!(ext_cigar.count(CigarOp::Match), 0);
            check_path_is_score_consistent(&ext, &scoring);
        }
    }
    Ok(())
}

#[test]
fn soft_clipped_local_cigars_cover_the_query() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(2024);
    let scoring = Scoring::default();
    let soft = AlignOptions {
        soft_clip: true,
        ..AlignOptions::default()
    };
    for _ in 0..100 {
        let reference = random_sequence(&mut rng, 30);
        let query = random_sequence(&mut rng, 30);
        let aln = align(&reference, &query, AlignmentMode::Local, &scoring, &soft)?;
        let cigar = aln.cigar.as_ref().unwrap();
        assert_eq!(cigar.query_len(None, true) as usize, query.len());
        assert_eq!(
            cigar.query_len(None, false) as usize,
            aln.query_stop - aln.query_start.unwrap()
        );
    }
    Ok(())
}

#[test]
fn altschul_erickson_matches_gotoh_scores() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(4096);
    let scoring = Scoring::default();
    for _ in 0..150 {
        let reference = random_sequence(&mut rng, 25);
        let query = random_sequence(&mut rng, 25);
        let gotoh = align(
            &reference,
            &query,
            AlignmentMode::Global,
            &scoring,
            &full_options(),
        )?;
        let ae = align_altschul_erickson(&reference, &query, &scoring, false)?;
        assert_eq!(ae.score, gotoh.score);
        let cigar = ae.cigar.as_ref().unwrap();
        assert_eq!(cigar.ref_len(None) as usize, reference.len());
        assert_eq!(cigar.query_len(None, true) as usize, query.len());
        check_path_is_score_consistent(&ae, &scoring);
    }
    Ok(())
}

#[test]
fn produced_cigars_round_trip_through_strings() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(31337);
    let scoring = Scoring::default();
    for _ in 0..50 {
        let reference = random_sequence(&mut rng, 30);
        let query = random_sequence(&mut rng, 30);
        for mode in MODES {
            let aln = align(&reference, &query, mode, &scoring, &full_options())?;
            let cigar = aln.cigar.as_ref().unwrap();
            let reparsed: CigarSequence = cigar.to_string().parse()?;
            assert_eq!(&reparsed, cigar);
        }
    }
    Ok(())
}
