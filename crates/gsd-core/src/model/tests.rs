use approx::assert_relative_eq;

use super::*;
use crate::plif::{PenaltyFunction, PlifId};

fn arena(n: usize) -> PlifArena {
    let functions = (0..n)
        .map(|id| {
            PenaltyFunction::builder(id, vec![0.0, 100.0], vec![0.0, 1.0])
                .len_range(0, 50 + id as i32)
                .build()
                .unwrap()
        })
        .collect();
    PlifArena::new(functions).unwrap()
}

#[test]
fn test_incoming_sorted_by_source() {
    let model = Automaton::builder(3, arena(0))
        .transition(Transition::new(2, 0, 1.0))
        .transition(Transition::new(0, 0, 2.0))
        .transition(Transition::new(1, 0, 3.0))
        .transition(Transition::new(0, 1, 4.0))
        .build()
        .unwrap();
    let srcs: Vec<usize> = model
        .incoming(0)
        .iter()
        .map(|&i| model.transition(i).src)
        .collect();
    assert_eq!(srcs, vec![0, 1, 2]);
    assert_eq!(model.transition_weight(1, 0), 3.0);
    assert_eq!(model.transition_weight(1, 1), f64::NEG_INFINITY);
    assert_eq!(model.find_transition(0, 1), Some(3));
    assert_eq!(model.find_transition(2, 2), None);
    assert_eq!(model.p(), &[0.0, 0.0, 0.0]);
}

#[test]
fn test_max_segment_id_and_look_back() {
    let model = Automaton::builder(2, arena(2))
        .transition(Transition::new(0, 1, 0.0).with_segment(3))
        .transition(Transition::new(1, 1, 0.0).with_segment(1))
        .edge_penalty(0, 1, PenaltyCollection::from_ids([PlifId(0), PlifId(1)]))
        .build()
        .unwrap();
    assert_eq!(model.max_segment_id(), 3);
    assert_eq!(model.look_back(0, 1, 30000), 51);
    assert_eq!(model.look_back(1, 1, 30000), 30000);
    assert_eq!(model.max_look_back(30000), 30000);
    assert!(!model.uses_content_scores());
}

#[test]
fn test_dimension_errors() {
    let err = Automaton::builder(2, arena(0))
        .initial(vec![0.0])
        .build()
        .unwrap_err();
    assert_eq!(err, ModelError::dims("initial scores", 2, 1));

    let err = Automaton::builder(2, arena(0))
        .transition(Transition::new(0, 2, 0.0))
        .build()
        .unwrap_err();
    assert!(matches!(err, ModelError::IdOutOfRange { id: 2, len: 2, .. }));

    let err = Automaton::builder(2, arena(0))
        .transition(Transition::new(0, 1, 0.0))
        .transition(Transition::new(0, 1, 1.0))
        .build()
        .unwrap_err();
    assert_eq!(err, ModelError::DuplicateTransition { src: 0, dst: 1 });

    let err = Automaton::builder(0, arena(0)).build().unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_dangling_penalty_ids() {
    let err = Automaton::builder(2, arena(1))
        .edge_penalty(0, 1, PenaltyCollection::Single(PlifId(1)))
        .build()
        .unwrap_err();
    assert!(matches!(err, ModelError::IdOutOfRange { id: 1, len: 1, .. }));

    let err = Automaton::builder(2, arena(1))
        .signal_planes(1)
        .state_signal(0, 1, PenaltyCollection::Single(PlifId(0)))
        .build()
        .unwrap_err();
    assert!(matches!(err, ModelError::IdOutOfRange { id: 1, len: 1, .. }));
}

#[test]
fn test_orf_validation() {
    let model = Automaton::builder(2, arena(0))
        .transition(Transition::new(0, 1, 0.0))
        .orf_info(0, 2, NO_FRAME)
        .orf_info(1, NO_FRAME, 1)
        .build()
        .unwrap();
    assert!(model.has_orf_constraints());
    assert_eq!(model.orf_span(0), Some(OrfSpan { to: 1, target: 2 }));

    let err = Automaton::builder(2, arena(0))
        .transition(Transition::new(0, 1, 0.0))
        .orf_info(0, 0, NO_FRAME)
        .build()
        .unwrap_err();
    assert_eq!(err, ModelError::OrfMismatch { src: 0, dst: 1 });

    let err = Automaton::builder(2, arena(0))
        .orf_info(1, 3, 0)
        .build()
        .unwrap_err();
    assert_eq!(err, ModelError::InvalidFrame { state: 1, frame: 3 });
}

fn external_arena() -> PlifArena {
    let f = PenaltyFunction::builder(0, vec![0.0, 1.0], vec![0.0, 1.0])
        .len_range(0, 100)
        .external_score(2)
        .build()
        .unwrap();
    PlifArena::new(vec![f]).unwrap()
}

#[test]
fn test_external_index_needs_content_scores() {
    let err = Automaton::builder(2, external_arena())
        .edge_penalty(0, 1, PenaltyCollection::Single(PlifId(0)))
        .build()
        .unwrap_err();
    assert!(matches!(err, ModelError::IdOutOfRange { id: 2, .. }));

    let content = ContentModel::new(
        vec![1],
        vec![vec![0.0; 4], vec![0.0; 4]],
        vec![WordFrame::default(); 2],
        vec![false, false],
    )
    .unwrap();
    let model = Automaton::builder(2, external_arena())
        .edge_penalty(0, 1, PenaltyCollection::Single(PlifId(0)))
        .content(content)
        .build()
        .unwrap();
    assert!(model.uses_content_scores());
}

#[test]
fn test_content_model_validation() {
    assert!(matches!(
        ContentModel::new(vec![0], vec![], vec![], vec![]),
        Err(ModelError::InvalidContent(_))
    ));
    assert!(matches!(
        ContentModel::new(vec![1, 2], vec![vec![0.0; 19]], vec![WordFrame::default()], vec![false]),
        Err(ModelError::DimensionMismatch { expected: 20, actual: 19, .. })
    ));
    let bad_frame = WordFrame { modulus: 0, offset: 0 };
    assert!(ContentModel::new(vec![1], vec![vec![0.0; 4]], vec![bad_frame], vec![false]).is_err());
}

fn codes(s: &str) -> Vec<u8> {
    s.bytes()
        .map(|b| match b {
            b'A' => 0,
            b'C' => 1,
            b'G' => 2,
            _ => 3,
        })
        .collect()
}

#[test]
fn test_kmer_index_big_endian() {
    let index = KmerIndex::new(&codes("ACGT"), &[1, 2, 4]);
    assert_eq!(index.word(0, 2), Some(2));
    // "CG" = 1 * 4 + 2
    assert_eq!(index.word(1, 1), Some(6));
    // "ACGT" = 0*64 + 1*16 + 2*4 + 3
    assert_eq!(index.word(2, 0), Some(27));
    assert_eq!(index.word(2, 1), None);
    assert_eq!(index.word(0, -1), None);
}

/// Weight of word `w` is `w + 1` so counts are easy to read back.
fn counting_model(degrees: Vec<usize>, frame: WordFrame, sign: bool) -> ContentModel {
    let width: usize = degrees.iter().map(|&d| 1 << (2 * d)).sum();
    let weights = (0..width).map(|w| (w + 1) as f64).collect();
    ContentModel::new(degrees, vec![weights], vec![frame], vec![sign]).unwrap()
}

#[test]
fn test_content_scores_average_weights() {
    // mononucleotides A, C, G, T have weights 1..=4
    let model = counting_model(vec![1], WordFrame::default(), false);
    let index = KmerIndex::new(&codes("ACGTAC"), model.degrees());
    // [0, 4): A C G T -> (1 + 2 + 3 + 4) / 4
    assert_relative_eq!(model.segment_scores(&index, 0, 4)[0], 2.5);
    // [4, 6): A C -> (1 + 2) / 2
    assert_relative_eq!(model.segment_scores(&index, 4, 6)[0], 1.5);
}

#[test]
fn test_content_scores_only_whole_kmers() {
    // degree 2 over "AACC": words AA(0) AC(1) CC(5); segment [0, 3) holds AA and AC
    let model = counting_model(vec![2], WordFrame::default(), false);
    let index = KmerIndex::new(&codes("AACC"), model.degrees());
    assert_relative_eq!(model.segment_scores(&index, 0, 3)[0], (1.0 + 2.0) / 2.0);
}

#[test]
fn test_sign_words_count_once() {
    let model = counting_model(vec![1], WordFrame::default(), true);
    let index = KmerIndex::new(&codes("AAAC"), model.degrees());
    // unique words A and C: (1 + 2) / sqrt(2)
    assert_relative_eq!(model.segment_scores(&index, 0, 4)[0], 3.0 / 2f64.sqrt());
}

#[test]
fn test_word_frame_filter() {
    // modulus 3: only starts i with (6 - i) % 3 == 0 and i < 6, i.e. 0 and 3
    let frame = WordFrame { modulus: 3, offset: 0 };
    let model = counting_model(vec![1], frame, false);
    let index = KmerIndex::new(&codes("ACGTCG"), model.degrees());
    // A (1) and T (4)
    assert_relative_eq!(model.segment_scores(&index, 0, 6)[0], 2.5);
}

#[test]
fn test_cumulative_fill_matches_single_segments() {
    let model = counting_model(vec![1, 2], WordFrame { modulus: 2, offset: 1 }, false);
    let seq = codes("ACGTTGCAAC");
    let index = KmerIndex::new(&seq, model.degrees());
    let positions = [0, 2, 3, 7, 10];
    let mut scores = ContentScores::new(&model);
    scores.fill(&model, &index, &positions, 4, 100);
    for ts in 0..4 {
        let direct = model.segment_scores(&index, positions[ts], positions[4]);
        assert_relative_eq!(scores.get(4 - ts)[0], direct[0], epsilon = 1e-12);
    }
    // outside the filled window
    assert_eq!(scores.get(5), &[0.0]);
}
