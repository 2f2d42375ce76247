use super::*;
use crate::decoder::{decode, decode_without_content, DecodeOptions};
use crate::error::ModelError;
use crate::observation::Observation;
use crate::settings::settings;

#[test]
fn test_start_middle_end_scenario() {
    let model = start_middle_end();
    // middle at position 5, end at position 15: gap 10
    let obs = Observation::new(vec![0, 5, 15]).unwrap();
    let paths = decode(&model, &obs, &DecodeOptions::nbest(1)).unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].score, 5.0);
    assert_eq!(paths[0].states, vec![0, 1, 2]);
    assert_eq!(paths[0].positions, vec![0, 1, 2]);
}

#[test]
fn test_fewer_paths_than_requested() {
    let model = start_middle_end();
    let obs = Observation::new(vec![0, 5, 15]).unwrap();
    // the direct hop 0 -> 2 does not exist and middle cannot end the path
    let paths = decode(&model, &obs, &DecodeOptions::nbest(5)).unwrap();
    assert_eq!(paths.len(), 1);
}

#[test]
fn test_gap_beyond_domain_has_no_path() {
    let model = start_middle_end();
    // gap 12 is outside [0, 10]
    let obs = Observation::new(vec![0, 3, 15]).unwrap();
    assert!(decode(&model, &obs, &DecodeOptions::default()).unwrap().is_empty());
}

#[test]
fn test_middle_column_choice() {
    let model = start_middle_end();
    // middle may sit at column 1 (gap 8 -> 3) or column 2 (gap 4 -> -1)
    let obs = Observation::new(vec![0, 2, 6, 10]).unwrap();
    let paths = decode(&model, &obs, &DecodeOptions::nbest(3)).unwrap();
    let scores: Vec<f64> = paths.iter().map(|p| p.score).collect();
    assert_eq!(scores, vec![3.0, -1.0]);
    assert_eq!(paths[0].positions, vec![0, 1, 3]);
    assert_eq!(paths[1].positions, vec![0, 2, 3]);
}

#[test]
fn test_without_content_zeroes_penalties() {
    let model = start_middle_end();
    let obs = Observation::new(vec![0, 5, 15]).unwrap();
    let paths = decode_without_content(&model, &obs, &DecodeOptions::default()).unwrap();
    assert_eq!(paths[0].score, 0.0);
    assert_eq!(paths[0].states, vec![0, 1, 2]);
}

#[test]
fn test_emissions_add_to_score() {
    let model = start_middle_end();
    // one plane, no signal functions: raw values pass through
    #[rustfmt::skip]
    let signals = vec![
        1.0, 0.0, 0.0,   // start
        0.0, 2.0, 0.0,   // middle
        0.0, 0.0, 0.5,   // end
    ];
    let obs = Observation::new(vec![0, 5, 15])
        .unwrap()
        .with_signals(3, 1, signals)
        .unwrap();
    let paths = decode(&model, &obs, &DecodeOptions::default()).unwrap();
    assert_eq!(paths[0].score, 5.0 + 1.0 + 2.0 + 0.5);
}

#[test]
fn test_unobservable_column_is_dead() {
    let model = start_middle_end();
    let mut signals = vec![0.0; 9];
    // middle cannot be observed at column 1
    signals[3 + 1] = f64::NEG_INFINITY;
    let obs = Observation::new(vec![0, 5, 15])
        .unwrap()
        .with_signals(3, 1, signals)
        .unwrap();
    assert!(decode(&model, &obs, &DecodeOptions::default()).unwrap().is_empty());
}

#[test]
fn test_unobservable_threshold_option() {
    let model = start_middle_end();
    let mut signals = vec![0.0; 9];
    signals[3 + 1] = -50.0;
    let obs = Observation::new(vec![0, 5, 15])
        .unwrap()
        .with_signals(3, 1, signals)
        .unwrap();
    let paths = decode(&model, &obs, &DecodeOptions::default()).unwrap();
    assert_eq!(paths[0].score, 5.0 - 50.0);

    let strict = DecodeOptions {
        unobservable_threshold: -10.0,
        ..DecodeOptions::default()
    };
    assert!(decode(&model, &obs, &strict).unwrap().is_empty());
}

#[test]
fn test_default_look_back_option() {
    let model = start_middle_end();
    let obs = Observation::new(vec![0, 5, 15]).unwrap();
    // 0 -> 1 has no edge penalty; its gap of 5 exceeds a look-back of 4
    let short = DecodeOptions {
        default_look_back: 4,
        ..DecodeOptions::default()
    };
    assert!(decode(&model, &obs, &short).unwrap().is_empty());
    let exact = DecodeOptions {
        default_look_back: 5,
        ..DecodeOptions::default()
    };
    assert_eq!(decode(&model, &obs, &exact).unwrap()[0].score, 5.0);

    let negative = DecodeOptions {
        default_look_back: -1,
        ..DecodeOptions::default()
    };
    assert_eq!(
        decode(&model, &obs, &negative).unwrap_err(),
        ModelError::InvalidLookBack(-1)
    );
}

#[test]
fn test_single_column() {
    let model = start_middle_end();
    let obs = Observation::new(vec![7]).unwrap();
    // p and q never overlap on a finite state
    assert!(decode(&model, &obs, &DecodeOptions::default()).unwrap().is_empty());
}

#[test]
fn test_invalid_nbest() {
    let model = start_middle_end();
    let obs = Observation::new(vec![0, 5, 15]).unwrap();
    let max = settings().decoder.max_nbest;
    assert_eq!(
        decode(&model, &obs, &DecodeOptions::nbest(0)).unwrap_err(),
        ModelError::InvalidNbest { nbest: 0, max }
    );
    assert_eq!(
        decode(&model, &obs, &DecodeOptions::nbest(max + 1)).unwrap_err(),
        ModelError::InvalidNbest { nbest: max + 1, max }
    );
}

#[test]
fn test_signal_dimension_mismatch() {
    let model = start_middle_end();
    let obs = Observation::new(vec![0, 5, 15])
        .unwrap()
        .with_signals(2, 1, vec![0.0; 6])
        .unwrap();
    assert!(matches!(
        decode(&model, &obs, &DecodeOptions::default()),
        Err(ModelError::DimensionMismatch { .. })
    ));
}
