use approx::assert_relative_eq;
use proptest::prelude::*;

use super::*;
use crate::decoder::{decode, DecodeOptions, PathHypothesis};
use crate::observation::Observation;

const EDGES: [(usize, usize); 6] = [(0, 1), (1, 1), (1, 2), (0, 2), (2, 3), (1, 3)];

struct Case {
    model: Automaton,
    obs: Observation,
    emissions: Vec<f64>,
}

fn build_case(
    p: Vec<f64>,
    q: Vec<f64>,
    weights: Vec<f64>,
    plif_values: (f64, f64),
    emissions: Vec<f64>,
    gaps: Vec<i32>,
) -> Case {
    let arena = PlifArena::new(vec![linear(0, 1, 12, plif_values.0, plif_values.1)]).unwrap();
    let mut builder = Automaton::builder(4, arena).initial(p).terminal(q);
    for (&(src, dst), &w) in EDGES.iter().zip(&weights) {
        builder = builder.transition(Transition::new(src, dst, w));
    }
    let model = builder
        .edge_penalty(1, 2, PenaltyCollection::Single(PlifId(0)))
        .build()
        .unwrap();

    let mut positions = vec![0];
    for g in gaps {
        positions.push(positions.last().unwrap() + g);
    }
    let m = positions.len();
    let obs = Observation::new(positions)
        .unwrap()
        .with_signals(4, 1, emissions.clone())
        .unwrap();
    assert_eq!(emissions.len(), 4 * m);
    Case { model, obs, emissions }
}

/// Every finite-scoring path, scored independently of the decoder.
fn enumerate(case: &Case) -> Vec<(f64, Vec<usize>, Vec<usize>)> {
    fn walk(
        case: &Case,
        states: &mut Vec<usize>,
        cols: &mut Vec<usize>,
        score: f64,
        out: &mut Vec<(f64, Vec<usize>, Vec<usize>)>,
    ) {
        let model = &case.model;
        let m = case.obs.len();
        let (&s, &c) = (states.last().unwrap(), cols.last().unwrap());
        if c == m - 1 {
            let total = score + model.q()[s];
            if total.is_finite() {
                out.push((total, states.clone(), cols.clone()));
            }
            return;
        }
        let default = DecodeOptions::default().default_look_back;
        for next in c + 1..m {
            let gap = case.obs.position(next) - case.obs.position(c);
            for t in model.transitions().iter().filter(|t| t.src == s) {
                if gap > model.look_back(t.src, t.dst, default) {
                    continue;
                }
                let edge = model
                    .edge_penalty(t.src, t.dst)
                    .evaluate_len(model.plifs(), gap, &[], true);
                let step = t.weight + edge + case.emissions[t.dst * m + next];
                if !step.is_finite() {
                    continue;
                }
                states.push(t.dst);
                cols.push(next);
                walk(case, states, cols, score + step, out);
                states.pop();
                cols.pop();
            }
        }
    }

    let m = case.obs.len();
    let mut out = Vec::new();
    for s in 0..case.model.n_states() {
        let start = case.model.p()[s] + case.emissions[s * m];
        if start.is_finite() {
            walk(case, &mut vec![s], &mut vec![0], start, &mut out);
        }
    }
    out.sort_by(|a, b| b.0.total_cmp(&a.0));
    out
}

fn rescore(case: &Case, path: &PathHypothesis) -> f64 {
    let model = &case.model;
    let m = case.obs.len();
    let mut score = model.p()[path.states[0]] + case.emissions[path.states[0] * m];
    for w in 0..path.states.len() - 1 {
        let (src, dst) = (path.states[w], path.states[w + 1]);
        let gap = case.obs.position(path.positions[w + 1]) - case.obs.position(path.positions[w]);
        score += model.transition_weight(src, dst)
            + model.edge_penalty(src, dst).evaluate_len(model.plifs(), gap, &[], true)
            + case.emissions[dst * m + path.positions[w + 1]];
    }
    score + model.q()[*path.states.last().unwrap()]
}

fn check_adjacency(case: &Case, path: &PathHypothesis) {
    assert_eq!(path.states.len(), path.positions.len());
    assert_eq!(path.positions[0], 0);
    assert_eq!(*path.positions.last().unwrap(), case.obs.len() - 1);
    assert!(path.positions.windows(2).all(|w| w[0] < w[1]));
    for w in path.states.windows(2) {
        assert!(case.model.find_transition(w[0], w[1]).is_some());
    }
}

#[test]
fn test_fixed_case_matches_enumeration() {
    #[rustfmt::skip]
    let emissions = vec![
        0.0, 0.0, 0.0, 0.0, 0.0,
        0.5, 1.0, -1.0, 2.0, 0.0,
        0.0, -0.5, 1.5, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 1.0,
    ];
    let case = build_case(
        vec![0.0, NEG_INF, NEG_INF, NEG_INF],
        vec![NEG_INF, NEG_INF, NEG_INF, 0.0],
        vec![0.0, -0.25, 0.5, -1.0, 0.0, -0.5],
        (-2.0, 3.0),
        emissions,
        vec![3, 2, 4, 3],
    );
    let brute = enumerate(&case);
    assert!(brute.len() > 4);

    let paths = decode(&case.model, &case.obs, &DecodeOptions::nbest(4)).unwrap();
    assert_eq!(paths.len(), 4);
    for (path, expected) in paths.iter().zip(&brute) {
        assert_relative_eq!(path.score, expected.0, epsilon = 1e-9);
        assert_relative_eq!(rescore(&case, path), path.score, epsilon = 1e-9);
        check_adjacency(&case, path);
    }
}

fn finite_or_neg_inf() -> impl Strategy<Value = f64> {
    prop_oneof![3 => -3.0..3.0f64, 1 => Just(NEG_INF)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn decode_agrees_with_enumeration(
        p in prop::collection::vec(finite_or_neg_inf(), 4),
        q in prop::collection::vec(finite_or_neg_inf(), 4),
        weights in prop::collection::vec(-3.0..3.0f64, 6),
        plif_values in (-3.0..3.0f64, -3.0..3.0f64),
        emissions in prop::collection::vec(-2.0..2.0f64, 20),
        gaps in prop::collection::vec(1..6i32, 4),
        k in 1usize..6,
    ) {
        let case = build_case(p, q, weights, plif_values, emissions, gaps);
        let brute = enumerate(&case);
        let paths = decode(&case.model, &case.obs, &DecodeOptions::nbest(k)).unwrap();

        prop_assert_eq!(paths.len(), brute.len().min(k));
        for (path, expected) in paths.iter().zip(&brute) {
            prop_assert!((path.score - expected.0).abs() < 1e-9);
            prop_assert!((rescore(&case, path) - path.score).abs() < 1e-9);
            check_adjacency(&case, path);
        }
        prop_assert!(paths.windows(2).all(|w| w[0].score >= w[1].score));
        for (i, a) in paths.iter().enumerate() {
            for b in &paths[i + 1..] {
                prop_assert!(a.states != b.states || a.positions != b.positions);
            }
        }
    }
}
