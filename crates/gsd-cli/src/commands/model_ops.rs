use std::path::Path;

use serde::Serialize;

use gsd_core::settings::settings;
use gsd_core::{Automaton, ModelError, PlifId};
use gsd_engine::EngineError;

#[derive(Debug, Serialize)]
pub struct ModelSummary {
    pub n_states: usize,
    pub n_transitions: usize,
    pub n_plifs: usize,
    pub max_breakpoints: usize,
    pub signal_planes: usize,
    pub max_segment_id: usize,
    pub max_look_back: i32,
    pub start_states: Vec<usize>,
    pub end_states: Vec<usize>,
    pub orf_constrained: bool,
    pub content_scores: usize,
}

pub fn summarize(model: &Automaton) -> ModelSummary {
    let finite = |v: &[f64]| {
        v.iter()
            .enumerate()
            .filter(|(_, s)| s.is_finite())
            .map(|(i, _)| i)
            .collect()
    };
    ModelSummary {
        n_states: model.n_states(),
        n_transitions: model.transitions().len(),
        n_plifs: model.plifs().len(),
        max_breakpoints: model.plifs().max_breakpoints(),
        signal_planes: model.signal_planes(),
        max_segment_id: model.max_segment_id(),
        max_look_back: model.max_look_back(settings().decoder.default_look_back),
        start_states: finite(model.p()),
        end_states: finite(model.q()),
        orf_constrained: model.has_orf_constraints(),
        content_scores: model.content().map_or(0, |c| c.num_scores()),
    }
}

pub fn check(model_file: &str, json: bool) {
    let model = die!(
        gsd_engine::load_model(Path::new(model_file)),
        "Error loading {model_file}: {}"
    );
    let summary = summarize(&model);
    if json {
        println!("{}", die!(serde_json::to_string_pretty(&summary), "Error: {}"));
        return;
    }
    println!("OK: {model_file}");
    println!("  states:         {}", summary.n_states);
    println!("  transitions:    {}", summary.n_transitions);
    println!(
        "  plifs:          {} (max {} breakpoints)",
        summary.n_plifs, summary.max_breakpoints
    );
    println!("  signal planes:  {}", summary.signal_planes);
    println!("  segment ids:    0..={}", summary.max_segment_id);
    println!("  max look-back:  {}", summary.max_look_back);
    println!("  start states:   {:?}", summary.start_states);
    println!("  end states:     {:?}", summary.end_states);
    println!("  orf:            {}", summary.orf_constrained);
    println!("  content scores: {}", summary.content_scores);
}

/// One row of a penalty function evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlifSample {
    pub input: f64,
    /// Value the function actually read (the external score in external
    /// mode).
    pub representative: f64,
    pub score: f64,
}

/// Evaluate function `id` (one-based, as in model files) at each input.
pub fn evaluate_plif(
    model: &Automaton,
    id: usize,
    inputs: &[f64],
    external: &[f64],
    follow_chain: bool,
) -> Result<Vec<PlifSample>, EngineError> {
    let arena = model.plifs();
    if id == 0 || id > arena.len() {
        return Err(ModelError::IdOutOfRange {
            what: "penalty function".to_string(),
            id: id.wrapping_sub(1),
            len: arena.len(),
        }
        .into());
    }
    let plif = PlifId(id - 1);
    Ok(inputs
        .iter()
        .map(|&input| {
            let lookup = arena.lookup(plif, input, external, follow_chain);
            PlifSample {
                input,
                representative: lookup.input,
                score: lookup.score,
            }
        })
        .collect())
}

pub fn plif(model_file: &str, id: usize, inputs: &[f64], external: &[f64], no_chain: bool, json: bool) {
    let model = die!(
        gsd_engine::load_model(Path::new(model_file)),
        "Error loading {model_file}: {}"
    );
    let samples = die!(
        evaluate_plif(&model, id, inputs, external, !no_chain),
        "Error: {}"
    );
    if json {
        println!("{}", die!(serde_json::to_string_pretty(&samples), "Error: {}"));
        return;
    }
    if let Some(f) = model.plifs().get(PlifId(id - 1)) {
        println!(
            "plif {id} '{}' ({}, len {}..={})",
            f.name(),
            f.transform().name(),
            f.min_len(),
            f.max_len()
        );
    }
    for s in &samples {
        println!("{:>12}\t{:>12}\t{}", s.input, s.representative, s.score);
    }
}
