use std::path::Path;

use gsd_core::settings::settings;
use gsd_core::{
    decode_free_length, path_gradient, Automaton, FreePath, PathGradient, PathHypothesis, PlifId,
};
use gsd_engine::{DecodeRequest, EngineError, GradientRequest};

fn load(model_file: &str) -> Automaton {
    die!(
        gsd_engine::load_model(Path::new(model_file)),
        "Error loading {model_file}: {}"
    )
}

/// Decode one request. `nbest` overrides the request, which overrides
/// `cli.nbest` from the settings.
pub fn run_decode(
    model: &Automaton,
    request: &DecodeRequest,
    nbest: Option<usize>,
    no_content: bool,
) -> Result<Vec<PathHypothesis>, EngineError> {
    let mut opts = request.options(settings().cli.nbest)?;
    if let Some(n) = nbest {
        opts.nbest = n;
    }
    let obs = request.observation.to_observation()?;
    let paths = if no_content {
        gsd_core::decode_without_content(model, &obs, &opts)?
    } else {
        gsd_core::decode(model, &obs, &opts)?
    };
    Ok(paths)
}

/// `state@position` pairs, positions in sequence coordinates.
pub fn format_path(path: &PathHypothesis, coordinates: &[i32]) -> String {
    path.states
        .iter()
        .zip(&path.positions)
        .map(|(s, &c)| format!("{s}@{}", coordinates[c]))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn decode(
    model_file: &str,
    request_file: &str,
    nbest: Option<usize>,
    no_content: bool,
    json: bool,
) {
    let model = load(model_file);
    let request: DecodeRequest = die!(
        gsd_engine::read_json(Path::new(request_file)),
        "Error reading {request_file}: {}"
    );
    let paths = die!(
        run_decode(&model, &request, nbest, no_content),
        "Error: {}"
    );
    if json {
        println!("{}", die!(serde_json::to_string_pretty(&paths), "Error: {}"));
        return;
    }
    if paths.is_empty() {
        println!("no admissible path");
        return;
    }
    for (rank, path) in paths.iter().enumerate() {
        println!(
            "#{:<3} {:>12.4}  {}",
            rank + 1,
            path.score,
            format_path(path, &request.observation.positions)
        );
    }
}

pub fn run_gradient(model: &Automaton, request: &GradientRequest) -> Result<PathGradient, EngineError> {
    let obs = request.observation.to_observation()?;
    let loss = request
        .loss
        .as_ref()
        .map(|l| l.to_augmentation())
        .transpose()?;
    let path = PathHypothesis::from(&request.path);
    Ok(path_gradient(model, &obs, &path, loss.as_ref())?)
}

pub fn deriv(model_file: &str, request_file: &str, json: bool) {
    let model = load(model_file);
    let request: GradientRequest = die!(
        gsd_engine::read_json(Path::new(request_file)),
        "Error reading {request_file}: {}"
    );
    let grad = die!(run_gradient(&model, &request), "Error: {}");
    if json {
        println!("{}", die!(serde_json::to_string_pretty(&grad), "Error: {}"));
        return;
    }
    println!("total score: {}", grad.total_score());
    println!("total loss:  {}", grad.total_loss());
    let n = model.n_states();
    for (i, &d) in grad.a.iter().enumerate() {
        if d != 0.0 {
            println!("  a[{}->{}] += {d}", i / n, i % n);
        }
    }
    for (i, row) in grad.plif.values.iter().enumerate() {
        if row.iter().any(|&d| d != 0.0) {
            let name = model.plifs().get(PlifId(i)).map_or("", |f| f.name());
            println!("  plif {} '{name}': {row:?}", i + 1);
        }
    }
}

pub fn free(model_file: &str, max_iter: i64, nbest: Option<usize>, json: bool) {
    let model = load(model_file);
    let nbest = nbest.unwrap_or(settings().cli.nbest);
    let paths: Vec<FreePath> = die!(decode_free_length(&model, max_iter, nbest), "Error: {}");
    if json {
        println!("{}", die!(serde_json::to_string_pretty(&paths), "Error: {}"));
        return;
    }
    for (rank, path) in paths.iter().enumerate() {
        println!("#{:<3} {:>12.4}  {:?}", rank + 1, path.score, path.states);
    }
}
