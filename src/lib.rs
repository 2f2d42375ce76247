//! File-facing layer over `gsd_core`: JSON model and request descriptions,
//! settings loading and trace setup.

pub mod description;
mod error;
pub mod trace_init;

pub use description::{
    ContentDescription, DecodeRequest, GradientRequest, LossDescription, ModelDescription,
    ObservationDescription, PackedMatrix, PathDescription, PlifDescription, Score,
};
pub use error::EngineError;

use std::path::Path;

use serde::de::DeserializeOwned;

use gsd_core::Automaton;

pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Read and parse a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    let content = std::fs::read_to_string(path).map_err(|e| EngineError::Io {
        msg: format!("{}: {e}", path.display()),
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Load a model description file and build the automaton.
pub fn load_model(path: &Path) -> Result<Automaton, EngineError> {
    read_json::<ModelDescription>(path)?.to_automaton()
}

/// Install a custom settings TOML; must run before the first decode.
pub fn settings_load_config(path: &Path) -> Result<(), EngineError> {
    let content = std::fs::read_to_string(path).map_err(|e| EngineError::Io {
        msg: format!("{}: {e}", path.display()),
    })?;
    gsd_core::settings::init_custom(content)?;
    Ok(())
}

pub fn settings_default_config() -> &'static str {
    gsd_core::settings::default_toml()
}
