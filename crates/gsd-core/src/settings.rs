//! Global settings loaded from TOML.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`
//!
//! Settings only hold tunables. Models and observations are always passed
//! explicitly to the decoder.

use std::sync::OnceLock;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub decoder: DecoderSettings,
    pub gradient: GradientSettings,
    pub cli: CliSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecoderSettings {
    pub default_look_back: i32,
    pub unobservable_threshold: f64,
    pub big_sequence_len: usize,
    pub max_nbest: usize,
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradientSettings {
    pub loss_lookback_margin: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CliSettings {
    pub nbest: usize,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_non_negative {
        ($section:ident . $field:ident) => {
            if s.$section.$field < 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be non-negative".to_string(),
                });
            }
        };
    }
    macro_rules! check_positive_usize {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }

    check_non_negative!(decoder.default_look_back);
    check_positive_usize!(decoder.big_sequence_len);
    check_positive_usize!(decoder.max_nbest);
    if s.decoder.max_iterations < 2 {
        return Err(SettingsError::InvalidValue {
            field: "decoder.max_iterations".to_string(),
            reason: "must be at least 2".to_string(),
        });
    }
    check_non_negative!(gradient.loss_lookback_margin);
    check_positive_usize!(cli.nbest);

    if !s.decoder.unobservable_threshold.is_finite() || s.decoder.unobservable_threshold >= 0.0 {
        return Err(SettingsError::InvalidValue {
            field: "decoder.unobservable_threshold".to_string(),
            reason: "must be a finite negative number".to_string(),
        });
    }
    if s.cli.nbest > s.decoder.max_nbest {
        return Err(SettingsError::InvalidValue {
            field: "cli.nbest".to_string(),
            reason: format!("must not exceed decoder.max_nbest ({})", s.decoder.max_nbest),
        });
    }

    Ok(())
}
