use std::fs;
use std::path::Path;

pub fn settings_export() {
    print!("{}", gsd_engine::settings_default_config());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(
        gsd_core::settings::parse_settings_toml(&content),
        "Error: {}"
    );
    println!(
        "OK: decoder.default_look_back={}, decoder.max_nbest={}, gradient.loss_lookback_margin={}",
        s.decoder.default_look_back, s.decoder.max_nbest, s.gradient.loss_lookback_margin
    );
}

/// Apply the global `--settings` and `--trace-dir` options.
pub fn setup(settings: Option<&str>, trace_dir: Option<&str>) {
    if let Some(file) = settings {
        die!(
            gsd_engine::settings_load_config(Path::new(file)),
            "Error loading settings: {}"
        );
    }
    if let Some(dir) = trace_dir {
        gsd_engine::trace_init::init_tracing(Path::new(dir));
    }
}
