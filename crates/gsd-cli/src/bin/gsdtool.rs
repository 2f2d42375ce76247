use clap::{Parser, Subcommand};

use gsd_cli::commands::{config_ops, decode_ops, model_ops};

#[derive(Parser)]
#[command(name = "gsdtool", about = "Segment decoder diagnostics", version)]
struct Cli {
    /// Settings TOML replacing the built-in defaults
    #[arg(long, global = true)]
    settings: Option<String>,
    /// Directory for JSON trace output (needs the `trace` feature)
    #[arg(long, global = true)]
    trace_dir: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate a model file, then print its shape
    Check {
        /// Model description (JSON)
        model_file: String,
        /// Output as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Evaluate one penalty function at the given inputs
    Plif {
        /// Model description (JSON)
        model_file: String,
        /// One-based function id
        id: usize,
        /// Raw inputs
        #[arg(required = true, allow_negative_numbers = true)]
        inputs: Vec<f64>,
        /// External scores for functions reading them
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        external: Vec<f64>,
        /// Ignore the function's chain
        #[arg(long)]
        no_chain: bool,
        #[arg(long)]
        json: bool,
    },
    /// Decode the best paths through an observation
    Decode {
        /// Model description (JSON)
        model_file: String,
        /// Decode request with the observation (JSON)
        request_file: String,
        /// Number of paths (overrides the request)
        #[arg(short, long)]
        n: Option<usize>,
        /// Fix every penalty at 0
        #[arg(long)]
        no_content: bool,
        #[arg(long)]
        json: bool,
    },
    /// Derivatives of a given path's score
    Deriv {
        /// Model description (JSON)
        model_file: String,
        /// Gradient request with observation and path (JSON)
        request_file: String,
        #[arg(long)]
        json: bool,
    },
    /// Best state sequences over transition weights alone
    Free {
        /// Model description (JSON)
        model_file: String,
        /// Longest sequence, in states (at most `decoder.max_iterations`)
        #[arg(long, default_value = "10", allow_negative_numbers = true)]
        max_iter: i64,
        /// Number of sequences
        #[arg(short, long)]
        n: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Print the built-in settings TOML
    SettingsExport,
    /// Validate a settings TOML file
    SettingsValidate {
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();
    config_ops::setup(cli.settings.as_deref(), cli.trace_dir.as_deref());

    match cli.command {
        Command::Check { model_file, json } => model_ops::check(&model_file, json),
        Command::Plif {
            model_file,
            id,
            inputs,
            external,
            no_chain,
            json,
        } => model_ops::plif(&model_file, id, &inputs, &external, no_chain, json),
        Command::Decode {
            model_file,
            request_file,
            n,
            no_content,
            json,
        } => decode_ops::decode(&model_file, &request_file, n, no_content, json),
        Command::Deriv {
            model_file,
            request_file,
            json,
        } => decode_ops::deriv(&model_file, &request_file, json),
        Command::Free {
            model_file,
            max_iter,
            n,
            json,
        } => decode_ops::free(&model_file, max_iter, n, json),
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
    }
}
