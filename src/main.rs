use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::path::PathBuf;
use uglify_filter::config::{self, FileConfig};
use uglify_filter::{batch, UglifyJs2Filter, UglifyOptions, DEFAULT_UGLIFYJS_BIN};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scripts, directories or glob patterns to minify.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Path to the uglifyjs executable.
    #[arg(long)]
    uglifyjs_bin: Option<PathBuf>,

    /// Interpreter used to run uglifyjs.
    #[arg(long)]
    node_bin: Option<PathBuf>,

    /// Extra module directory exported through NODE_PATH.
    #[arg(long = "node-path", value_name = "DIR")]
    node_paths: Vec<PathBuf>,

    /// Compress, optionally with compressor options (--compress=OPTIONS).
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    compress: Option<String>,

    /// Beautify the output.
    #[arg(long, overrides_with = "no_beautify")]
    beautify: bool,

    /// Do not beautify, even if the config file asks for it.
    #[arg(long, overrides_with = "beautify")]
    no_beautify: bool,

    /// Mangle names.
    #[arg(long, overrides_with = "no_mangle")]
    mangle: bool,

    /// Do not mangle, even if the config file asks for it.
    #[arg(long, overrides_with = "mangle")]
    no_mangle: bool,

    /// Drop IE8 compatibility workarounds.
    #[arg(long, overrides_with = "no_screw_ie8")]
    screw_ie8: bool,

    /// Keep IE8 compatibility workarounds, even if the config file drops them.
    #[arg(long, overrides_with = "screw_ie8")]
    no_screw_ie8: bool,

    /// Preserve comments: all of them, or those matching --comments=FILTER.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    comments: Option<String>,

    /// Wrap the output in a module exported under this name.
    #[arg(long, value_name = "NAME")]
    wrap: Option<String>,

    /// Global definition passed to the compressor.
    #[arg(long = "define", value_name = "KEY=VALUE")]
    defines: Vec<String>,

    /// Options file; command-line flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write results here instead of overwriting the inputs.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Run uglifyjs but do not write anything.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

/// `--flag` / `--no-flag` from the command line, else the config file, else off.
fn resolve_flag(on: bool, off: bool, file: Option<bool>) -> bool {
    if on {
        true
    } else if off {
        false
    } else {
        file.unwrap_or(false)
    }
}

fn build_filter(cli: &Cli, file: FileConfig) -> UglifyJs2Filter {
    let compress = match &cli.compress {
        Some(value) => config::parse_toggle(value),
        None => file.compress.unwrap_or_default(),
    };
    let comments = match &cli.comments {
        Some(value) => config::parse_toggle(value),
        None => file.comments.unwrap_or_default(),
    };

    let mut options = UglifyOptions::builder()
        .compress(compress)
        .beautify(resolve_flag(cli.beautify, cli.no_beautify, file.beautify))
        .mangle(resolve_flag(cli.mangle, cli.no_mangle, file.mangle))
        .screw_ie8(resolve_flag(cli.screw_ie8, cli.no_screw_ie8, file.screw_ie8))
        .comments(comments)
        .defines(file.defines.iter().chain(&cli.defines).cloned());
    if let Some(wrap) = cli.wrap.clone().or(file.wrap) {
        options = options.wrap(wrap);
    }

    let uglifyjs_bin = cli
        .uglifyjs_bin
        .clone()
        .or(file.uglifyjs_bin)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_UGLIFYJS_BIN));
    let mut filter = UglifyJs2Filter::new(uglifyjs_bin)
        .with_options(options.build())
        .with_node_paths(file.node_paths.into_iter().chain(cli.node_paths.iter().cloned()));
    if let Some(node_bin) = cli.node_bin.clone().or(file.node_bin) {
        filter = filter.with_node_bin(node_bin);
    }
    filter
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let file_config = match &cli.config {
        Some(path) => config::read_config(path)?,
        None => FileConfig::default(),
    };
    let filter = build_filter(&cli, file_config);
    info!(
        "Minifying with: {}",
        filter.build_command().context("Invalid executable path")?.join(" ")
    );

    let inputs = batch::collect_inputs(&cli.inputs).context("Could not collect inputs")?;
    info!("Found {} script(s) to minify", inputs.len());

    let summary = batch::minify_files(&filter, &inputs, cli.output_dir.as_deref(), cli.dry_run)?;

    info!(
        "Minified {} file(s): {} -> {} bytes, saved {} ({} KiB)",
        summary.files,
        summary.bytes_before,
        summary.bytes_after,
        summary.saved(),
        summary.saved() >> 10
    );

    Ok(())
}
