use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Path to node executable could not be resolved.")]
    RuntimeResolution,

    #[error("{}", process_report(.command, .code, .stdout, .stderr, .input))]
    ProcessExecution {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
        input: String,
    },

    #[error("Error creating output file.")]
    OutputMissing,

    #[error("Failed to execute '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{0} is not valid UTF-8")]
    NotUtf8(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path does not have a string representation: {0}")]
    InvalidPath(PathBuf),

    #[error("Could not read config file '{0}': {1}")]
    ConfigRead(String, std::io::Error),

    #[error("Invalid config file '{path}' line {line}: {reason}")]
    ConfigParse {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("No input matches '{0}'")]
    NoInput(String),

    #[error(
        "Both '{}' and '{}' would be written to '{}'",
        .first.display(),
        .second.display(),
        .dest.display()
    )]
    DuplicateOutput {
        dest: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Invalid glob pattern")]
    Glob(#[from] glob::PatternError),

    #[error("Walkdir error")]
    Walkdir(#[from] walkdir::Error),
}

/// Renders a failed tool run the way build pipelines expect to print it.
fn process_report(
    command: &str,
    code: &Option<i32>,
    stdout: &str,
    stderr: &str,
    input: &str,
) -> String {
    let mut report = format!("An error occurred while running:\n{}", command);
    match code {
        Some(code) => report.push_str(&format!("\n\nExit code: {}", code)),
        None => report.push_str("\n\nTerminated by signal"),
    }
    for (title, body) in [("Error Output", stderr), ("Output", stdout), ("Input", input)] {
        if !body.is_empty() {
            report.push_str(&format!("\n\n{}:\n{}", title, body));
        }
    }
    report
}
