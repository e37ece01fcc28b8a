use crate::asset::{Asset, StringAsset};
use crate::command::{CommandRunner, SystemCommandRunner, EXIT_NOT_FOUND};
use crate::error::FilterError;
use crate::options::UglifyOptions;
use log::{debug, warn};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempPath};

pub const DEFAULT_UGLIFYJS_BIN: &str = "/usr/bin/uglifyjs";

#[cfg(windows)]
const NODE_PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const NODE_PATH_SEPARATOR: &str = ":";

/// A transformation applied to an asset in two phases.
pub trait Filter {
    /// Runs when the asset is loaded.
    fn filter_load(&self, asset: &mut dyn Asset) -> Result<(), FilterError>;

    /// Runs when the asset is dumped to its final form.
    fn filter_dump(&self, asset: &mut dyn Asset) -> Result<(), FilterError>;
}

/// Minifies JavaScript by running UglifyJS 2 on the dumped content.
#[derive(Debug, Clone)]
pub struct UglifyJs2Filter<R = SystemCommandRunner> {
    uglifyjs_bin: PathBuf,
    node_bin: Option<PathBuf>,
    node_paths: Vec<PathBuf>,
    options: UglifyOptions,
    runner: R,
}

impl Default for UglifyJs2Filter {
    fn default() -> Self {
        Self::new(DEFAULT_UGLIFYJS_BIN)
    }
}

impl UglifyJs2Filter {
    pub fn new(uglifyjs_bin: impl Into<PathBuf>) -> Self {
        UglifyJs2Filter {
            uglifyjs_bin: uglifyjs_bin.into(),
            node_bin: None,
            node_paths: Vec::new(),
            options: UglifyOptions::default(),
            runner: SystemCommandRunner,
        }
    }
}

impl<R: CommandRunner> UglifyJs2Filter<R> {
    /// Runs uglifyjs through this interpreter instead of executing it directly.
    pub fn with_node_bin(mut self, node_bin: impl Into<PathBuf>) -> Self {
        self.node_bin = Some(node_bin.into());
        self
    }

    pub fn with_node_paths<I, P>(mut self, node_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.node_paths = node_paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_node_path(mut self, node_path: impl Into<PathBuf>) -> Self {
        self.node_paths.push(node_path.into());
        self
    }

    pub fn with_options(mut self, options: UglifyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_runner<T: CommandRunner>(self, runner: T) -> UglifyJs2Filter<T> {
        UglifyJs2Filter {
            uglifyjs_bin: self.uglifyjs_bin,
            node_bin: self.node_bin,
            node_paths: self.node_paths,
            options: self.options,
            runner,
        }
    }

    pub fn options(&self) -> &UglifyOptions {
        &self.options
    }

    pub fn node_paths(&self) -> &[PathBuf] {
        &self.node_paths
    }

    /// Program and flags, without the trailing `-o <output> <input>`.
    pub fn build_command(&self) -> Result<Vec<String>, FilterError> {
        let (program, args) = self.program_and_args()?;
        let mut commandline = vec![program];
        commandline.extend(args);
        Ok(commandline)
    }

    fn program_and_args(&self) -> Result<(String, Vec<String>), FilterError> {
        let uglifyjs_bin = path_str(&self.uglifyjs_bin)?.to_string();
        let (program, mut args) = match &self.node_bin {
            Some(node_bin) => (path_str(node_bin)?.to_string(), vec![uglifyjs_bin]),
            None => (uglifyjs_bin, Vec::new()),
        };
        args.extend(self.options.to_args());
        Ok((program, args))
    }

    /// Minifies `source` without going through an asset of the caller's own.
    pub fn minify(&self, source: &str) -> Result<String, FilterError> {
        let mut asset = StringAsset::new(source);
        self.filter_dump(&mut asset)?;
        Ok(asset.into_content())
    }

    fn node_path_env(&self) -> Result<Option<String>, FilterError> {
        if self.node_paths.is_empty() {
            return Ok(None);
        }
        let paths = self
            .node_paths
            .iter()
            .map(|p| path_str(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(paths.join(NODE_PATH_SEPARATOR)))
    }
}

impl<R: CommandRunner> Filter for UglifyJs2Filter<R> {
    fn filter_load(&self, _asset: &mut dyn Asset) -> Result<(), FilterError> {
        Ok(())
    }

    fn filter_dump(&self, asset: &mut dyn Asset) -> Result<(), FilterError> {
        let (program, mut args) = self.program_and_args()?;

        // Both paths are removed when they go out of scope, whichever way we leave.
        let input = write_temp_input(asset.content())?;
        let output = Builder::new()
            .prefix("uglifyjs2_out")
            .tempfile()?
            .into_temp_path();

        args.push("-o".to_string());
        args.push(path_str(&output)?.to_string());
        args.push(path_str(&input)?.to_string());

        let printable = std::iter::once(&program)
            .chain(&args)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        debug!("Running {}", printable);

        let node_path = self.node_path_env()?;
        let env: Vec<(&str, &str)> = node_path
            .as_deref()
            .map(|p| ("NODE_PATH", p))
            .into_iter()
            .collect();

        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let result = self.runner.run(&program, &args, &env);
        if let Err(e) = input.close() {
            warn!("Could not remove uglifyjs input file: {}", e);
        }
        let proc = result?;

        match proc.code {
            Some(0) => {}
            Some(EXIT_NOT_FOUND) => {
                warn!("{} exited with {}: {}", program, EXIT_NOT_FOUND, proc.stderr.trim());
                return Err(FilterError::RuntimeResolution);
            }
            code => {
                warn!("uglifyjs failed with exit code {:?}", code);
                return Err(FilterError::ProcessExecution {
                    command: printable,
                    code,
                    stdout: proc.stdout,
                    stderr: proc.stderr,
                    input: asset.content().to_string(),
                });
            }
        }

        if !output.exists() {
            return Err(FilterError::OutputMissing);
        }

        let minified = String::from_utf8(fs::read(&output)?)
            .map_err(|_| FilterError::NotUtf8("uglifyjs output".to_string()))?;
        debug!(
            "uglifyjs shrank {} bytes to {} bytes",
            asset.content().len(),
            minified.len()
        );
        asset.set_content(minified);
        output.close()?;

        Ok(())
    }
}

fn write_temp_input(content: &str) -> Result<TempPath, FilterError> {
    let mut file = Builder::new().prefix("uglifyjs2_in").tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

fn path_str(path: &Path) -> Result<&str, FilterError> {
    path.to_str()
        .ok_or_else(|| FilterError::InvalidPath(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ProcessOutput;
    use crate::options::Toggle;
    use std::cell::RefCell;

    #[derive(Clone, Copy)]
    enum Outcome {
        /// Writes the given text to the `-o` path and exits 0.
        Minify(&'static str),
        /// Writes partial output, then exits with the code.
        Fail(i32),
        /// Exits 0 after deleting its output file.
        LoseOutput,
        /// Writes raw bytes to the `-o` path and exits 0.
        MinifyBytes(&'static [u8]),
        /// Deletes its own input file, then exits with the code.
        EatInput(i32),
        Signal,
    }

    #[derive(Debug, Clone)]
    struct Invocation {
        command: String,
        args: Vec<String>,
        env: Vec<(String, String)>,
        input_content: String,
    }

    impl Invocation {
        fn output_path(&self) -> PathBuf {
            let pos = self.args.iter().position(|a| a == "-o").unwrap();
            PathBuf::from(&self.args[pos + 1])
        }

        fn input_path(&self) -> PathBuf {
            PathBuf::from(self.args.last().unwrap())
        }
    }

    struct MockCommandRunner {
        outcome: Outcome,
        calls: RefCell<Vec<Invocation>>,
    }

    impl MockCommandRunner {
        fn new(outcome: Outcome) -> Self {
            MockCommandRunner {
                outcome,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn last_call(&self) -> Invocation {
            self.calls.borrow().last().cloned().unwrap()
        }
    }

    impl CommandRunner for &MockCommandRunner {
        fn run(
            &self,
            command: &str,
            args: &[&str],
            env: &[(&str, &str)],
        ) -> Result<ProcessOutput, FilterError> {
            let invocation = Invocation {
                command: command.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                env: env
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                input_content: fs::read_to_string(args.last().unwrap()).unwrap(),
            };
            let output_path = invocation.output_path();
            self.calls.borrow_mut().push(invocation);

            let code = match self.outcome {
                Outcome::Minify(text) => {
                    fs::write(&output_path, text).unwrap();
                    Some(0)
                }
                Outcome::Fail(code) => {
                    fs::write(&output_path, "partial").unwrap();
                    Some(code)
                }
                Outcome::LoseOutput => {
                    fs::remove_file(&output_path).unwrap();
                    Some(0)
                }
                Outcome::Signal => None,
                Outcome::MinifyBytes(bytes) => {
                    fs::write(&output_path, bytes).unwrap();
                    Some(0)
                }
                Outcome::EatInput(code) => {
                    fs::remove_file(args.last().unwrap()).unwrap();
                    Some(code)
                }
            };

            Ok(ProcessOutput {
                code,
                stdout: "tool stdout".to_string(),
                stderr: "tool stderr".to_string(),
            })
        }
    }

    fn filter_with(runner: &MockCommandRunner) -> UglifyJs2Filter<&MockCommandRunner> {
        UglifyJs2Filter::default().with_runner(runner)
    }

    fn assert_temp_files_gone(call: &Invocation) {
        assert!(!call.input_path().exists(), "input temp file leaked");
        assert!(!call.output_path().exists(), "output temp file leaked");
    }

    #[test]
    fn test_build_command_defaults() {
        let filter = UglifyJs2Filter::default();
        assert_eq!(filter.build_command().unwrap(), vec!["/usr/bin/uglifyjs"]);
    }

    #[test]
    fn test_build_command_with_node_and_options() {
        let options = UglifyOptions::builder()
            .compress(Toggle::EnabledWithValue("unused=false".to_string()))
            .mangle(true)
            .comments(Toggle::EnabledWithValue("some".to_string()))
            .define("A", "1")
            .define("B", "2")
            .build();
        let filter = UglifyJs2Filter::new("/opt/uglify/bin/uglifyjs")
            .with_node_bin("/usr/local/bin/node")
            .with_options(options);

        assert_eq!(
            filter.build_command().unwrap(),
            vec![
                "/usr/local/bin/node",
                "/opt/uglify/bin/uglifyjs",
                "--compress",
                "unused=false",
                "--mangle",
                "--comments",
                "some",
                "--define",
                "A=1,B=2",
            ]
        );
    }

    #[test]
    fn test_load_leaves_content_untouched() {
        let runner = MockCommandRunner::new(Outcome::Minify("x"));
        let filter = filter_with(&runner);
        let mut asset = StringAsset::new("var a = 1;");

        filter.filter_load(&mut asset).unwrap();

        assert_eq!(asset.content(), "var a = 1;");
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_dump_replaces_content() {
        let runner = MockCommandRunner::new(Outcome::Minify("minified();"));
        let filter =
            filter_with(&runner).with_options(UglifyOptions::builder().mangle(true).build());
        let mut asset = StringAsset::new("function minified() {}\nminified();\n");

        filter.filter_dump(&mut asset).unwrap();

        assert_eq!(asset.content(), "minified();");
        let call = runner.last_call();
        assert_eq!(call.command, "/usr/bin/uglifyjs");
        assert_eq!(call.input_content, "function minified() {}\nminified();\n");
        assert_eq!(call.args[0], "--mangle");
        assert_eq!(call.args[1], "-o");
        assert_eq!(call.args.len(), 4);
        assert!(call.env.is_empty());
        assert_temp_files_gone(&call);
    }

    #[test]
    fn test_dump_temp_file_names() {
        let runner = MockCommandRunner::new(Outcome::Minify(""));
        filter_with(&runner).minify("1;").unwrap();

        let call = runner.last_call();
        let name = |p: PathBuf| p.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name(call.input_path()).starts_with("uglifyjs2_in"));
        assert!(name(call.output_path()).starts_with("uglifyjs2_out"));
        assert_ne!(call.input_path(), call.output_path());
    }

    #[test]
    fn test_dump_with_node_bin_runs_interpreter() {
        let runner = MockCommandRunner::new(Outcome::Minify("ok"));
        let filter = filter_with(&runner).with_node_bin("/usr/bin/node");

        assert_eq!(filter.minify("ok ;").unwrap(), "ok");

        let call = runner.last_call();
        assert_eq!(call.command, "/usr/bin/node");
        assert_eq!(call.args[0], "/usr/bin/uglifyjs");
        assert_eq!(call.args[1], "-o");
    }

    #[test]
    fn test_dump_sets_node_path() {
        let runner = MockCommandRunner::new(Outcome::Minify("ok"));
        let filter = filter_with(&runner)
            .with_node_paths(["/srv/app/node_modules"])
            .add_node_path("/usr/lib/node_modules");

        filter.minify("ok;").unwrap();

        let call = runner.last_call();
        let expected = format!(
            "/srv/app/node_modules{}/usr/lib/node_modules",
            NODE_PATH_SEPARATOR
        );
        assert_eq!(call.env, vec![("NODE_PATH".to_string(), expected)]);
        assert_eq!(filter.node_paths().len(), 2);
    }

    #[test]
    fn test_dump_not_found_code_is_runtime_resolution() {
        let runner = MockCommandRunner::new(Outcome::Fail(127));
        let mut asset = StringAsset::new("a();");

        let result = filter_with(&runner).filter_dump(&mut asset);

        assert!(matches!(result, Err(FilterError::RuntimeResolution)));
        assert_eq!(asset.content(), "a();");
        assert_temp_files_gone(&runner.last_call());
    }

    #[test]
    fn test_dump_tool_failure_carries_diagnostics() {
        let runner = MockCommandRunner::new(Outcome::Fail(1));
        let filter =
            filter_with(&runner).with_options(UglifyOptions::builder().beautify(true).build());
        let mut asset = StringAsset::new("var = ;");

        let err = filter.filter_dump(&mut asset).unwrap_err();

        let call = runner.last_call();
        match err {
            FilterError::ProcessExecution {
                command,
                code,
                stdout,
                stderr,
                input,
            } => {
                assert_eq!(code, Some(1));
                assert_eq!(stdout, "tool stdout");
                assert_eq!(stderr, "tool stderr");
                assert_eq!(input, "var = ;");
                assert_eq!(
                    command,
                    format!(
                        "/usr/bin/uglifyjs --beautify -o {} {}",
                        call.output_path().display(),
                        call.input_path().display()
                    )
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(asset.content(), "var = ;");
        assert_temp_files_gone(&call);
    }

    #[test]
    fn test_dump_killed_by_signal_is_tool_failure() {
        let runner = MockCommandRunner::new(Outcome::Signal);

        let err = filter_with(&runner).minify("loop();").unwrap_err();

        assert!(matches!(err, FilterError::ProcessExecution { code: None, .. }));
        assert_temp_files_gone(&runner.last_call());
    }

    #[test]
    fn test_dump_missing_output() {
        let runner = MockCommandRunner::new(Outcome::LoseOutput);
        let mut asset = StringAsset::new("a();");

        let result = filter_with(&runner).filter_dump(&mut asset);

        assert!(matches!(result, Err(FilterError::OutputMissing)));
        assert_eq!(asset.content(), "a();");
        assert_temp_files_gone(&runner.last_call());
    }

    #[test]
    fn test_dump_output_not_utf8() {
        let runner = MockCommandRunner::new(Outcome::MinifyBytes(b"var s='caf\xe9';"));
        let mut asset = StringAsset::new("var s = 'cafe';");

        let err = filter_with(&runner).filter_dump(&mut asset).unwrap_err();

        assert!(matches!(err, FilterError::NotUtf8(_)));
        assert_eq!(asset.content(), "var s = 'cafe';");
        assert_temp_files_gone(&runner.last_call());
    }

    #[test]
    fn test_dump_tool_failure_wins_over_input_cleanup() {
        let runner = MockCommandRunner::new(Outcome::EatInput(2));

        let err = filter_with(&runner).minify("a();").unwrap_err();

        assert!(matches!(err, FilterError::ProcessExecution { code: Some(2), .. }));
        assert_temp_files_gone(&runner.last_call());
    }

    #[cfg(unix)]
    mod system {
        use super::*;
        use tempfile::tempdir;

        // Stands in for uglifyjs: strips whitespace from the input into `-o`.
        // Always run through /bin/sh so the script never needs to be executable.
        const FAKE_UGLIFYJS: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
    case "$1" in
        -o) out="$2"; shift 2 ;;
        --fail) echo "boom" >&2; exit 2 ;;
        *) last="$1"; shift ;;
    esac
done
tr -d ' \n' < "$last" > "$out"
"#;

        fn fake_uglifyjs(dir: &Path) -> PathBuf {
            let path = dir.join("uglifyjs");
            fs::write(&path, FAKE_UGLIFYJS).unwrap();
            path
        }

        #[test]
        fn test_system_runner_end_to_end() {
            let temp_dir = tempdir().unwrap();
            let filter = UglifyJs2Filter::new(fake_uglifyjs(temp_dir.path()))
                .with_node_bin("/bin/sh")
                .with_options(UglifyOptions::builder().compress(true).mangle(true).build());

            assert_eq!(filter.minify("var a = 1;\nvar b = 2;\n").unwrap(), "vara=1;varb=2;");
        }

        #[test]
        fn test_system_runner_exports_node_path() {
            let temp_dir = tempdir().unwrap();
            let script = temp_dir.path().join("uglifyjs");
            fs::write(
                &script,
                "while [ \"$1\" != -o ]; do shift; done\nprintf %s \"$NODE_PATH\" > \"$2\"\n",
            )
            .unwrap();
            let filter = UglifyJs2Filter::new(script)
                .with_node_bin("/bin/sh")
                .with_node_paths(["/srv/node_modules"]);

            assert_eq!(filter.minify("f();").unwrap(), "/srv/node_modules");
        }

        #[test]
        fn test_system_runner_missing_interpreter() {
            let temp_dir = tempdir().unwrap();
            let filter = UglifyJs2Filter::new(fake_uglifyjs(temp_dir.path()))
                .with_node_bin(temp_dir.path().join("no-such-node"));

            assert!(matches!(filter.minify("f();"), Err(FilterError::RuntimeResolution)));
        }

        #[test]
        fn test_system_runner_tool_error() {
            let temp_dir = tempdir().unwrap();
            let filter = UglifyJs2Filter::new(fake_uglifyjs(temp_dir.path()))
                .with_node_bin("/bin/sh")
                .with_options(UglifyOptions::builder().wrap("--fail").build());

            match filter.minify("f();") {
                Err(FilterError::ProcessExecution { code, stderr, input, .. }) => {
                    assert_eq!(code, Some(2));
                    assert_eq!(stderr, "boom\n");
                    assert_eq!(input, "f();");
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }
}
