use crate::asset::{Asset, FileAsset};
use crate::command::CommandRunner;
use crate::error::FilterError;
use crate::filter::{Filter, UglifyJs2Filter};
use log::{debug, info};
use path_clean::PathClean;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A script to minify and where it sits relative to the input it came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct InputFile {
    pub path: PathBuf,
    pub relative: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub files: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

impl Summary {
    pub fn saved(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

fn is_script(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|e| e == "js")
}

/// Leading components of a glob pattern that contain no wildcard.
fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        let has_wildcard = component
            .as_os_str()
            .to_string_lossy()
            .contains(|c: char| matches!(c, '*' | '?' | '['));
        if has_wildcard {
            return base;
        }
        base.push(component);
    }
    base.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Expands files, directories (searched recursively for `.js` files) and glob
/// patterns into a list of inputs sorted and de-duplicated by path. When a file
/// is reached more than once, the first input that named it decides `relative`.
pub fn collect_inputs(inputs: &[String]) -> Result<Vec<InputFile>, FilterError> {
    let mut found: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            for entry in WalkDir::new(path) {
                let entry = entry?;
                if is_script(entry.path()) {
                    let relative = entry
                        .path()
                        .strip_prefix(path)
                        .unwrap_or(entry.path())
                        .to_path_buf();
                    found.entry(entry.path().to_path_buf()).or_insert(relative);
                }
            }
        } else if path.is_file() {
            let relative = path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| path.to_path_buf());
            found.entry(path.to_path_buf()).or_insert(relative);
        } else {
            let base = glob_base(input);
            let mut matched = false;
            for entry in glob::glob(input)?.filter_map(Result::ok) {
                if entry.is_file() {
                    matched = true;
                    let relative = entry.strip_prefix(&base).unwrap_or(&entry).to_path_buf();
                    found.entry(entry).or_insert(relative);
                }
            }
            if !matched {
                return Err(FilterError::NoInput(input.clone()));
            }
        }
    }

    debug!("Collected inputs: {:?}", found.keys().collect::<Vec<_>>());
    Ok(found
        .into_iter()
        .map(|(path, relative)| InputFile { path, relative })
        .collect())
}

/// Where the minified copy of `input` goes: mirrored under `output_dir`, or in place.
pub fn destination(input: &InputFile, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => dir.join(&input.relative).clean(),
        None => input.path.clone(),
    }
}

/// Dumps every input through `filter` and writes the results unless `dry_run`.
/// Stops at the first failure.
pub fn minify_files<R: CommandRunner>(
    filter: &UglifyJs2Filter<R>,
    inputs: &[InputFile],
    output_dir: Option<&Path>,
    dry_run: bool,
) -> Result<Summary, FilterError> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    for input in inputs {
        let dest = destination(input, output_dir);
        if let Some(first) = claimed.insert(dest.clone(), &input.path) {
            return Err(FilterError::DuplicateOutput {
                dest,
                first: first.to_path_buf(),
                second: input.path.clone(),
            });
        }
    }

    let mut summary = Summary::default();

    for input in inputs {
        let mut asset = FileAsset::load(&input.path)?;
        let before = asset.content().len() as u64;

        filter.filter_load(&mut asset)?;
        filter.filter_dump(&mut asset)?;

        let after = asset.content().len() as u64;
        summary.files += 1;
        summary.bytes_before += before;
        summary.bytes_after += after;

        let dest = destination(input, output_dir);
        if dry_run {
            info!("Would write {} ({} -> {} bytes)", dest.display(), before, after);
        } else {
            info!("Writing {} ({} -> {} bytes)", dest.display(), before, after);
            asset.write_to(&dest)?;
        }
    }

    Ok(summary)
}
