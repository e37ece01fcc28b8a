use crate::error::FilterError;
use std::fs;
use std::path::{Path, PathBuf};

/// Content that filters read and replace.
pub trait Asset {
    fn content(&self) -> &str;
    fn set_content(&mut self, content: String);
}

/// An asset that only lives in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringAsset {
    content: String,
}

impl StringAsset {
    pub fn new(content: impl Into<String>) -> Self {
        StringAsset {
            content: content.into(),
        }
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

impl Asset for StringAsset {
    fn content(&self) -> &str {
        &self.content
    }

    fn set_content(&mut self, content: String) {
        self.content = content;
    }
}

/// An asset loaded from disk. Changes stay in memory until `write_to` is called.
#[derive(Debug, Clone)]
pub struct FileAsset {
    path: PathBuf,
    content: String,
}

impl FileAsset {
    pub fn load(path: &Path) -> Result<Self, FilterError> {
        let content = String::from_utf8(fs::read(path)?)
            .map_err(|_| FilterError::NotUtf8(path.display().to_string()))?;
        Ok(FileAsset {
            path: path.to_path_buf(),
            content,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_to(&self, dest: &Path) -> Result<(), FilterError> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, &self.content)?;
        Ok(())
    }
}

impl Asset for FileAsset {
    fn content(&self) -> &str {
        &self.content
    }

    fn set_content(&mut self, content: String) {
        self.content = content;
    }
}
