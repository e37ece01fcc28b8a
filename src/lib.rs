//! Minify JavaScript assets by running UglifyJS 2 as an external process.
//!
//! ```no_run
//! use uglify_filter::{UglifyJs2Filter, UglifyOptions};
//!
//! let filter = UglifyJs2Filter::new("/usr/bin/uglifyjs")
//!     .with_options(UglifyOptions::builder().compress(true).mangle(true).build());
//! let minified = filter.minify("var answer = 42;").unwrap();
//! ```

pub mod asset;
pub mod batch;
pub mod command;
pub mod config;
pub mod error;
pub mod filter;
pub mod options;

pub use asset::{Asset, FileAsset, StringAsset};
pub use command::{CommandRunner, ProcessOutput, SystemCommandRunner};
pub use error::FilterError;
pub use filter::{Filter, UglifyJs2Filter, DEFAULT_UGLIFYJS_BIN};
pub use options::{OptionsBuilder, Toggle, UglifyOptions};
