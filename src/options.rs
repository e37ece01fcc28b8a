/// A flag that is off, on, or on with an explicit argument.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Toggle {
    #[default]
    Disabled,
    Enabled,
    EnabledWithValue(String),
}

impl Toggle {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Toggle::Disabled)
    }
}

impl From<bool> for Toggle {
    fn from(enabled: bool) -> Self {
        if enabled {
            Toggle::Enabled
        } else {
            Toggle::Disabled
        }
    }
}

/// Command-line options passed to uglifyjs. Build with [`UglifyOptions::builder`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UglifyOptions {
    compress: Toggle,
    beautify: bool,
    mangle: bool,
    screw_ie8: bool,
    comments: Toggle,
    wrap: Option<String>,
    defines: Vec<String>,
}

impl UglifyOptions {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    pub fn compress(&self) -> &Toggle {
        &self.compress
    }

    pub fn beautify(&self) -> bool {
        self.beautify
    }

    pub fn mangle(&self) -> bool {
        self.mangle
    }

    pub fn screw_ie8(&self) -> bool {
        self.screw_ie8
    }

    pub fn comments(&self) -> &Toggle {
        &self.comments
    }

    pub fn wrap(&self) -> Option<&str> {
        self.wrap.as_deref()
    }

    pub fn defines(&self) -> &[String] {
        &self.defines
    }

    /// Flags in the order uglifyjs invocations have always been written:
    /// compress, beautify, mangle, screw-ie8, comments, wrap, define.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        match &self.compress {
            Toggle::Disabled => {}
            Toggle::Enabled => args.push("--compress".to_string()),
            Toggle::EnabledWithValue(value) if value.is_empty() => {}
            Toggle::EnabledWithValue(value) => {
                args.extend(["--compress".to_string(), value.clone()])
            }
        }

        if self.beautify {
            args.push("--beautify".to_string());
        }

        if self.mangle {
            args.push("--mangle".to_string());
        }

        if self.screw_ie8 {
            args.push("--screw-ie8".to_string());
        }

        match &self.comments {
            Toggle::Disabled => {}
            Toggle::Enabled => args.extend(["--comments".to_string(), "all".to_string()]),
            Toggle::EnabledWithValue(value) if value.is_empty() => {}
            Toggle::EnabledWithValue(value) => {
                args.extend(["--comments".to_string(), value.clone()])
            }
        }

        if let Some(wrap) = self.wrap.as_deref().filter(|w| !w.is_empty()) {
            args.extend(["--wrap".to_string(), wrap.to_string()]);
        }

        if !self.defines.is_empty() {
            args.extend(["--define".to_string(), self.defines.join(",")]);
        }

        args
    }
}

#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    options: UglifyOptions,
}

impl OptionsBuilder {
    pub fn compress(mut self, compress: impl Into<Toggle>) -> Self {
        self.options.compress = compress.into();
        self
    }

    pub fn beautify(mut self, beautify: bool) -> Self {
        self.options.beautify = beautify;
        self
    }

    pub fn mangle(mut self, mangle: bool) -> Self {
        self.options.mangle = mangle;
        self
    }

    pub fn screw_ie8(mut self, screw_ie8: bool) -> Self {
        self.options.screw_ie8 = screw_ie8;
        self
    }

    pub fn comments(mut self, comments: impl Into<Toggle>) -> Self {
        self.options.comments = comments.into();
        self
    }

    pub fn wrap(mut self, wrap: impl Into<String>) -> Self {
        self.options.wrap = Some(wrap.into());
        self
    }

    /// Replaces all defines with pre-formatted `KEY=VALUE` entries.
    pub fn defines<I, S>(mut self, defines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.defines = defines.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a single `KEY=VALUE` define.
    pub fn define(mut self, key: &str, value: &str) -> Self {
        self.options.defines.push(format!("{}={}", key, value));
        self
    }

    pub fn build(self) -> UglifyOptions {
        self.options
    }
}
