//! Runtime configuration.
//!
//! Settings are collected once, before the isolate is created, and pushed
//! into the native system property store so every endpoint created later
//! observes them.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{GraalError, GraalResult};

/// Path of the native image to load
pub const LIBRARY_ENV: &str = "DXFEED_GRAAL_LIBRARY";
/// Java-properties file whose entries become system properties
pub const PROPERTIES_FILE_ENV: &str = "DXFEED_PROPERTIES_FILE";
/// Inline `key=value` pairs separated by `;`
pub const PROPERTIES_ENV: &str = "DXFEED_PROPERTIES";

/// Process-wide runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Native image location. `None` loads the platform default name through
    /// the dynamic loader search path.
    pub library_path: Option<PathBuf>,

    /// System properties pushed into the isolate at creation.
    pub properties: BTreeMap<String, String>,
}

impl RuntimeConfig {
    /// Create an empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> GraalResult<Self> {
        Self::from_vars(|name| std::env::var_os(name))
    }

    /// Load configuration through a variable lookup.
    ///
    /// The properties file is applied first, then inline properties, so an
    /// inline value overrides the same key from the file.
    pub fn from_vars<F>(lookup: F) -> GraalResult<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut config = Self::new();

        if let Some(path) = lookup(LIBRARY_ENV).filter(|p| !p.is_empty()) {
            config.library_path = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup(PROPERTIES_FILE_ENV).filter(|p| !p.is_empty()) {
            config.load_properties_file(Path::new(&path))?;
        }

        if let Some(inline) = lookup(PROPERTIES_ENV) {
            let inline = inline.into_string().map_err(|_| {
                GraalError::config(format!("{} is not valid UTF-8", PROPERTIES_ENV))
            })?;
            config.properties.extend(parse_inline(&inline)?);
        }

        Ok(config)
    }

    /// Merge entries of a Java-properties style file into this config.
    pub fn load_properties_file(&mut self, path: &Path) -> GraalResult<()> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            GraalError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.properties.extend(parse_properties(&text));
        Ok(())
    }

    /// Set the native image location
    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// Set a system property, replacing any earlier value
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The library to open: the configured path or the platform default name.
    pub fn resolved_library_path(&self) -> OsString {
        match &self.library_path {
            Some(path) => path.clone().into_os_string(),
            None => dxfeed_graal_sys::default_library_name(),
        }
    }
}

/// Parse Java-properties text: `key=value` or `key: value`, `#`/`!`
/// comments, blank lines ignored. Keys without a separator map to "".
fn parse_properties(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .map(|line| match line.find(['=', ':']) {
            Some(idx) => (
                line[..idx].trim_end().to_string(),
                line[idx + 1..].trim_start().to_string(),
            ),
            None => (line.to_string(), String::new()),
        })
        .collect()
}

fn parse_inline(text: &str) -> GraalResult<Vec<(String, String)>> {
    text.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                GraalError::config(format!("Expected key=value in {}, got '{}'", PROPERTIES_ENV, pair))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(GraalError::config(format!("Empty key in {}", PROPERTIES_ENV)));
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}
