use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    core::{
        assertions::Assertion,
        image::{DEFAULT_DOCKERFILE, ImageSpec},
        os::OsFamily,
    },
    error::{Result, VerifyError},
};

/// One named expectation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Check {
    pub name: String,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub expect: Assertion,
}

/// A declarative verification suite, usually loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Suite {
    /// Build context; relative paths are resolved against the suite file.
    #[serde(default = "default_context")]
    pub context: PathBuf,
    #[serde(default = "default_dockerfile")]
    pub dockerfile: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub build_args: BTreeMap<String, String>,
    #[serde(default)]
    pub no_cache: bool,
    #[serde(default)]
    pub os_family: OsFamily,
    /// Stop at the first failed check.
    #[serde(default)]
    pub fail_fast: bool,
    pub checks: Vec<Check>,
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_dockerfile() -> String {
    DEFAULT_DOCKERFILE.to_string()
}

impl Suite {
    /// Load a suite file.
    ///
    /// # Errors
    /// Returns [`VerifyError::Suite`] if the file cannot be read or parsed,
    /// or declares no checks.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| VerifyError::Suite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&text, base).map_err(|e| match e {
            VerifyError::Suite { message, .. } => VerifyError::Suite {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse suite YAML, resolving a relative context against `base_dir`.
    ///
    /// # Errors
    /// Returns [`VerifyError::Suite`] on malformed YAML or an empty check list.
    pub fn from_yaml(text: &str, base_dir: &Path) -> Result<Self> {
        let invalid = |message: String| VerifyError::Suite {
            path: PathBuf::from("<inline>"),
            message,
        };

        let mut suite: Self = serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;
        if suite.checks.is_empty() {
            return Err(invalid("suite declares no checks".to_string()));
        }
        if suite.context.is_relative() {
            suite.context = base_dir.join(&suite.context);
        }
        Ok(suite)
    }

    pub fn image_spec(&self) -> ImageSpec {
        let mut spec = ImageSpec::new(&self.context)
            .with_dockerfile(&self.dockerfile)
            .with_no_cache(self.no_cache);
        if let Some(tag) = &self.tag {
            spec = spec.with_tag(tag);
        }
        for (key, value) in &self.build_args {
            spec = spec.with_build_arg(key, value);
        }
        spec
    }
}
