use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::error::{Result, VerifyError};

pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// How to build an image: a build context directory plus its build definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    context: PathBuf,
    dockerfile: String,
    tag: Option<String>,
    build_args: Vec<(String, String)>,
    no_cache: bool,
}

impl ImageSpec {
    pub fn new(context: impl Into<PathBuf>) -> Self {
        Self {
            context: context.into(),
            dockerfile: DEFAULT_DOCKERFILE.to_string(),
            tag: None,
            build_args: Vec::new(),
            no_cache: false,
        }
    }

    #[must_use]
    pub fn with_dockerfile(mut self, dockerfile: impl Into<String>) -> Self {
        self.dockerfile = dockerfile.into();
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn with_build_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.build_args.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    pub fn context(&self) -> &Path {
        &self.context
    }

    pub fn dockerfile(&self) -> &str {
        &self.dockerfile
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn build_args(&self) -> &[(String, String)] {
        &self.build_args
    }

    pub const fn no_cache(&self) -> bool {
        self.no_cache
    }

    /// Path of the build definition inside the context.
    pub fn dockerfile_path(&self) -> PathBuf {
        self.context.join(&self.dockerfile)
    }

    /// Check the context locally so a broken one never reaches the runtime.
    ///
    /// # Errors
    /// Returns [`VerifyError::Build`] if the context is not a directory or
    /// the build definition is missing.
    pub fn validate(&self) -> Result<()> {
        if !self.context.is_dir() {
            return Err(VerifyError::build(
                &self.context,
                "build context is not a directory",
            ));
        }
        let dockerfile = self.dockerfile_path();
        if !dockerfile.is_file() {
            return Err(VerifyError::build(
                &self.context,
                format!("build definition {} not found", dockerfile.display()),
            ));
        }
        Ok(())
    }
}

/// A built image, identified by the id the runtime reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    id: String,
}

impl ImageHandle {
    /// # Errors
    /// Returns [`VerifyError::Build`] for an empty id.
    pub fn new(context: &Path, id: impl Into<String>) -> Result<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(VerifyError::build(context, "runtime returned an empty image id"));
        }
        Ok(Self { id })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id without the `sha256:` prefix, truncated like `docker images` prints it.
    pub fn short_id(&self) -> &str {
        let id = self.id.strip_prefix("sha256:").unwrap_or(&self.id);
        id.get(..12).unwrap_or(id)
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// A running instance started from an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceHandle {
    id: String,
}

impl InstanceHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into().trim().to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
