//! Project descriptor loading.
//!
//! A project is described by a small TOML file (`uberjar.toml` by default).
//! The directory holding the file is the project root; every configured path
//! is resolved against it. Sections other than `[project]` are optional and
//! fall back to conventional defaults, so a minimal file only names the
//! project:
//!
//! ```toml
//! [project]
//! name = "demo"
//! ```

use crate::exclusion::MatchMode;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;

/// Default file name of the project descriptor.
pub const PROJECT_FILE: &str = "uberjar.toml";

/// Extension shared by every archive this crate reads or writes.
pub const ARCHIVE_EXTENSION: &str = "jar";

/// Errors raised while loading a project descriptor.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The descriptor file does not exist.
    #[error("project file not found at {path}")]
    NotFound {
        /// Where the file was expected.
        path: Utf8PathBuf,
    },

    /// The descriptor file could not be read.
    #[error("cannot read project file {path}: {source}")]
    Read {
        /// Path to the descriptor.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The descriptor is not valid TOML or has unknown fields.
    #[error("invalid project file {path}: {source}")]
    Parse {
        /// Path to the descriptor.
        path: Utf8PathBuf,
        /// The TOML deserialisation error.
        #[source]
        source: toml::de::Error,
    },

    /// The descriptor parsed but holds an unusable value.
    #[error("invalid project file {path}: {reason}")]
    Invalid {
        /// Path to the descriptor.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },
}

/// A development-only dependency, left out of the standalone archive.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DevDependency {
    /// `group/artifact` coordinate; the group is optional.
    pub coordinate: String,
    /// Declared version; `SNAPSHOT` matches timestamped snapshot builds.
    pub version: String,
}

/// The `[project]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
struct ProjectSection {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    main: Option<String>,
}

/// Project-relative directory layout.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory holding the dependency jars.
    pub library: Utf8PathBuf,
    /// Compiled classes.
    pub classes: Utf8PathBuf,
    /// Resources copied into the primary jar.
    pub resources: Utf8PathBuf,
    /// Sources copied into the primary jar.
    pub source: Utf8PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            library: Utf8PathBuf::from("lib"),
            classes: Utf8PathBuf::from("classes"),
            resources: Utf8PathBuf::from("resources"),
            source: Utf8PathBuf::from("src"),
        }
    }
}

/// The `[exclusion]` table.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExclusionConfig {
    /// How development dependency patterns match jar file names.
    pub match_mode: MatchMode,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
struct ProjectFile {
    project: ProjectSection,
    #[serde(default)]
    paths: PathsConfig,
    #[serde(default)]
    exclusion: ExclusionConfig,
    #[serde(default, rename = "dev-dependencies")]
    dev_dependencies: Vec<DevDependency>,
}

/// A resolved project: root directory plus its descriptor settings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectDescriptor {
    root: Utf8PathBuf,
    name: String,
    version: Option<String>,
    main: Option<String>,
    paths: PathsConfig,
    exclusion: ExclusionConfig,
    dev_dependencies: Vec<DevDependency>,
}

impl ProjectDescriptor {
    /// Create a descriptor with default layout and no development
    /// dependencies.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            version: None,
            main: None,
            paths: PathsConfig::default(),
            exclusion: ExclusionConfig::default(),
            dev_dependencies: Vec::new(),
        }
    }

    /// Add a development dependency.
    #[must_use]
    pub fn with_dev_dependency(mut self, coordinate: &str, version: &str) -> Self {
        self.dev_dependencies.push(DevDependency {
            coordinate: coordinate.to_owned(),
            version: version.to_owned(),
        });
        self
    }

    /// Override the directory layout.
    #[must_use]
    pub fn with_paths(mut self, paths: PathsConfig) -> Self {
        self.paths = paths;
        self
    }

    /// Set the version written to the primary jar manifest.
    #[must_use]
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_owned());
        self
    }

    /// Set the `Main-Class` written to the primary jar manifest.
    #[must_use]
    pub fn with_main(mut self, main: &str) -> Self {
        self.main = Some(main.to_owned());
        self
    }

    /// Select how exclusion patterns match.
    #[must_use]
    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.exclusion.match_mode = match_mode;
        self
    }

    /// Load the descriptor at `path`; its parent directory becomes the root.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::NotFound`] if the file is missing,
    /// [`ProjectError::Read`] if it cannot be read, and
    /// [`ProjectError::Parse`] or [`ProjectError::Invalid`] if its contents
    /// are unusable.
    pub fn load(path: &Utf8Path) -> Result<Self, ProjectError> {
        if !path.exists() {
            return Err(ProjectError::NotFound {
                path: path.to_owned(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ProjectError::Read {
            path: path.to_owned(),
            source,
        })?;
        let root = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .map_or_else(|| Utf8PathBuf::from("."), Utf8Path::to_owned);
        Self::from_toml(root, &contents, path)
    }

    /// Parse descriptor `contents` for a project rooted at `root`. `origin`
    /// names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Parse`] for malformed TOML and
    /// [`ProjectError::Invalid`] for an unusable project name.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use uberjar::project::ProjectDescriptor;
    ///
    /// let project = ProjectDescriptor::from_toml(
    ///     "/work/demo".into(),
    ///     "[project]\nname = \"demo\"\n",
    ///     Utf8Path::new("uberjar.toml"),
    /// )?;
    /// assert_eq!(project.standalone_path().as_str(), "/work/demo/demo-standalone.jar");
    /// # Ok::<(), uberjar::project::ProjectError>(())
    /// ```
    pub fn from_toml(
        root: Utf8PathBuf,
        contents: &str,
        origin: &Utf8Path,
    ) -> Result<Self, ProjectError> {
        let file: ProjectFile = toml::from_str(contents).map_err(|source| ProjectError::Parse {
            path: origin.to_owned(),
            source,
        })?;
        validate_name(&file.project.name).map_err(|reason| ProjectError::Invalid {
            path: origin.to_owned(),
            reason,
        })?;
        let ProjectFile {
            project,
            paths,
            exclusion,
            dev_dependencies,
        } = file;
        Ok(Self {
            version: project.version,
            main: project.main,
            dev_dependencies,
            ..Self::new(root, project.name)
                .with_paths(paths)
                .with_match_mode(exclusion.match_mode)
        })
    }

    /// Project root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared project version, if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// `Main-Class` for the primary jar manifest, if any.
    #[must_use]
    pub fn main(&self) -> Option<&str> {
        self.main.as_deref()
    }

    /// Configured exclusion match mode.
    #[must_use]
    pub fn match_mode(&self) -> MatchMode {
        self.exclusion.match_mode
    }

    /// Development-only dependencies in declaration order.
    #[must_use]
    pub fn dev_dependencies(&self) -> &[DevDependency] {
        &self.dev_dependencies
    }

    /// Directory holding the dependency jars.
    #[must_use]
    pub fn library_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.paths.library)
    }

    /// Directories packaged into the primary jar, in precedence order.
    #[must_use]
    pub fn primary_dirs(&self) -> [Utf8PathBuf; 3] {
        [
            self.root.join(&self.paths.classes),
            self.root.join(&self.paths.resources),
            self.root.join(&self.paths.source),
        ]
    }

    /// Path of the project's own primary jar.
    #[must_use]
    pub fn primary_path(&self) -> Utf8PathBuf {
        self.root.join(format!("{}.{ARCHIVE_EXTENSION}", self.name))
    }

    /// Path of the standalone archive.
    #[must_use]
    pub fn standalone_path(&self) -> Utf8PathBuf {
        self.root
            .join(format!("{}-standalone.{ARCHIVE_EXTENSION}", self.name))
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("project name must not be empty".to_owned());
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(format!("project name {name:?} must not contain path separators"));
    }
    Ok(())
}
