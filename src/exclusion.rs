//! Exclusion of development-only dependency jars.
//!
//! Each development dependency yields a rule matching jar file names of the
//! shape `<artifact>-<version>.jar`. A `SNAPSHOT` marker in the declared
//! version stands for the timestamped build identifier that resolved snapshot
//! jars carry (`1.0-SNAPSHOT` matches `1.0-20230101.120000-3`).

use crate::error::{AggregateError, Result};
use crate::project::DevDependency;
use log::debug;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Marker in a declared version that stands for a resolved snapshot build.
pub const SNAPSHOT_MARKER: &str = "SNAPSHOT";

/// Pattern for a resolved snapshot build: `yyyyMMdd.HHmmss-<build>`.
const SNAPSHOT_BUILD_PATTERN: &str = r"\d{8}\.\d{6}-\d+";

/// How a rule's pattern must match a candidate file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// The pattern may occur anywhere in the file name. Tolerates extra
    /// qualifiers but can over-exclude names that merely contain a match.
    #[default]
    Substring,
    /// The pattern must cover the whole file name.
    Anchored,
}

/// One piece of a declared version.
#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionSegment {
    Literal(String),
    SnapshotBuild,
}

/// Structured matcher for a declared dependency version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMatcher {
    segments: Vec<VersionSegment>,
}

impl VersionMatcher {
    /// Split `declared` into literal text and snapshot wildcards.
    ///
    /// # Examples
    ///
    /// ```
    /// use uberjar::exclusion::VersionMatcher;
    ///
    /// assert!(VersionMatcher::parse("1.0-SNAPSHOT").is_snapshot());
    /// assert!(!VersionMatcher::parse("1.0").is_snapshot());
    /// ```
    #[must_use]
    pub fn parse(declared: &str) -> Self {
        let mut segments = Vec::new();
        for (index, literal) in declared.split(SNAPSHOT_MARKER).enumerate() {
            if index > 0 {
                segments.push(VersionSegment::SnapshotBuild);
            }
            if !literal.is_empty() {
                segments.push(VersionSegment::Literal(literal.to_owned()));
            }
        }
        Self { segments }
    }

    /// Return true if the version contains a snapshot wildcard.
    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        self.segments.contains(&VersionSegment::SnapshotBuild)
    }

    /// Regex source for this version; literal text is escaped.
    #[must_use]
    pub fn pattern(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                VersionSegment::Literal(text) => regex::escape(text),
                VersionSegment::SnapshotBuild => SNAPSHOT_BUILD_PATTERN.to_owned(),
            })
            .collect()
    }
}

/// Return the artifact part of a `group/artifact` coordinate, or the whole
/// coordinate when it has no group.
///
/// # Examples
///
/// ```
/// use uberjar::exclusion::artifact_name;
///
/// assert_eq!(artifact_name("org.clojure/swank-clojure"), "swank-clojure");
/// assert_eq!(artifact_name("lein-difftest"), "lein-difftest");
/// ```
#[must_use]
pub fn artifact_name(coordinate: &str) -> &str {
    coordinate.rsplit('/').next().unwrap_or(coordinate)
}

/// Name-matching rule derived from one development dependency.
#[derive(Debug, Clone)]
pub struct ExclusionRule {
    artifact: String,
    regex: Regex,
}

impl ExclusionRule {
    /// Build a substring-matching rule for `coordinate` at `declared_version`.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::InvalidExclusion`] if the derived pattern
    /// does not compile.
    ///
    /// # Examples
    ///
    /// ```
    /// use uberjar::exclusion::ExclusionRule;
    ///
    /// let rule = ExclusionRule::build("group/foo", "1.0-SNAPSHOT")?;
    /// assert!(rule.matches("foo-1.0-20230101.120000-3.jar"));
    /// assert!(!rule.matches("foo-2.0.jar"));
    /// # Ok::<(), uberjar::error::AggregateError>(())
    /// ```
    pub fn build(coordinate: &str, declared_version: &str) -> Result<Self> {
        Self::with_mode(coordinate, declared_version, MatchMode::Substring)
    }

    /// Build a rule with an explicit [`MatchMode`].
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::InvalidExclusion`] if the derived pattern
    /// does not compile.
    pub fn with_mode(coordinate: &str, declared_version: &str, mode: MatchMode) -> Result<Self> {
        let artifact = artifact_name(coordinate).to_owned();
        let version = VersionMatcher::parse(declared_version);
        let body = format!(r"{}-{}\.jar", regex::escape(&artifact), version.pattern());
        let source = match mode {
            MatchMode::Substring => body,
            MatchMode::Anchored => format!("^(?:{body})$"),
        };
        let regex = Regex::new(&source).map_err(|err| AggregateError::InvalidExclusion {
            coordinate: coordinate.to_owned(),
            source: err,
        })?;
        Ok(Self { artifact, regex })
    }

    /// Return true if `file_name` matches this rule.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }
}

/// Return true if the file name of `candidate` matches any of `rules`.
#[must_use]
pub fn excluded(candidate: &Path, rules: &[ExclusionRule]) -> bool {
    let Some(file_name) = candidate.file_name() else {
        return false;
    };
    let file_name = file_name.to_string_lossy();
    rules.iter().any(|rule| rule.matches(&file_name))
}

/// The set of rules for one project.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    rules: Vec<ExclusionRule>,
}

impl ExclusionFilter {
    /// Build one rule per development dependency.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::InvalidExclusion`] for the first dependency
    /// whose pattern does not compile.
    pub fn from_dependencies(dependencies: &[DevDependency], mode: MatchMode) -> Result<Self> {
        let rules = dependencies
            .iter()
            .map(|dep| ExclusionRule::with_mode(&dep.coordinate, &dep.version, mode))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Return true if `candidate` should be left out of the aggregation.
    #[must_use]
    pub fn excluded(&self, candidate: &Path) -> bool {
        self.matching_rule(candidate).is_some()
    }

    fn matching_rule(&self, candidate: &Path) -> Option<&ExclusionRule> {
        let file_name = candidate.file_name()?.to_string_lossy();
        self.rules.iter().find(|rule| rule.matches(&file_name))
    }

    /// Split `candidates` into kept and excluded jars, preserving order.
    #[must_use]
    pub fn partition(&self, candidates: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let mut kept = Vec::new();
        let mut dropped = Vec::new();
        for candidate in candidates {
            match self.matching_rule(&candidate) {
                Some(rule) => {
                    debug!(
                        "excluding {} as development dependency {}",
                        candidate.display(),
                        rule.artifact
                    );
                    dropped.push(candidate);
                }
                None => kept.push(candidate),
            }
        }
        (kept, dropped)
    }
}
