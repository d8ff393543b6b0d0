//! Standalone jar aggregation.
//!
//! Builds one self-contained jar from a project's primary jar and the jars
//! of its dependencies. Entries are deduplicated first-writer-wins with the
//! project's own jar processed first, development-only dependencies are left
//! out, and Plexus component descriptors are merged instead of overwritten.
//!
//! Modules, leaves first:
//!
//! - [`registry`]: names already written to the output.
//! - [`descriptor`]: extraction and merging of component descriptors.
//! - [`output`]: the staged, append-only output archive.
//! - [`copier`]: streaming copy of one source archive.
//! - [`exclusion`]: development dependency matching.
//! - [`project`]: the `uberjar.toml` project descriptor.
//! - [`primary`]: production of the project's primary jar.
//! - [`aggregate`]: the driver tying the above together.

pub mod aggregate;
pub mod copier;
pub mod descriptor;
pub mod digest;
pub mod error;
pub mod exclusion;
pub mod output;
pub mod primary;
pub mod project;
pub mod registry;
pub mod report;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use aggregate::{aggregate, aggregate_archives};
pub use error::{AggregateError, Result};
pub use project::ProjectDescriptor;
pub use report::{AggregateReport, Progress};
