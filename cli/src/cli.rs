//! CLI argument definitions for the `uberjar` command.

use camino::Utf8PathBuf;
use clap::Parser;
use uberjar::project::PROJECT_FILE;

/// Build a standalone jar from a project and its dependency jars.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "uberjar")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build a standalone jar from a project and its dependency jars.\n\n",
    "The project's own jar is packaged from its classes, resources and source ",
    "directories (or taken from --primary), then every jar under the library ",
    "directory is folded in. The first jar to carry an entry wins, so project ",
    "classes take precedence over dependency classes. Development-only ",
    "dependencies listed in the project file are left out, and Plexus ",
    "component descriptors are merged into one.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build <name>-standalone.jar for the project in the current directory:\n",
    "    $ uberjar\n\n",
    "  Use a jar built by another tool as the project jar:\n",
    "    $ uberjar --primary target/demo.jar\n\n",
    "  Show which jars would be included:\n",
    "    $ uberjar --dry-run\n",
))]
pub struct Cli {
    /// Path to the project file.
    #[arg(short, long, value_name = "FILE", default_value = PROJECT_FILE)]
    pub project: Utf8PathBuf,

    /// Use an existing jar as the project jar instead of packaging the
    /// project directories.
    #[arg(long, value_name = "JAR")]
    pub primary: Option<Utf8PathBuf>,

    /// Show the archive plan and exit without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the result as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
