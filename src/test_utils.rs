//! Shared test utilities for building and inspecting jar fixtures.
//!
//! Enabled for unit tests and, through the `test-support` feature, for the
//! behaviour suites under `tests/`.

#![expect(
    clippy::expect_used,
    reason = "fixture helpers fail the calling test on I/O errors"
)]

use crate::descriptor::DESCRIPTOR_PATH;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A jar under construction for a test.
#[derive(Debug, Clone, Default)]
pub struct JarFixture {
    entries: Vec<(String, Vec<u8>)>,
}

impl JarFixture {
    /// Start an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file entry.
    #[must_use]
    pub fn entry(mut self, name: &str, contents: impl AsRef<[u8]>) -> Self {
        self.entries.push((name.to_owned(), contents.as_ref().to_vec()));
        self
    }

    /// Add a directory entry; `name` should end with `/`.
    #[must_use]
    pub fn directory(mut self, name: &str) -> Self {
        self.entries.push((name.to_owned(), Vec::new()));
        self
    }

    /// Add a component descriptor declaring one component per role.
    #[must_use]
    pub fn descriptor(self, roles: &[&str]) -> Self {
        let xml = descriptor_xml(roles);
        self.entry(DESCRIPTOR_PATH, xml)
    }

    /// Write the jar to `path`, entries in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write(&self, path: &Path) {
        let file = File::create(path).expect("create fixture jar");
        let mut writer = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, contents) in &self.entries {
            if name.ends_with('/') {
                writer
                    .add_directory(name.as_str(), options)
                    .expect("add fixture directory");
            } else {
                writer
                    .start_file(name.as_str(), options)
                    .expect("start fixture entry");
                writer.write_all(contents).expect("write fixture entry");
            }
        }
        writer.finish().expect("finish fixture jar");
    }
}

/// Build a descriptor document with one `<component>` per role.
#[must_use]
pub fn descriptor_xml(roles: &[&str]) -> String {
    let components: String = roles
        .iter()
        .map(|role| {
            format!(
                "    <component>\n      <role>{role}</role>\n      \
                 <implementation>{role}Impl</implementation>\n    </component>\n"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<component-set>\n  \
         <components>\n{components}  </components>\n</component-set>\n"
    )
}

/// List entry names of the jar at `path` in central-directory order.
///
/// # Panics
///
/// Panics if the jar cannot be read.
#[must_use]
pub fn entry_names(path: &Path) -> Vec<String> {
    let file = File::open(path).expect("open jar");
    let mut archive = ZipArchive::new(file).expect("read jar");
    (0..archive.len())
        .map(|index| {
            archive
                .by_index_raw(index)
                .expect("read entry header")
                .name()
                .to_owned()
        })
        .collect()
}

/// Read the contents of entry `name` from the jar at `path`.
///
/// # Panics
///
/// Panics if the jar cannot be read.
#[must_use]
pub fn entry_contents(path: &Path, name: &str) -> Option<Vec<u8>> {
    let file = File::open(path).expect("open jar");
    let mut archive = ZipArchive::new(file).expect("read jar");
    let mut entry = archive.by_name(name).ok()?;
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents).expect("read entry");
    Some(contents)
}

/// Read entry `name` as UTF-8 text.
///
/// # Panics
///
/// Panics if the jar cannot be read or the entry is not UTF-8.
#[must_use]
pub fn entry_text(path: &Path, name: &str) -> Option<String> {
    entry_contents(path, name).map(|bytes| String::from_utf8(bytes).expect("UTF-8 entry"))
}
