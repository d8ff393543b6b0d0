//! Streaming copy of source archive entries into the output archive.
//!
//! Entries are decompressed from the source and recompressed by the writer.
//! The compressed size stored by the source is never reused: some jar tools
//! record a wrong value there, and consumers trusting it read corrupt data.

use crate::error::{AggregateError, Result};
use crate::output::OutputArchive;
use crate::registry::EntryRegistry;
use log::trace;
use std::collections::BTreeSet;
use std::io::{Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive};

/// Entries at least this large need zip64 headers.
const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFF;

const CHUNK_SIZE: usize = 8192;

/// Per-entry metadata carried over to the output.
#[derive(Debug, Clone, Copy)]
struct EntryMeta {
    compression: CompressionMethod,
    size: u64,
    modified: Option<DateTime>,
    unix_mode: Option<u32>,
}

impl EntryMeta {
    /// Fresh writer options for this entry. Only the method, timestamp and
    /// mode survive; sizes and CRC are recomputed from the copied bytes.
    fn options(self) -> SimpleFileOptions {
        let method = match self.compression {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let mut options = SimpleFileOptions::default()
            .compression_method(method)
            .large_file(self.size >= ZIP64_THRESHOLD);
        if let Some(modified) = self.modified {
            options = options.last_modified_time(modified);
        }
        if let Some(mode) = self.unix_mode {
            options = options.unix_permissions(mode);
        }
        options
    }
}

/// Copy every entry of `source` not yet in `registry` into `sink`.
///
/// Entries are visited in central-directory order. Names already present in
/// the registry (including the reserved descriptor path) are skipped without
/// error. Returns the names this archive added.
///
/// # Errors
///
/// Returns [`AggregateError::EntryUnreadable`] if an entry cannot be opened or
/// decompressed, and [`AggregateError::WriteFailed`] if the sink rejects a
/// write. Either aborts the aggregation.
pub fn copy_entries<R, W>(
    source: &mut ZipArchive<R>,
    source_path: &Path,
    registry: &mut EntryRegistry,
    sink: &mut OutputArchive<W>,
) -> Result<BTreeSet<String>>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let mut added = BTreeSet::new();

    for index in 0..source.len() {
        let mut entry = source
            .by_index(index)
            .map_err(|e| AggregateError::EntryUnreadable {
                path: source_path.to_path_buf(),
                entry: format!("#{index}"),
                reason: e.to_string(),
            })?;
        let name = entry.name().to_owned();

        if registry.already_seen(&name) {
            trace!(
                "skipping {name} from {}: already present",
                source_path.display()
            );
            continue;
        }

        let meta = EntryMeta {
            compression: entry.compression(),
            size: entry.size(),
            modified: entry.last_modified(),
            unix_mode: entry.unix_mode(),
        };

        if entry.is_dir() {
            sink.add_directory(&name, meta.options())?;
        } else {
            sink.start_entry(&name, meta.options())?;
            stream_entry(&mut entry, sink, source_path, &name)?;
        }

        registry.record(&name);
        added.insert(name);
    }

    trace!("{} added {} entries", source_path.display(), added.len());
    Ok(added)
}

/// Pump the decompressed bytes of one entry into the sink in fixed chunks.
fn stream_entry<W: Write + Seek>(
    entry: &mut impl Read,
    sink: &mut OutputArchive<W>,
    source_path: &Path,
    name: &str,
) -> Result<()> {
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let bytes_read = entry
            .read(&mut buffer)
            .map_err(|e| AggregateError::EntryUnreadable {
                path: source_path.to_path_buf(),
                entry: name.to_owned(),
                reason: e.to_string(),
            })?;
        if bytes_read == 0 {
            return Ok(());
        }
        sink.write_chunk(buffer.get(..bytes_read).unwrap_or_default())?;
    }
}
