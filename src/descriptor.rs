//! Merging of Plexus component descriptors.
//!
//! Several dependencies may each ship a `META-INF/plexus/components.xml`
//! listing the components they contribute. Overwriting would keep only the
//! first list, so the descriptors are parsed and their component lists
//! concatenated into one document written at the end of aggregation.
//!
//! Component nodes are opaque: they are kept as the XML event sequence read
//! from the source document and written back unchanged.

use crate::error::{AggregateError, Result};
use crate::output::OutputArchive;
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use log::debug;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::borrow::Cow;
use std::io::{Read, Seek, Write};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

/// Reserved entry name holding the component descriptor.
pub const DESCRIPTOR_PATH: &str = "META-INF/plexus/components.xml";

const ROOT_ELEMENT: &[u8] = b"component-set";
const LIST_ELEMENT: &[u8] = b"components";

/// One top-level component element, kept verbatim as XML events.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentNode {
    events: Vec<Event<'static>>,
}

impl ComponentNode {
    /// Serialise the node back to XML text.
    ///
    /// # Errors
    ///
    /// Returns the writer error if an event cannot be serialised.
    pub fn to_xml(&self) -> std::result::Result<String, quick_xml::Error> {
        let mut writer = Writer::new(Vec::new());
        self.write_to(&mut writer)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    fn write_to<W: Write>(
        &self,
        writer: &mut Writer<W>,
    ) -> std::result::Result<(), quick_xml::Error> {
        for event in &self.events {
            writer.write_event(event.clone())?;
        }
        Ok(())
    }
}

/// Component nodes extracted from one archive's descriptor.
pub type DescriptorFragment = Vec<ComponentNode>;

/// Concatenation of every fragment collected during aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedDescriptor {
    components: Vec<ComponentNode>,
}

impl MergedDescriptor {
    /// Concatenate `fragments` in input order. Identical-looking components
    /// are kept; no semantic deduplication is attempted.
    #[must_use]
    pub fn merge<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = DescriptorFragment>,
    {
        let mut merged = Self::default();
        for fragment in fragments {
            merged.push(fragment);
        }
        merged
    }

    /// Append one fragment after everything collected so far.
    pub fn push(&mut self, fragment: DescriptorFragment) {
        self.components.extend(fragment);
    }

    /// Return true if no component has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of collected components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// The collected components in merge order.
    #[must_use]
    pub fn components(&self) -> &[ComponentNode] {
        &self.components
    }

    /// Serialise as a single `<component-set><components>` document.
    ///
    /// # Errors
    ///
    /// Returns the writer error if an event cannot be serialised.
    pub fn to_xml(&self) -> std::result::Result<Vec<u8>, quick_xml::Error> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Text(BytesText::new("\n")))?;
        writer.write_event(Event::Start(BytesStart::new("component-set")))?;
        writer.write_event(Event::Text(BytesText::new("\n  ")))?;
        writer.write_event(Event::Start(BytesStart::new("components")))?;
        for component in &self.components {
            writer.write_event(Event::Text(BytesText::new("\n    ")))?;
            component.write_to(&mut writer)?;
        }
        writer.write_event(Event::Text(BytesText::new("\n  ")))?;
        writer.write_event(Event::End(BytesEnd::new("components")))?;
        writer.write_event(Event::Text(BytesText::new("\n")))?;
        writer.write_event(Event::End(BytesEnd::new("component-set")))?;
        writer.write_event(Event::Text(BytesText::new("\n")))?;
        Ok(writer.into_inner())
    }
}

/// Extract the component list from `source`, if it carries a descriptor.
///
/// `source_path` is only used to name the archive in errors.
///
/// # Errors
///
/// Returns [`AggregateError::DescriptorMalformed`] if the descriptor exists
/// but is not a component list, or [`AggregateError::EntryUnreadable`] if it
/// cannot be read.
pub fn extract<R: Read + Seek>(
    source: &mut ZipArchive<R>,
    source_path: &Path,
) -> Result<Option<DescriptorFragment>> {
    let mut entry = match source.by_name(DESCRIPTOR_PATH) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(AggregateError::EntryUnreadable {
                path: source_path.to_path_buf(),
                entry: DESCRIPTOR_PATH.to_owned(),
                reason: e.to_string(),
            });
        }
    };

    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .map_err(|e| AggregateError::EntryUnreadable {
            path: source_path.to_path_buf(),
            entry: DESCRIPTOR_PATH.to_owned(),
            reason: e.to_string(),
        })?;

    let fragment =
        parse_fragment(&content).map_err(|reason| AggregateError::DescriptorMalformed {
            path: source_path.to_path_buf(),
            descriptor: DESCRIPTOR_PATH,
            reason,
        })?;
    debug!(
        "{} contributes {} component(s)",
        source_path.display(),
        fragment.len()
    );
    Ok(Some(fragment))
}

/// Parse a descriptor document into its component nodes.
///
/// The document must have a `<component-set>` root containing a
/// `<components>` element; the element children of `<components>` are
/// returned in document order. The encoding is taken from a byte order mark,
/// else from the XML declaration, else UTF-8.
///
/// # Errors
///
/// Returns a description of the problem when the document cannot be decoded
/// in its declared encoding, is not well-formed, uses entities it does not
/// define portably, or lacks the expected structure.
///
/// # Examples
///
/// ```
/// use uberjar::descriptor::parse_fragment;
///
/// let xml = b"<component-set><components><component/></components></component-set>";
/// assert_eq!(parse_fragment(xml).map(|f| f.len()), Ok(1));
/// assert!(parse_fragment(b"<plugin/>").is_err());
/// ```
pub fn parse_fragment(xml: &[u8]) -> std::result::Result<DescriptorFragment, String> {
    let text = decode_document(xml)?;
    let mut reader = Reader::from_str(&text);

    open_root(&mut reader)?;
    let components = if open_component_list(&mut reader)? {
        read_components(&mut reader)?
    } else {
        Vec::new()
    };
    close_document(&mut reader)?;

    Ok(components)
}

/// Decode `xml` to text using its byte order mark or declared encoding.
fn decode_document(xml: &[u8]) -> std::result::Result<Cow<'_, str>, String> {
    let (encoding, body) = match Encoding::for_bom(xml) {
        Some((encoding, bom_length)) => (encoding, xml.get(bom_length..).unwrap_or_default()),
        None => (sniff_encoding(xml)?, xml),
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| format!("descriptor is not valid {}", encoding.name()))
}

/// Encoding of a document without a byte order mark.
fn sniff_encoding(xml: &[u8]) -> std::result::Result<&'static Encoding, String> {
    match xml.get(..4) {
        Some([b'<', 0, b'?', 0]) => return Ok(UTF_16LE),
        Some([0, b'<', 0, b'?']) => return Ok(UTF_16BE),
        _ => {}
    }
    let mut reader = Reader::from_reader(xml);
    let Ok(Event::Decl(decl)) = reader.read_event() else {
        return Ok(UTF_8);
    };
    match decl.encoding() {
        None => Ok(UTF_8),
        Some(Ok(label)) => Encoding::for_label(label.trim_ascii())
            .map(Encoding::output_encoding)
            .ok_or_else(|| {
                format!(
                    "unsupported encoding {:?}",
                    String::from_utf8_lossy(&label)
                )
            }),
        Some(Err(e)) => Err(format!("invalid XML declaration: {e}")),
    }
}

/// Reject references to entities other than the predefined ones; a custom
/// entity's definition is not carried into the merged document.
fn check_references(event: &Event<'_>) -> std::result::Result<(), String> {
    let unresolved = |e: quick_xml::Error| format!("unresolved reference: {e}");
    match event {
        Event::Text(text) => text.unescape().map(drop).map_err(unresolved),
        Event::Start(element) | Event::Empty(element) => {
            for attribute in element.attributes() {
                let attribute = attribute.map_err(|e| format!("XML error: {e}"))?;
                attribute.unescape_value().map_err(unresolved)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn next_event<'a>(reader: &mut Reader<&'a [u8]>) -> std::result::Result<Event<'a>, String> {
    reader
        .read_event()
        .map_err(|e| format!("XML error at byte {}: {e}", reader.buffer_position()))
}

/// Return true for events that carry no structure (prolog noise).
fn is_ignorable(event: &Event<'_>) -> bool {
    match event {
        Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => true,
        Event::Text(text) => is_blank(text),
        _ => false,
    }
}

fn is_blank(text: &BytesText<'_>) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

fn open_root(reader: &mut Reader<&[u8]>) -> std::result::Result<(), String> {
    loop {
        let event = next_event(reader)?;
        match event {
            Event::Start(ref e) if e.name().as_ref() == ROOT_ELEMENT => return Ok(()),
            Event::Empty(ref e) if e.name().as_ref() == ROOT_ELEMENT => {
                return Err("<component-set> has no <components> element".to_owned());
            }
            Event::Start(ref e) | Event::Empty(ref e) => {
                return Err(format!(
                    "expected <component-set> root, found <{}>",
                    String::from_utf8_lossy(e.name().as_ref())
                ));
            }
            Event::Eof => return Err("document has no root element".to_owned()),
            ref other if is_ignorable(other) => {}
            _ => return Err("unexpected content before the root element".to_owned()),
        }
    }
}

/// Advance to the `<components>` child of the root, skipping any sibling
/// elements that precede it. Returns false for an empty `<components/>`.
fn open_component_list(reader: &mut Reader<&[u8]>) -> std::result::Result<bool, String> {
    loop {
        let event = next_event(reader)?;
        match event {
            Event::Start(ref e) if e.name().as_ref() == LIST_ELEMENT => return Ok(true),
            Event::Empty(ref e) if e.name().as_ref() == LIST_ELEMENT => return Ok(false),
            Event::Start(ref e) => {
                reader
                    .read_to_end(e.name())
                    .map_err(|err| format!("XML error: {err}"))?;
            }
            Event::End(_) | Event::Eof => {
                return Err("<component-set> has no <components> element".to_owned());
            }
            _ => {}
        }
    }
}

fn read_components(
    reader: &mut Reader<&[u8]>,
) -> std::result::Result<DescriptorFragment, String> {
    let mut components = Vec::new();
    loop {
        let event = next_event(reader)?;
        check_references(&event)?;
        match event {
            Event::Start(_) => {
                let node = read_node(reader, event.into_owned())?;
                components.push(node);
            }
            Event::Empty(_) => components.push(ComponentNode {
                events: vec![event.into_owned()],
            }),
            Event::End(_) => return Ok(components),
            Event::Eof => {
                return Err("unexpected end of document inside <components>".to_owned());
            }
            Event::Text(ref text) if !is_blank(text) => {
                return Err("unexpected text inside <components>".to_owned());
            }
            _ => {}
        }
    }
}

/// Collect the events of one element, starting from its opening tag.
fn read_node(
    reader: &mut Reader<&[u8]>,
    start: Event<'static>,
) -> std::result::Result<ComponentNode, String> {
    let mut events = vec![start];
    let mut depth = 1_usize;
    while depth > 0 {
        let event = next_event(reader)?;
        check_references(&event)?;
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            Event::Eof => {
                return Err("unexpected end of document inside a component".to_owned());
            }
            _ => {}
        }
        events.push(event.into_owned());
    }
    Ok(ComponentNode { events })
}

/// Consume the rest of the document, checking it is well-formed.
fn close_document(reader: &mut Reader<&[u8]>) -> std::result::Result<(), String> {
    let mut depth = 1_usize;
    loop {
        let event = next_event(reader)?;
        match event {
            Event::Start(_) if depth > 0 => depth += 1,
            Event::End(_) if depth > 0 => depth -= 1,
            Event::Eof if depth == 0 => return Ok(()),
            Event::Eof => {
                return Err("unexpected end of document: root element not closed".to_owned());
            }
            ref other if depth == 0 && !is_ignorable(other) => {
                return Err("unexpected content after the root element".to_owned());
            }
            _ => {}
        }
    }
}

/// Write `merged` at the reserved path of `sink`.
///
/// Does nothing when no component was collected. Must be called after every
/// source archive has been copied so the descriptor is the last entry.
///
/// # Errors
///
/// Returns [`AggregateError::WriteFailed`] if the entry cannot be written.
pub fn write<W: Write + Seek>(
    merged: &MergedDescriptor,
    sink: &mut OutputArchive<W>,
) -> Result<()> {
    if merged.is_empty() {
        debug!("no component descriptors collected");
        return Ok(());
    }

    let body = merged
        .to_xml()
        .map_err(|e| AggregateError::write_failed(sink.path(), e))?;
    sink.add_bytes(DESCRIPTOR_PATH, SimpleFileOptions::default(), &body)?;
    debug!("wrote {} merged component(s)", merged.len());
    Ok(())
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
