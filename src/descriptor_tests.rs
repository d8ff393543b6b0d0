//! Tests for descriptor parsing, merging and writing.

use super::*;
use crate::test_utils::{JarFixture, descriptor_xml, entry_names, entry_text};
use rstest::{fixture, rstest};
use std::fs::File;
use std::io::Cursor;
use tempfile::TempDir;

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("temp dir creation succeeds")
}

fn fragment(roles: &[&str]) -> DescriptorFragment {
    parse_fragment(descriptor_xml(roles).as_bytes()).expect("valid descriptor")
}

/// Role text of each component, in order.
fn roles_of(xml: &[u8]) -> Vec<String> {
    let text = std::str::from_utf8(xml).expect("UTF-8");
    text.split("<role>")
        .skip(1)
        .filter_map(|rest| rest.split("</role>").next())
        .map(str::to_owned)
        .collect()
}

#[test]
fn parses_components_in_document_order() {
    let components = fragment(&["A", "B"]);
    assert_eq!(components.len(), 2);
    let first = components[0].to_xml().expect("serialise");
    assert!(first.starts_with("<component>"), "{first}");
    assert!(first.contains("<role>A</role>"), "{first}");
    assert!(components[1].to_xml().expect("serialise").contains("<role>B</role>"));
}

#[rstest]
#[case::self_closing("<component-set><components/></component-set>")]
#[case::open_and_close("<component-set><components>\n</components></component-set>")]
fn empty_component_list_yields_empty_fragment(#[case] xml: &str) {
    assert_eq!(parse_fragment(xml.as_bytes()), Ok(Vec::new()));
}

#[test]
fn skips_sibling_elements_before_the_list() {
    let xml = "<component-set><lifecycles><lifecycle/></lifecycles>\
               <components><component/></components></component-set>";
    assert_eq!(parse_fragment(xml.as_bytes()).map(|f| f.len()), Ok(1));
}

#[test]
fn attributes_and_nested_content_survive_verbatim() {
    let xml = r#"<component-set><components><component hint="x"><configuration><a>1</a></configuration></component></components></component-set>"#;
    let components = parse_fragment(xml.as_bytes()).expect("valid descriptor");
    assert_eq!(
        components[0].to_xml().expect("serialise"),
        r#"<component hint="x"><configuration><a>1</a></configuration></component>"#
    );
}

#[rstest]
#[case::wrong_root("<plugin><components/></plugin>")]
#[case::missing_list("<component-set><other/></component-set>")]
#[case::empty_root("<component-set/>")]
#[case::unclosed("<component-set><components><component>")]
#[case::mismatched("<component-set><components></component-set>")]
#[case::trailing_element("<component-set><components/></component-set><extra/>")]
#[case::stray_text("<component-set><components>oops</components></component-set>")]
#[case::no_root("")]
fn malformed_documents_are_rejected(#[case] xml: &str) {
    assert!(parse_fragment(xml.as_bytes()).is_err(), "{xml:?}");
}

#[test]
fn undeclared_non_utf8_documents_are_rejected() {
    let xml = b"<component-set><components><component><role>\xff</role></component></components></component-set>";
    let error = parse_fragment(xml).expect_err("invalid UTF-8");
    assert!(error.contains("UTF-8"), "{error}");
}

#[test]
fn declared_latin1_documents_are_decoded() {
    let xml = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\
        <component-set><components><component><role>caf\xe9</role></component>\
        </components></component-set>";
    let merged = MergedDescriptor::merge([parse_fragment(xml).expect("valid Latin-1")]);
    assert_eq!(roles_of(&merged.to_xml().expect("serialise")), vec!["caf\u{e9}"]);
}

#[test]
fn utf16_documents_with_byte_order_mark_are_decoded() {
    let text = descriptor_xml(&["A", "B"]).replace("UTF-8", "UTF-16");
    let mut xml = vec![0xff, 0xfe];
    xml.extend(text.encode_utf16().flat_map(u16::to_le_bytes));

    let fragment = parse_fragment(&xml).expect("valid UTF-16");
    let merged = MergedDescriptor::merge([fragment]);
    assert_eq!(roles_of(&merged.to_xml().expect("serialise")), vec!["A", "B"]);
}

#[test]
fn unknown_declared_encoding_is_rejected() {
    let xml = b"<?xml version=\"1.0\" encoding=\"x-no-such-charset\"?><component-set><components/></component-set>";
    let error = parse_fragment(xml).expect_err("unknown encoding");
    assert!(error.contains("x-no-such-charset"), "{error}");
}

#[rstest]
#[case::in_text("<component><role>&custom;</role></component>")]
#[case::in_attribute("<component hint=\"&custom;\"><role>A</role></component>")]
fn custom_entity_references_are_rejected(#[case] component: &str) {
    let xml = format!(
        "<!DOCTYPE component-set [<!ENTITY custom \"value\">]>\
         <component-set><components>{component}</components></component-set>"
    );
    let error = parse_fragment(xml.as_bytes()).expect_err("custom entity");
    assert!(error.contains("custom"), "{error}");
}

#[test]
fn predefined_and_character_references_are_kept() {
    let xml = "<component-set><components><component><role>a&amp;b&#233;</role>\
               </component></components></component-set>";
    let merged = MergedDescriptor::merge([parse_fragment(xml.as_bytes()).expect("valid")]);
    assert_eq!(roles_of(&merged.to_xml().expect("serialise")), vec!["a&amp;b&#233;"]);
}

#[test]
fn merge_concatenates_in_input_order() {
    let merged = MergedDescriptor::merge([fragment(&["A"]), Vec::new(), fragment(&["C"])]);
    assert_eq!(merged.len(), 2);
    let xml = merged.to_xml().expect("serialise");
    assert_eq!(roles_of(&xml), vec!["A", "C"]);
}

#[test]
fn merge_keeps_identical_components() {
    let merged = MergedDescriptor::merge([fragment(&["A"]), fragment(&["A"])]);
    assert_eq!(merged.len(), 2);
}

#[test]
fn merged_document_parses_back_to_the_same_components() {
    let merged = MergedDescriptor::merge([fragment(&["A", "B"]), fragment(&["C"])]);
    let reparsed = parse_fragment(&merged.to_xml().expect("serialise")).expect("reparse");
    assert_eq!(reparsed, merged.components());
}

#[rstest]
fn extract_returns_none_without_descriptor(temp_dir: TempDir) {
    let jar = temp_dir.path().join("plain.jar");
    JarFixture::new().entry("a.class", b"a").write(&jar);
    let mut archive = ZipArchive::new(File::open(&jar).expect("open")).expect("read");

    assert_eq!(extract(&mut archive, &jar).expect("extract"), None);
}

#[rstest]
fn extract_reads_fragment(temp_dir: TempDir) {
    let jar = temp_dir.path().join("plugin.jar");
    JarFixture::new().descriptor(&["A", "B"]).write(&jar);
    let mut archive = ZipArchive::new(File::open(&jar).expect("open")).expect("read");

    let extracted = extract(&mut archive, &jar).expect("extract").expect("fragment");
    assert_eq!(extracted.len(), 2);
}

#[rstest]
fn extract_reports_malformed_descriptor_with_archive_path(temp_dir: TempDir) {
    let jar = temp_dir.path().join("broken.jar");
    JarFixture::new()
        .entry(DESCRIPTOR_PATH, "<component-set><components>")
        .write(&jar);
    let mut archive = ZipArchive::new(File::open(&jar).expect("open")).expect("read");

    match extract(&mut archive, &jar) {
        Err(AggregateError::DescriptorMalformed {
            path, descriptor, ..
        }) => {
            assert_eq!(path, jar);
            assert_eq!(descriptor, DESCRIPTOR_PATH);
        }
        other => panic!("expected DescriptorMalformed, got {other:?}"),
    }
}

#[rstest]
fn write_is_a_no_op_when_empty(temp_dir: TempDir) {
    let out = temp_dir.path().join("out.jar");
    let mut sink = OutputArchive::new(Cursor::new(Vec::new()), &out);
    write(&MergedDescriptor::default(), &mut sink).expect("write");

    assert_eq!(sink.entries_written(), 0);
}

#[rstest]
fn write_emits_one_entry_at_reserved_path(temp_dir: TempDir) {
    let out = temp_dir.path().join("out.jar");
    let mut sink = OutputArchive::new(Cursor::new(Vec::new()), &out);
    sink.add_bytes("a.class", SimpleFileOptions::default(), b"a")
        .expect("entry");
    let merged = MergedDescriptor::merge([fragment(&["A"]), fragment(&["C"])]);
    write(&merged, &mut sink).expect("write");
    let bytes = sink.finish().expect("finish").into_inner();
    std::fs::write(&out, bytes).expect("persist");

    assert_eq!(entry_names(&out), vec!["a.class", DESCRIPTOR_PATH]);
    let body = entry_text(&out, DESCRIPTOR_PATH).expect("descriptor present");
    assert!(body.starts_with("<?xml"), "{body}");
    assert_eq!(roles_of(body.as_bytes()), vec!["A", "C"]);
}
