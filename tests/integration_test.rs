//! End-to-end tests for the dump to JSONL pipeline.
//!
//! All tests share the `sample_xml()` fixture, a small dump holding articles, a
//! redirect, namespaced pages, and a disambiguation page. Fixtures are written as
//! BZ2-compressed temp files with `create_bz2_xml` to mirror real dumps; the output is
//! read back line by line and deserialized into `Article`.
//!
//! # Sample Data
//!
//! - 3 articles: "Rust (programming language)", "Python (programming language)",
//!   "Bash: A Tale"
//! - 1 redirect: "Rust" -> "Rust (programming language)"
//! - 2 namespaced pages: "File:Rust logo.svg", "Category talk:Programming languages"
//! - 1 disambiguation page: "Mercury (disambiguation)"

use bzip2::write::BzEncoder;
use bzip2::Compression;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};
use wikicorpus::extract::run_extraction;
use wikicorpus::{Article, DumpError, ExtractOptions};

fn create_bz2_xml(xml: &str) -> NamedTempFile {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(xml.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(&compressed).unwrap();
    tmp.flush().unwrap();
    tmp
}

fn create_plain_xml(xml: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(xml.as_bytes()).unwrap();
    tmp.flush().unwrap();
    tmp
}

fn sample_xml() -> &'static str {
    r#"<mediawiki xmlns="http://www.mediawiki.org/xml/export-0.11/" version="0.11">
  <siteinfo>
    <sitename>Wikipedia</sitename>
  </siteinfo>
  <page>
    <title>Rust (programming language)</title>
    <ns>0</ns>
    <id>1</id>
    <revision>
      <id>100</id>
      <timestamp>2024-01-15T10:30:00Z</timestamp>
      <text xml:space="preserve">Rust is a systems programming language.

It was developed by [[Mozilla]] &amp; others.</text>
    </revision>
  </page>
  <page>
    <title>Rust</title>
    <ns>0</ns>
    <id>2</id>
    <redirect title="Rust (programming language)" />
    <revision>
      <id>101</id>
      <text xml:space="preserve">#REDIRECT [[Rust (programming language)]]</text>
    </revision>
  </page>
  <page>
    <title>File:Rust logo.svg</title>
    <ns>6</ns>
    <id>3</id>
    <revision>
      <id>102</id>
      <text xml:space="preserve">The Rust logo.</text>
    </revision>
  </page>
  <page>
    <title>Python (programming language)</title>
    <ns>0</ns>
    <id>4</id>
    <revision>
      <id>103</id>
      <text xml:space="preserve">Python is a high-level language.</text>
    </revision>
  </page>
  <page>
    <title>Mercury (disambiguation)</title>
    <ns>0</ns>
    <id>5</id>
    <revision>
      <id>104</id>
      <text xml:space="preserve">'''Mercury''' may refer to:</text>
    </revision>
  </page>
  <page>
    <title>Category talk:Programming languages</title>
    <ns>15</ns>
    <id>6</id>
    <revision>
      <id>105</id>
      <text xml:space="preserve">Discussion.</text>
    </revision>
  </page>
  <page>
    <title>Bash: A Tale</title>
    <ns>0</ns>
    <id>7</id>
    <revision>
      <id>106</id>
      <text xml:space="preserve" />
    </revision>
  </page>
</mediawiki>
"#
}

fn read_jsonl(path: &Path) -> Vec<Article> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn titles(articles: &[Article]) -> Vec<&str> {
    articles.iter().map(|a| a.title.as_str()).collect()
}

#[test]
fn test_extract_titles_from_bz2() {
    let dump = create_bz2_xml(sample_xml());
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("titles.jsonl");

    let stats = run_extraction(dump.path(), &output, ExtractOptions::default()).unwrap();

    let articles = read_jsonl(&output);
    assert_eq!(
        titles(&articles),
        vec![
            "Rust (programming language)",
            "Python (programming language)",
            "Bash: A Tale"
        ]
    );
    assert_eq!(articles[0].id, "1");
    assert!(articles.iter().all(|a| a.text.is_none()));

    assert_eq!(stats.pages(), 7);
    assert_eq!(stats.articles(), 3);
    assert_eq!(stats.redirects_skipped, 1);
    assert_eq!(stats.namespace_skipped, 2);
    assert_eq!(stats.disambiguation_skipped, 1);
    assert!(!stats.fallback_used);
}

#[test]
fn test_output_lines_have_no_text_key_by_default() {
    let dump = create_bz2_xml(sample_xml());
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("titles.jsonl");

    run_extraction(dump.path(), &output, ExtractOptions::default()).unwrap();

    let content = fs::read_to_string(&output).unwrap();
    let first = content.lines().next().unwrap();
    let value: serde_json::Value = serde_json::from_str(first).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(object["id"], "1");
    assert_eq!(object["title"], "Rust (programming language)");
}

#[test]
fn test_include_text() {
    let dump = create_bz2_xml(sample_xml());
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("dump.jsonl");
    let options = ExtractOptions {
        include_text: true,
        ..ExtractOptions::default()
    };

    run_extraction(dump.path(), &output, options).unwrap();

    let articles = read_jsonl(&output);
    assert_eq!(
        articles[0].text.as_deref(),
        Some("Rust is a systems programming language.\n\nIt was developed by [[Mozilla]] & others.")
    );
    assert_eq!(
        articles[1].text.as_deref(),
        Some("Python is a high-level language.")
    );
    assert_eq!(articles[2].text.as_deref(), Some(""));
}

#[test]
fn test_include_disambiguation() {
    let dump = create_bz2_xml(sample_xml());
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("titles.jsonl");
    let options = ExtractOptions {
        filter_disambiguation: false,
        ..ExtractOptions::default()
    };

    let stats = run_extraction(dump.path(), &output, options).unwrap();

    let articles = read_jsonl(&output);
    assert!(titles(&articles).contains(&"Mercury (disambiguation)"));
    assert_eq!(stats.articles(), 4);
    assert_eq!(stats.disambiguation_skipped, 0);
}

#[test]
fn test_limit() {
    let dump = create_bz2_xml(sample_xml());
    let out_dir = TempDir::new().unwrap();

    for (limit, expected) in [(0, 0), (2, 2), (10, 3)] {
        let output = out_dir.path().join(format!("limit_{}.jsonl", limit));
        let options = ExtractOptions {
            limit: Some(limit),
            ..ExtractOptions::default()
        };
        let stats = run_extraction(dump.path(), &output, options).unwrap();
        assert_eq!(read_jsonl(&output).len(), expected, "limit {}", limit);
        assert_eq!(stats.articles(), expected as u64);
    }
}

#[test]
fn test_plain_xml_input() {
    let dump = create_plain_xml(sample_xml());
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("titles.jsonl");

    let stats = run_extraction(dump.path(), &output, ExtractOptions::default()).unwrap();

    assert_eq!(stats.articles(), 3);
    assert_eq!(read_jsonl(&output).len(), 3);
}

#[test]
fn test_malformed_dump_falls_back() {
    // The stray closing tag inside the second page breaks the XML reader
    let xml = sample_xml().replace(
        "<id>2</id>",
        "<id>2</id>\n    </broken>",
    );
    let dump = create_bz2_xml(&xml);
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("titles.jsonl");

    let stats = run_extraction(dump.path(), &output, ExtractOptions::default()).unwrap();

    assert!(stats.fallback_used);
    let articles = read_jsonl(&output);
    assert_eq!(
        titles(&articles),
        vec![
            "Rust (programming language)",
            "Python (programming language)",
            "Bash: A Tale"
        ]
    );
}

#[test]
fn test_missing_input() {
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("titles.jsonl");
    let missing = out_dir.path().join("enwiki-19700101-pages-articles.xml.bz2");

    let err = run_extraction(&missing, &output, ExtractOptions::default()).unwrap_err();

    assert!(matches!(err, DumpError::MissingInput(_)));
    assert!(err.is_not_found());
    assert!(!output.exists());
}

#[test]
fn test_output_parent_created() {
    let dump = create_bz2_xml(sample_xml());
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("nested").join("dir").join("titles.jsonl");

    run_extraction(dump.path(), &output, ExtractOptions::default()).unwrap();

    assert!(output.exists());
    assert!(!out_dir
        .path()
        .join("nested")
        .join("dir")
        .join("titles.jsonl.tmp")
        .exists());
}
