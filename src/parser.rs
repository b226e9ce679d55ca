//! Page sources over a dump stream.
//!
//! [`XmlPageReader`] walks quick-xml events; [`LinePageReader`] scans raw lines for the
//! handful of tags a dump page is made of and is used once the XML reader gives up on
//! broken input. Both yield the same [`Page`] for the same well-formed page.

use crate::config::READ_BUFFER_SIZE;
use crate::error::DumpError;
use crate::models::Page;
use bzip2::bufread::MultiBzDecoder;
use memchr::memmem;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

const BZIP2_MAGIC: &[u8] = b"BZh";

/// Producer of completed pages, one per closing `</page>`.
pub trait PageSource {
    /// Next completed page, `Ok(None)` at end of stream.
    fn next_page(&mut self) -> Result<Option<Page>, DumpError>;

    /// Number of `</page>` boundaries passed so far, including skipped ones.
    fn pages_completed(&self) -> u64;
}

/// Something that can hand out a fresh reader positioned at the start of the dump.
pub trait DumpOpener {
    fn open(&self) -> Result<Box<dyn BufRead>, DumpError>;
}

impl<F> DumpOpener for F
where
    F: Fn() -> Result<Box<dyn BufRead>, DumpError>,
{
    fn open(&self) -> Result<Box<dyn BufRead>, DumpError> {
        self()
    }
}

/// A dump file on disk, plain XML or bzip2 (single or multistream).
#[derive(Debug, Clone)]
pub struct DumpInput {
    path: PathBuf,
}

impl DumpInput {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DumpError> {
        let path = path.into();
        if !path.exists() {
            return Err(DumpError::MissingInput(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DumpOpener for DumpInput {
    fn open(&self) -> Result<Box<dyn BufRead>, DumpError> {
        open_dump(&self.path)
    }
}

/// Opens a dump, decompressing on the fly when the file starts with the bzip2 magic.
pub fn open_dump(path: &Path) -> Result<Box<dyn BufRead>, DumpError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DumpError::MissingInput(path.to_path_buf()),
        _ => DumpError::Io(e),
    })?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

    if reader.fill_buf()?.starts_with(BZIP2_MAGIC) {
        let decoder = MultiBzDecoder::new(reader);
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, decoder)))
    } else {
        Ok(Box::new(reader))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    Title,
    Id,
    Text,
}

/// Streaming page reader driven by quick-xml events.
///
/// The event buffer is cleared on every event, so memory is bounded by the largest
/// single page rather than the dump.
pub struct XmlPageReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    include_text: bool,
    pages_completed: u64,
}

impl<R: BufRead> XmlPageReader<R> {
    pub fn new(source: R, include_text: bool) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(false);
        reader.check_end_names(true);

        Self {
            reader,
            buf: Vec::with_capacity(64 * 1024),
            include_text,
            pages_completed: 0,
        }
    }
}

impl<R: BufRead> PageSource for XmlPageReader<R> {
    fn next_page(&mut self) -> Result<Option<Page>, DumpError> {
        let mut page: Option<Page> = None;
        let mut revision_depth: u32 = 0;
        let mut id_seen = false;
        let mut capture = Capture::None;
        let mut value = String::new();

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    let position = self.reader.buffer_position();
                    return Err(DumpError::from_xml(e, position));
                }
            };

            match event {
                Event::Start(e) => {
                    let name = e.local_name();
                    if page.is_none() {
                        if name.as_ref() == b"page" {
                            page = Some(Page::default());
                        }
                        continue;
                    }
                    let Some(current) = page.as_mut() else {
                        continue;
                    };
                    match name.as_ref() {
                        b"revision" => revision_depth += 1,
                        b"title" if revision_depth == 0 => {
                            capture = Capture::Title;
                            value.clear();
                        }
                        b"id" if revision_depth == 0 && !id_seen => {
                            capture = Capture::Id;
                            value.clear();
                        }
                        b"text" if revision_depth > 0 && self.include_text => {
                            capture = Capture::Text;
                            value.clear();
                        }
                        b"redirect" => current.is_redirect = true,
                        _ => {}
                    }
                }
                Event::Empty(e) => {
                    let Some(current) = page.as_mut() else {
                        continue;
                    };
                    match e.local_name().as_ref() {
                        b"redirect" => current.is_redirect = true,
                        b"id" if revision_depth == 0 => id_seen = true,
                        b"text" if revision_depth > 0 && self.include_text => {
                            current.text = Some(String::new());
                        }
                        _ => {}
                    }
                }
                Event::Text(t) if capture != Capture::None => {
                    let unescaped = match t.unescape() {
                        Ok(text) => text,
                        Err(e) => {
                            let position = self.reader.buffer_position();
                            return Err(DumpError::from_xml(e, position));
                        }
                    };
                    value.push_str(&unescaped);
                }
                Event::CData(c) if capture != Capture::None => {
                    let bytes = c.into_inner();
                    match std::str::from_utf8(&bytes) {
                        Ok(s) => value.push_str(s),
                        Err(e) => {
                            let position = self.reader.buffer_position();
                            return Err(DumpError::from_xml(
                                quick_xml::Error::NonDecodable(Some(e)),
                                position,
                            ));
                        }
                    }
                }
                Event::End(e) => {
                    let Some(current) = page.as_mut() else {
                        continue;
                    };
                    match e.local_name().as_ref() {
                        b"title" if capture == Capture::Title => {
                            current.title = std::mem::take(&mut value);
                            capture = Capture::None;
                        }
                        b"id" if capture == Capture::Id => {
                            current.id = value.trim().to_string();
                            id_seen = true;
                            capture = Capture::None;
                        }
                        b"text" if capture == Capture::Text => {
                            current.text = Some(std::mem::take(&mut value));
                            capture = Capture::None;
                        }
                        b"revision" => revision_depth = revision_depth.saturating_sub(1),
                        b"page" => {
                            self.pages_completed += 1;
                            return Ok(page.take());
                        }
                        _ => {}
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    fn pages_completed(&self) -> u64 {
        self.pages_completed
    }
}

/// What the line scanner found at a `<`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Marker {
    PageOpen,
    PageClose,
    RevisionOpen,
    RevisionClose,
    Redirect,
    Title(String),
    Id(String),
    EmptyId,
    TextOpen { self_closing: bool },
    Other,
}

/// Tags that cannot appear literally inside `<text>`.
const TEXT_BOUNDARIES: [&[u8]; 3] = [b"</revision>", b"</page>", b"<page>"];

/// Classifies the tag at the start of `rest` and returns how many bytes it spans.
fn next_marker(rest: &str) -> (Marker, usize) {
    if rest.starts_with("<page>") {
        return (Marker::PageOpen, "<page>".len());
    }
    if rest.starts_with("</page>") {
        return (Marker::PageClose, "</page>".len());
    }
    if rest.starts_with("<revision>") {
        return (Marker::RevisionOpen, "<revision>".len());
    }
    if rest.starts_with("</revision>") {
        return (Marker::RevisionClose, "</revision>".len());
    }
    if rest.starts_with("<redirect") {
        return (Marker::Redirect, "<redirect".len());
    }
    if let Some((body, consumed)) = element_body(rest, "<title>", "</title>") {
        return (Marker::Title(unescape_lossy(body)), consumed);
    }
    if let Some((body, consumed)) = element_body(rest, "<id>", "</id>") {
        return (Marker::Id(body.trim().to_string()), consumed);
    }
    for empty in ["<id/>", "<id />"] {
        if rest.starts_with(empty) {
            return (Marker::EmptyId, empty.len());
        }
    }
    if let Some(after) = rest.strip_prefix("<text") {
        if matches!(after.as_bytes().first(), Some(b' ' | b'>' | b'/')) {
            if let Some(gt) = memchr::memchr(b'>', rest.as_bytes()) {
                let self_closing = rest[..gt].ends_with('/');
                return (Marker::TextOpen { self_closing }, gt + 1);
            }
        }
    }
    (Marker::Other, 1)
}

/// Body of `open ... close` when both tags sit on this line.
fn element_body<'a>(rest: &'a str, open: &str, close: &str) -> Option<(&'a str, usize)> {
    let after = rest.strip_prefix(open)?;
    let end = memmem::find(after.as_bytes(), close.as_bytes())?;
    Some((&after[..end], open.len() + end + close.len()))
}

fn unescape_lossy(raw: &str) -> String {
    quick_xml::escape::unescape(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

/// Line-oriented fallback for dumps the XML reader cannot decode.
///
/// Recognizes `<page>`, `</page>`, `<revision>`, `</revision>`, `<redirect`,
/// `<title>..</title>`, `<id>..</id>` and `<text ..>..</text>`, the latter possibly
/// spanning many lines. Invalid UTF-8 is replaced rather than rejected.
pub struct LinePageReader<R: BufRead> {
    reader: R,
    raw: Vec<u8>,
    line: String,
    cursor: usize,
    include_text: bool,
    skip_pages: u64,
    pages_completed: u64,
    page: Option<Page>,
    in_revision: bool,
    id_seen: bool,
    text: Option<String>,
}

impl<R: BufRead> LinePageReader<R> {
    pub fn new(reader: R, include_text: bool) -> Self {
        Self {
            reader,
            raw: Vec::new(),
            line: String::new(),
            cursor: 0,
            include_text,
            skip_pages: 0,
            pages_completed: 0,
            page: None,
            in_revision: false,
            id_seen: false,
            text: None,
        }
    }

    /// Pass over the first `count` pages without yielding them.
    pub fn skip_pages(mut self, count: u64) -> Self {
        self.skip_pages = count;
        self
    }

    fn read_line(&mut self) -> Result<bool, DumpError> {
        self.raw.clear();
        if self.reader.read_until(b'\n', &mut self.raw)? == 0 {
            return Ok(false);
        }
        self.line = String::from_utf8_lossy(&self.raw).into_owned();
        self.cursor = 0;
        Ok(true)
    }

    fn skipping(&self) -> bool {
        self.pages_completed < self.skip_pages
    }

    /// Scans the current line from the cursor; returns a page if one closes on it.
    fn scan_line(&mut self) -> Option<Page> {
        while self.cursor < self.line.len() {
            if self.text.is_some() {
                self.scan_text();
                continue;
            }

            let Some(offset) = memchr::memchr(b'<', self.line[self.cursor..].as_bytes()) else {
                self.cursor = self.line.len();
                break;
            };
            self.cursor += offset;

            let (marker, consumed) = next_marker(&self.line[self.cursor..]);
            self.cursor += consumed;
            if let Some(page) = self.apply(marker) {
                return Some(page);
            }
        }
        None
    }

    /// Buffers text up to `</text>`. Dumps escape markup inside text, so a literal
    /// `</revision>`, `</page>` or `<page>` means the text was cut short: it ends the
    /// buffer there and the tag is left for `scan_line` to apply.
    fn scan_text(&mut self) {
        let rest = &self.line[self.cursor..];
        let close = memmem::find(rest.as_bytes(), b"</text>");
        let boundary = TEXT_BOUNDARIES
            .iter()
            .filter_map(|tag| memmem::find(rest.as_bytes(), tag))
            .min()
            .filter(|&at| close.map_or(true, |end| at < end));

        let (end, consumed) = match (boundary, close) {
            (Some(at), _) => (Some(at), at),
            (None, Some(end)) => (Some(end), end + "</text>".len()),
            (None, None) => (None, rest.len()),
        };
        let chunk = &rest[..end.unwrap_or(rest.len())];
        if let Some(buffer) = self.text.as_mut() {
            buffer.push_str(chunk);
        }
        self.cursor += consumed;

        if end.is_some() {
            let raw = self.text.take().unwrap_or_default();
            if let Some(page) = self.page.as_mut() {
                page.text = Some(unescape_lossy(&raw));
            }
        }
    }

    fn apply(&mut self, marker: Marker) -> Option<Page> {
        match marker {
            Marker::PageOpen => {
                self.page = Some(Page::default());
                self.in_revision = false;
                self.id_seen = false;
            }
            Marker::PageClose => {
                self.in_revision = false;
                self.id_seen = false;
                self.pages_completed += 1;
                let page = self.page.take();
                if self.pages_completed > self.skip_pages {
                    return page;
                }
            }
            Marker::RevisionOpen => self.in_revision = true,
            Marker::RevisionClose => self.in_revision = false,
            Marker::Redirect => {
                if let Some(page) = self.page.as_mut() {
                    page.is_redirect = true;
                }
            }
            Marker::Title(title) if !self.in_revision => {
                if let Some(page) = self.page.as_mut() {
                    page.title = title;
                }
            }
            Marker::Id(id) if !self.in_revision && !self.id_seen => {
                if let Some(page) = self.page.as_mut() {
                    page.id = id;
                    self.id_seen = true;
                }
            }
            Marker::EmptyId if !self.in_revision && self.page.is_some() => self.id_seen = true,
            Marker::TextOpen { self_closing }
                if self.in_revision && self.include_text && !self.skipping() =>
            {
                if let Some(page) = self.page.as_mut() {
                    if self_closing {
                        page.text = Some(String::new());
                    } else {
                        self.text = Some(String::new());
                    }
                }
            }
            _ => {}
        }
        None
    }
}

impl<R: BufRead> PageSource for LinePageReader<R> {
    fn next_page(&mut self) -> Result<Option<Page>, DumpError> {
        loop {
            if self.cursor >= self.line.len() && !self.read_line()? {
                self.page = None;
                self.text = None;
                return Ok(None);
            }
            if let Some(page) = self.scan_line() {
                return Ok(Some(page));
            }
        }
    }

    fn pages_completed(&self) -> u64 {
        self.pages_completed
    }
}
