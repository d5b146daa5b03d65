//! Plain-text extraction from uploaded resume documents.
//!
//! Both formats are parsed from an in-memory copy of the file so that I/O
//! failures (`FileOpen`) are distinguishable from structural ones (`MalformedDocument`).

use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::{debug, warn};

const DOCX_BODY_PART: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to open {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document: {0}")]
    MalformedDocument(String),
}

/// Formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Resolves a format from a file extension, case-insensitively, with or without the dot.
    pub fn from_extension(ext: &str) -> Result<Self, ExtractError> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            other => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Resolves a format from whatever follows the last dot of the file name,
    /// so a bare `.pdf` counts as a PDF.
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let ext = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .ok_or_else(|| ExtractError::UnsupportedFormat(path.display().to_string()))?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => f.write_str("PDF"),
            DocumentFormat::Docx => f.write_str("DOCX"),
        }
    }
}

/// Extracts plain text from the document at `path`.
/// Parsing runs on the blocking pool; the file is only ever read.
pub async fn extract(path: &Path, format: DocumentFormat) -> Result<String, ExtractError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&path, format))
        .await
        .map_err(|e| ExtractError::MalformedDocument(format!("extraction task failed: {e}")))?
}

pub fn extract_blocking(path: &Path, format: DocumentFormat) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let text = match format {
        DocumentFormat::Pdf => pdf_text(&bytes)?,
        DocumentFormat::Docx => docx_text(&bytes)?,
    };

    debug!(
        "Extracted {} chars from {} {}",
        text.len(),
        format,
        path.display()
    );
    Ok(text)
}

/// Page texts concatenated in page order.
fn pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| ExtractError::MalformedDocument(format!("cannot read PDF: {e}")))?;

    // get_pages is keyed by 1-based page number, so iteration is page order
    let pages = doc
        .get_pages()
        .keys()
        .map(|&page_num| {
            let page_text = doc.extract_text(&[page_num]).map_err(|e| e.to_string());
            (page_num, page_text)
        })
        .collect();

    merge_page_texts(pages, || {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| e.to_string())
    })
}

/// Joins per-page lopdf output. Pages lopdf cannot decode are skipped; when
/// any page failed or nothing readable came out, the whole document goes
/// through `fallback` and its text wins if non-blank. The first page error is
/// returned only when neither engine produced text.
fn merge_page_texts<F>(
    pages: Vec<(u32, Result<String, String>)>,
    fallback: F,
) -> Result<String, ExtractError>
where
    F: FnOnce() -> Result<String, String>,
{
    let mut text = String::new();
    let mut first_error: Option<String> = None;

    for (page_num, page_text) in pages {
        match page_text {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => {
                warn!("lopdf could not extract page {page_num}: {e}");
                if first_error.is_none() {
                    first_error = Some(format!("cannot extract page {page_num}: {e}"));
                }
            }
        }
    }

    if first_error.is_some() || text.trim().is_empty() {
        match fallback() {
            Ok(fallback_text) if !fallback_text.trim().is_empty() => return Ok(fallback_text),
            Ok(_) => {}
            Err(e) => warn!("pdf-extract fallback failed: {e}"),
        }
    }

    match first_error {
        Some(e) if text.trim().is_empty() => Err(ExtractError::MalformedDocument(e)),
        _ => Ok(text),
    }
}

/// Run texts joined by a trailing space, one newline per paragraph.
fn docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::MalformedDocument(format!("cannot read DOCX container: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| ExtractError::MalformedDocument(format!("missing {DOCX_BODY_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| {
            ExtractError::MalformedDocument(format!("cannot read {DOCX_BODY_PART}: {e}"))
        })?;

    docx_body_text(&xml)
}

/// Text boxes appear twice in Word output, once under `mc:Choice` and once
/// under `mc:Fallback`; only the `mc:Choice` copy is read.
fn docx_body_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut run_depth = 0usize;
    let mut fallback_depth = 0usize;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ExtractError::MalformedDocument(format!("invalid document XML: {e}")))?;

        if fallback_depth > 0 {
            match event {
                Event::Start(e) if e.name().as_ref() == b"mc:Fallback" => fallback_depth += 1,
                Event::End(e) if e.name().as_ref() == b"mc:Fallback" => fallback_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"mc:Fallback" => fallback_depth += 1,
                b"w:r" => run_depth += 1,
                b"w:t" if run_depth > 0 => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => out.push('\n'),
                b"w:r" => out.push(' '),
                b"w:tab" if run_depth > 0 => out.push('\t'),
                b"w:br" | b"w:cr" if run_depth > 0 => out.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_text => {
                let text = e.unescape().map_err(|e| {
                    ExtractError::MalformedDocument(format!("invalid text node: {e}"))
                })?;
                out.push_str(&text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:r" if run_depth > 0 => {
                    run_depth -= 1;
                    out.push(' ');
                }
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}
