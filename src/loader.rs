//! Document loading and text extraction.
//!
//! Walks the configured documents root and turns supported files into
//! [`Document`]s: `.txt` and `.md` are read as UTF-8 text, `.pdf` goes
//! through `pdf-extract`, and `.docx`/`.doc` are unpacked as OOXML
//! (`word/document.xml` text runs, one line per paragraph).
//!
//! A file that cannot be read or parsed is reported as an ingestion error;
//! batch loading logs it, skips the file, and keeps going.

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::models::{DocType, Document};

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb
/// protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

pub struct DocumentLoader {
    root: PathBuf,
}

/// Result of a batch load: successfully loaded documents plus the number of
/// files that were skipped.
pub struct LoadedBatch {
    pub documents: Vec<Document>,
    pub skipped: usize,
}

impl DocumentLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Load one file. Fails with an ingestion error for unsupported
    /// extensions or unreadable content.
    pub fn load_document(&self, path: &Path) -> Result<Document> {
        let ingestion_err = |reason: String| Error::Ingestion {
            path: path.to_path_buf(),
            reason,
        };

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let doc_type = DocType::from_extension(&ext)
            .ok_or_else(|| ingestion_err(format!("unsupported file type: .{ext}")))?;

        let content = match doc_type {
            DocType::Txt | DocType::Md => {
                std::fs::read_to_string(path).map_err(|e| ingestion_err(e.to_string()))?
            }
            DocType::Pdf => {
                let bytes = std::fs::read(path).map_err(|e| ingestion_err(e.to_string()))?;
                pdf_extract::extract_text_from_mem(&bytes)
                    .map_err(|e| ingestion_err(format!("PDF extraction failed: {e}")))?
            }
            DocType::Docx => {
                let bytes = std::fs::read(path).map_err(|e| ingestion_err(e.to_string()))?;
                extract_docx(&bytes).map_err(|e| ingestion_err(e))?
            }
        };

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Document {
            filename,
            source_path: path.to_path_buf(),
            content,
            doc_type,
        })
    }

    /// Load every supported file under the documents root.
    ///
    /// Unreadable files are logged, counted, and skipped; documents with
    /// whitespace-only content are dropped silently. A missing root yields
    /// an empty batch.
    pub fn load_all(&self) -> LoadedBatch {
        let mut documents = Vec::new();
        let mut skipped = 0;

        if !self.root.exists() {
            warn!(root = %self.root.display(), "documents root does not exist");
            return LoadedBatch { documents, skipped };
        }

        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();
            if DocType::from_extension(&ext).is_none() {
                continue;
            }

            match self.load_document(path) {
                Ok(doc) if doc.content.trim().is_empty() => {}
                Ok(doc) => {
                    info!(file = %doc.filename, "loaded document");
                    documents.push(doc);
                }
                Err(e) => {
                    warn!(error = %e, "skipping document");
                    skipped += 1;
                }
            }
        }

        info!(
            count = documents.len(),
            skipped, "finished loading documents"
        );
        LoadedBatch { documents, skipped }
    }
}

/// Extract text runs from a DOCX archive, one line per paragraph.
fn extract_docx(bytes: &[u8]) -> std::result::Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| e.to_string())?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|_| "word/document.xml not found".to_string())?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| e.to_string())?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err("word/document.xml exceeds size limit".to_string());
        }
    }

    extract_paragraph_text(&doc_xml)
}

fn extract_paragraph_text(xml: &[u8]) -> std::result::Result<String, String> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}
