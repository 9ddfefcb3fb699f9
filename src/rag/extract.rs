use lopdf::Document;

use crate::rag::IngestError;

/// Supported uploaded document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Txt,
}

impl DocumentKind {
    /// Determine the kind from a file name. Returns the lowercase extension too.
    pub fn from_filename(filename: &str) -> Result<(Self, String), IngestError> {
        if filename.trim().is_empty() {
            return Err(IngestError::EmptyFilename);
        }
        let ext = file_extension(filename).ok_or(IngestError::UnsupportedExtension)?;
        match ext.as_str() {
            "pdf" => Ok((DocumentKind::Pdf, ext)),
            "txt" => Ok((DocumentKind::Txt, ext)),
            _ => Err(IngestError::UnsupportedExtension),
        }
    }
}

/// Lowercase extension after the last dot, if any
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.trim().rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Extract the plain text of an uploaded document
pub fn extract_text(kind: DocumentKind, bytes: &[u8]) -> Result<String, IngestError> {
    let text = match kind {
        DocumentKind::Pdf => extract_pdf_text(bytes)?,
        DocumentKind::Txt => {
            String::from_utf8(bytes.to_vec()).map_err(|_| IngestError::InvalidUtf8)?
        }
    };
    if text.trim().is_empty() {
        return Err(IngestError::EmptyContent);
    }
    Ok(text)
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String, IngestError> {
    let document = Document::load_mem(bytes).map_err(|e| IngestError::Pdf(e.to_string()))?;
    let pages = document.get_pages().into_keys().map(|page_num| {
        let text = match document.extract_text(&[page_num]) {
            Ok(text) => Some(text),
            Err(e) => {
                rocket::warn!("Page {} text extraction failed: {}", page_num, e);
                None
            }
        };
        (page_num, text)
    });

    let text = join_pages(pages);
    if text.trim().is_empty() {
        return Err(IngestError::NoPdfText);
    }
    Ok(text)
}

/// Join per-page texts as `"Page {n}:\n{text}\n\n"`, skipping pages without text
fn join_pages(pages: impl IntoIterator<Item = (u32, Option<String>)>) -> String {
    pages
        .into_iter()
        .filter_map(|(page_num, text)| {
            text.filter(|t| !t.trim().is_empty())
                .map(|t| format!("Page {}:\n{}\n\n", page_num, t))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(file_extension("Report.PDF").as_deref(), Some("pdf"));
        assert_eq!(file_extension("notes.final.txt").as_deref(), Some("txt"));
    }

    #[test]
    fn missing_extension() {
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension(".bashrc"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn document_kind_from_filename() {
        assert_eq!(
            DocumentKind::from_filename("a.Pdf").unwrap(),
            (DocumentKind::Pdf, "pdf".to_owned())
        );
        assert_eq!(DocumentKind::from_filename("b.txt").unwrap().0, DocumentKind::Txt);
        assert!(matches!(
            DocumentKind::from_filename("c.docx"),
            Err(IngestError::UnsupportedExtension)
        ));
        assert!(matches!(
            DocumentKind::from_filename("  "),
            Err(IngestError::EmptyFilename)
        ));
    }

    #[test]
    fn text_documents_must_be_utf8_and_non_empty() {
        assert_eq!(extract_text(DocumentKind::Txt, b"hello").unwrap(), "hello");
        assert!(matches!(
            extract_text(DocumentKind::Txt, &[0xff, 0xfe, 0x00]),
            Err(IngestError::InvalidUtf8)
        ));
        assert!(matches!(
            extract_text(DocumentKind::Txt, b" \n "),
            Err(IngestError::EmptyContent)
        ));
    }

    #[test]
    fn invalid_pdf_is_a_server_side_error() {
        let err = extract_text(DocumentKind::Pdf, b"not a pdf").unwrap_err();
        assert!(matches!(err, IngestError::Pdf(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn pages_without_text_are_skipped() {
        let text = join_pages([
            (1, Some("first".to_owned())),
            (2, None),
            (3, Some("  ".to_owned())),
            (4, Some("last".to_owned())),
        ]);
        assert_eq!(text, "Page 1:\nfirst\n\nPage 4:\nlast\n\n");
    }
}
