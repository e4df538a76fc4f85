//! Document loading: turns the source document into page-level text.

use crate::types::Page;
use cookbook_core::{AppError, AppResult};
use lopdf::Document;
use std::path::Path;

/// Read a document into pages.
///
/// PDFs are extracted page by page. Plain-text documents are split on form
/// feeds, so a `.txt` export of a paginated document keeps its page numbers.
/// Pages with no text are skipped.
pub fn load_pages(path: &Path) -> AppResult<Vec<Page>> {
    if !path.exists() {
        return Err(AppError::Knowledge(format!(
            "Source document not found: {}",
            path.display()
        )));
    }

    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let pages = if is_pdf {
        load_pdf(path)?
    } else {
        let text = std::fs::read_to_string(path)?;
        split_text_pages(&text)
    };

    tracing::info!("Loaded {} pages from {}", pages.len(), path.display());
    Ok(pages)
}

fn load_pdf(path: &Path) -> AppResult<Vec<Page>> {
    let doc = Document::load(path).map_err(|e| {
        AppError::Knowledge(format!("Failed to parse PDF {}: {}", path.display(), e))
    })?;

    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    let mut pages = Vec::with_capacity(page_numbers.len());
    for number in page_numbers {
        match doc.extract_text(&[number]) {
            Ok(raw) => {
                let text = normalize_text(&raw);
                if !text.is_empty() {
                    pages.push(Page::new(number, text));
                }
            }
            Err(e) => tracing::warn!("Skipping page {} of {}: {}", number, path.display(), e),
        }
    }

    Ok(pages)
}

fn split_text_pages(text: &str) -> Vec<Page> {
    text.split('\x0c')
        .enumerate()
        .filter_map(|(idx, raw)| {
            let text = normalize_text(raw);
            (!text.is_empty()).then(|| Page::new(idx as u32 + 1, text))
        })
        .collect()
}

/// Trim line ends and collapse runs of blank lines to a single paragraph break.
fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_break = false;

    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            pending_break = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if pending_break { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        pending_break = false;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_keeps_paragraphs() {
        let text = "Pancakes   \n\n\n  \nMix the flour.\nAdd milk.\n";
        assert_eq!(normalize_text(text), "Pancakes\n\nMix the flour.\nAdd milk.");
    }

    #[test]
    fn test_text_pages_split_on_form_feed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cookbook.txt");
        std::fs::write(&path, "Page one text\x0c\n \x0cPage three text").unwrap();

        let pages = load_pages(&path).unwrap();
        assert_eq!(
            pages,
            vec![Page::new(1, "Page one text"), Page::new(3, "Page three text")]
        );
    }

    #[test]
    fn test_missing_document() {
        let temp = TempDir::new().unwrap();
        let result = load_pages(&temp.path().join("COOKBOOK.pdf"));
        assert!(matches!(result, Err(AppError::Knowledge(_))));
    }

    #[test]
    fn test_invalid_pdf() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.pdf");
        std::fs::write(&path, "not a pdf").unwrap();

        assert!(load_pages(&path).is_err());
    }
}
