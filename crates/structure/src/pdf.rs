//! Plain text to PDF.
//!
//! Text is set in the standard Courier font on A4 pages, word-wrapped to the
//! printable width and paginated. Characters outside WinAnsi are replaced
//! with `?`.

use std::path::Path;

use {
    lopdf::{
        Document, Object, Stream,
        content::{Content, Operation},
        dictionary,
    },
    tracing::debug,
};

use crate::error::{Error, Result};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 11;
const LEADING: i64 = 14;
/// Courier glyphs are 0.6em wide.
const CHARS_PER_LINE: usize = ((PAGE_WIDTH - 2 * MARGIN) * 10 / (FONT_SIZE * 6)) as usize;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// Render `text` into PDF bytes.
pub fn render(text: &str) -> Result<Vec<u8>> {
    let lines = wrap(text, CHARS_PER_LINE);
    let pages: Vec<&[String]> = if lines.is_empty() {
        vec![lines.as_slice()]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for page_lines in &pages {
        let content = page_content(page_lines);
        let encoded = content
            .encode()
            .map_err(|e| Error::pdf(format!("cannot encode page: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_count),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| Error::pdf(format!("cannot serialize document: {e}")))?;
    debug!(pages = page_count, bytes = out.len(), "pdf rendered");
    Ok(out)
}

/// Render `text` and write it to `dest`.
pub async fn write(text: &str, dest: &Path) -> Result<u64> {
    let text = text.to_string();
    let bytes = tokio::task::spawn_blocking(move || render(&text)).await??;
    tokio::fs::write(dest, &bytes).await?;
    Ok(bytes.len() as u64)
}

fn page_content(lines: &[String]) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Integer(FONT_SIZE)]),
        Operation::new("TL", vec![Object::Integer(LEADING)]),
        Operation::new("Td", vec![
            Object::Integer(MARGIN),
            Object::Integer(PAGE_HEIGHT - MARGIN - FONT_SIZE),
        ]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(
            win_ansi(line),
        )]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

fn win_ansi(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| match c as u32 {
            b @ (0x20..=0x7e | 0xa0..=0xff) => b as u8,
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap to `width` characters; overlong words are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for raw in text.lines() {
        let line = raw.replace('\t', "    ");
        if line.trim().is_empty() {
            out.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in line.split(' ') {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                out.push(word.drain(..width).collect());
            }
            let word: String = word.into_iter().collect();
            let extra = usize::from(!current.is_empty());
            if current.chars().count() + extra + word.chars().count() > width {
                out.push(std::mem::take(&mut current));
            } else if extra == 1 {
                current.push(' ');
            }
            current.push_str(&word);
        }
        out.push(current);
    }
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_valid_pdf_header() {
        let bytes = render("Hello, this is my PDF content!").unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn long_text_paginates() {
        let text = (0..LINES_PER_PAGE * 2 + 3)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let doc = Document::load_mem(&render(&text).unwrap()).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn empty_text_gives_one_blank_page() {
        let doc = Document::load_mem(&render("").unwrap()).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("aaa bbb ccc\n\ndddddddddd", 7);
        assert_eq!(lines, vec!["aaa bbb", "ccc", "", "ddddddd", "ddd"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 7));
    }

    #[test]
    fn non_latin_is_replaced() {
        assert_eq!(win_ansi("é→x"), vec![0xe9, b'?', b'x']);
    }
}
