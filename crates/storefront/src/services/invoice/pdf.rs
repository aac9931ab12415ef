//! PDF encoding of invoice lines with `lopdf`.

use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use super::{InvoiceError, InvoiceLine, LineStyle};

// A4 in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 72;

const FONT: &str = "F1";

/// Rough Helvetica advance width, in thousandths of the font size.
const AVERAGE_GLYPH_WIDTH: i64 = 520;

/// Encode text for a `WinAnsiEncoding` font.
///
/// Characters with no Windows-1252 code point become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let (bytes, _, unmappable) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

fn line_height(style: LineStyle) -> i64 {
    style.font_size() * 3 / 2
}

/// Split lines into pages that fit between the margins.
fn paginate(lines: &[InvoiceLine]) -> Vec<&[InvoiceLine]> {
    let usable = PAGE_HEIGHT - 2 * MARGIN;
    let mut pages = Vec::new();
    let mut start = 0;
    let mut used = 0;

    for (i, line) in lines.iter().enumerate() {
        let height = line_height(line.style);
        if used + height > usable && i > start {
            pages.extend(lines.get(start..i));
            start = i;
            used = 0;
        }
        used += height;
    }
    if start < lines.len() || pages.is_empty() {
        pages.extend(lines.get(start..));
    }
    pages
}

fn page_operations(lines: &[InvoiceLine]) -> Vec<Operation> {
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    for line in lines {
        let size = line.style.font_size();
        y -= line_height(line.style);

        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(FONT.as_bytes().to_vec()), Object::Integer(size)],
        ));
        ops.push(Operation::new(
            "Td",
            vec![Object::Integer(MARGIN), Object::Integer(y)],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(win_ansi(&line.text))],
        ));
        ops.push(Operation::new("ET", vec![]));

        if line.style == LineStyle::Title {
            let chars = i64::try_from(line.text.chars().count()).unwrap_or(i64::MAX / 1000);
            let width = chars * size * AVERAGE_GLYPH_WIDTH / 1000;
            let underline_y = y - 3;
            ops.push(Operation::new("w", vec![Object::Integer(1)]));
            ops.push(Operation::new(
                "m",
                vec![Object::Integer(MARGIN), Object::Integer(underline_y)],
            ));
            ops.push(Operation::new(
                "l",
                vec![
                    Object::Integer(MARGIN + width),
                    Object::Integer(underline_y),
                ],
            ));
            ops.push(Operation::new("S", vec![]));
        }
    }

    ops
}

/// Encode `lines` as a PDF document using the built-in Helvetica font.
///
/// # Errors
///
/// Returns `InvoiceError::Pdf` if a content stream or the document cannot
/// be serialized.
pub fn render_pdf(lines: &[InvoiceLine]) -> Result<Vec<u8>, InvoiceError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { FONT => font_id },
    });

    let mut kids: Vec<ObjectId> = Vec::new();
    for page in paginate(lines) {
        let content = Content {
            operations: page_operations(page),
        };
        let encoded = content
            .encode()
            .map_err(|e| InvoiceError::Pdf(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id);
    }

    let count = i64::try_from(kids.len()).map_err(|e| InvoiceError::Pdf(e.to_string()))?;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
        "Count" => Object::Integer(count),
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| InvoiceError::Pdf(e.to_string()))?;
    Ok(bytes)
}
