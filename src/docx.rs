//! WordprocessingML package writer.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Error;
use crate::model::{Block, Document, EmbeddedImage, ImageFormat, Paragraph, Run};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const WPD_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const EMPTY_DOCUMENT_TEXT: &str = "No text content found in PDF";
const DEFAULT_FONT_SIZE: f32 = 11.0;
const MAX_MARGIN: f32 = 72.0;
/// Word refuses section sizes above 22 inches (31680 twips).
const MAX_PAGE_SIZE: f32 = 1584.0;

fn pts_to_twips(pts: f32) -> i64 {
    (pts * 20.0).round() as i64
}

fn pts_to_emu(pts: f32) -> i64 {
    ((pts * 12700.0).round() as i64).max(1)
}

fn half_points(pts: f32) -> i64 {
    ((pts * 2.0).round() as i64).max(1)
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..)
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().filter(|&c| is_xml_char(c)) {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

struct Media<'a> {
    rel_id: String,
    file_name: String,
    image: &'a EmbeddedImage,
}

fn collect_media(doc: &Document) -> Vec<Media<'_>> {
    doc.pages
        .iter()
        .flat_map(|p| &p.blocks)
        .filter_map(|b| match b {
            Block::Image(image) => Some(image),
            Block::Paragraph(_) => None,
        })
        .enumerate()
        .map(|(i, image)| Media {
            // rId1 is the styles part.
            rel_id: format!("rId{}", i + 2),
            file_name: format!("image{}.{}", i + 1, image.format.extension()),
            image,
        })
        .collect()
}

fn write_run(xml: &mut String, run: &Run) {
    xml.push_str("<w:r><w:rPr>");
    if run.bold {
        xml.push_str("<w:b/>");
    }
    if run.italic {
        xml.push_str("<w:i/>");
    }
    let sz = half_points(run.font_size);
    xml.push_str(&format!(r#"<w:sz w:val="{sz}"/><w:szCs w:val="{sz}"/>"#));
    xml.push_str("</w:rPr>");
    xml.push_str(&format!(
        r#"<w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape_xml(&run.text)
    ));
}

fn write_paragraph(xml: &mut String, para: &Paragraph) {
    xml.push_str("<w:p>");
    if para.space_before > 0.0 {
        xml.push_str(&format!(
            r#"<w:pPr><w:spacing w:before="{}" w:after="0"/></w:pPr>"#,
            pts_to_twips(para.space_before)
        ));
    }
    for run in &para.runs {
        write_run(xml, run);
    }
    xml.push_str("</w:p>");
}

/// Inline picture scaled down to fit `max_width` points.
fn write_image(xml: &mut String, media: &Media, doc_pr_id: usize, max_width: f32) {
    let image = media.image;
    let (mut width, mut height) = (image.display_width, image.display_height);
    if width <= 0.0 || height <= 0.0 {
        width = image.pixel_width as f32 * 0.75;
        height = image.pixel_height as f32 * 0.75;
    }
    if width > max_width && max_width > 0.0 {
        height *= max_width / width;
        width = max_width;
    }
    let (cx, cy) = (pts_to_emu(width), pts_to_emu(height));
    xml.push_str(&format!(
        concat!(
            r#"<w:p><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:docPr id="{id}" name="Picture {id}"/>"#,
            r#"<a:graphic><a:graphicData uri="{pic_ns}"><pic:pic>"#,
            r#"<pic:nvPicPr><pic:cNvPr id="{id}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
        ),
        cx = cx,
        cy = cy,
        id = doc_pr_id,
        pic_ns = PIC_NS,
        name = media.file_name,
        rel = media.rel_id,
    ));
}

/// Margin for a page dimension: an inch, or less on very small pages.
fn margin(dimension: f32) -> f32 {
    MAX_MARGIN.min(dimension * 0.1)
}

fn document_xml(doc: &Document, media: &[Media]) -> String {
    let mut xml = String::from(XML_HEADER);
    xml.push_str(&format!(
        r#"<w:document xmlns:w="{WML_NS}" xmlns:r="{REL_NS}" xmlns:wp="{WPD_NS}" xmlns:a="{DML_NS}" xmlns:pic="{PIC_NS}"><w:body>"#
    ));

    let (page_width, page_height) = doc
        .pages
        .first()
        .map_or((612.0, 792.0), |p| (p.width, p.height));
    let (page_width, page_height) = (
        page_width.min(MAX_PAGE_SIZE),
        page_height.min(MAX_PAGE_SIZE),
    );
    let (margin_x, margin_y) = (margin(page_width), margin(page_height));
    let content_width = page_width - 2.0 * margin_x;

    if doc.is_empty() {
        write_paragraph(
            &mut xml,
            &Paragraph {
                runs: vec![Run {
                    text: EMPTY_DOCUMENT_TEXT.to_string(),
                    font_size: DEFAULT_FONT_SIZE,
                    bold: false,
                    italic: false,
                }],
                space_before: 0.0,
            },
        );
    } else {
        let mut media = media.iter().enumerate();
        for (i, page) in doc.pages.iter().enumerate() {
            if i > 0 {
                xml.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
            }
            for block in &page.blocks {
                match block {
                    Block::Paragraph(para) => write_paragraph(&mut xml, para),
                    Block::Image(_) => {
                        if let Some((i, m)) = media.next() {
                            write_image(&mut xml, m, i + 1, content_width);
                        }
                    }
                }
            }
        }
    }

    xml.push_str(&format!(
        concat!(
            r#"<w:sectPr><w:pgSz w:w="{w}" w:h="{h}"/>"#,
            r#"<w:pgMar w:top="{my}" w:right="{mx}" w:bottom="{my}" w:left="{mx}" w:header="0" w:footer="0" w:gutter="0"/>"#,
            r#"</w:sectPr></w:body></w:document>"#,
        ),
        w = pts_to_twips(page_width),
        h = pts_to_twips(page_height),
        mx = pts_to_twips(margin_x),
        my = pts_to_twips(margin_y),
    ));
    xml
}

fn content_types_xml() -> String {
    let mut xml = format!(
        concat!(
            "{header}",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        ),
        header = XML_HEADER
    );
    for format in [ImageFormat::Png, ImageFormat::Jpeg] {
        xml.push_str(&format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            format.extension(),
            format.mime()
        ));
    }
    xml.push_str(concat!(
        r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
        r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
        "</Types>",
    ));
    xml
}

fn package_rels_xml() -> String {
    format!(
        concat!(
            "{header}",
            r#"<Relationships xmlns="{ns}">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
            r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#,
            "</Relationships>",
        ),
        header = XML_HEADER,
        ns = PKG_REL_NS
    )
}

fn document_rels_xml(media: &[Media]) -> String {
    let mut xml = format!(r#"{XML_HEADER}<Relationships xmlns="{PKG_REL_NS}">"#);
    xml.push_str(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#);
    for m in media {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/{}"/>"#,
            m.rel_id, m.file_name
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn styles_xml() -> String {
    format!(
        concat!(
            "{header}",
            r#"<w:styles xmlns:w="{ns}">"#,
            r#"<w:docDefaults><w:rPrDefault><w:rPr>"#,
            r#"<w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:eastAsia="Calibri" w:cs="Calibri"/>"#,
            r#"<w:sz w:val="{sz}"/><w:szCs w:val="{sz}"/>"#,
            r#"</w:rPr></w:rPrDefault><w:pPrDefault><w:pPr>"#,
            r#"<w:spacing w:after="0" w:line="240" w:lineRule="auto"/>"#,
            r#"</w:pPr></w:pPrDefault></w:docDefaults>"#,
            r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#,
            "</w:styles>",
        ),
        header = XML_HEADER,
        ns = WML_NS,
        sz = half_points(DEFAULT_FONT_SIZE)
    )
}

fn core_xml() -> String {
    format!(
        concat!(
            "{header}",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">"#,
            "<dc:creator>{creator}</dc:creator>",
            "</cp:coreProperties>",
        ),
        header = XML_HEADER,
        creator = env!("CARGO_PKG_NAME")
    )
}

/// Fixed timestamps keep the archive byte-identical across runs.
fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
}

fn add_file<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    data: &[u8],
) -> Result<(), Error> {
    zip.start_file(name, file_options())?;
    zip.write_all(data)?;
    Ok(())
}

pub fn write(doc: &Document) -> Result<Vec<u8>, Error> {
    let media = collect_media(doc);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    add_file(&mut zip, "[Content_Types].xml", content_types_xml().as_bytes())?;
    add_file(&mut zip, "_rels/.rels", package_rels_xml().as_bytes())?;
    add_file(&mut zip, "docProps/core.xml", core_xml().as_bytes())?;
    add_file(&mut zip, "word/document.xml", document_xml(doc, &media).as_bytes())?;
    add_file(&mut zip, "word/styles.xml", styles_xml().as_bytes())?;
    add_file(
        &mut zip,
        "word/_rels/document.xml.rels",
        document_rels_xml(&media).as_bytes(),
    )?;
    for m in &media {
        add_file(&mut zip, &format!("word/media/{}", m.file_name), &m.image.data)?;
    }

    Ok(zip.finish()?.into_inner())
}
