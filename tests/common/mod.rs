#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::path::Path;

use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// One line of text: x, baseline y, font size, text.
pub type Line<'a> = (f32, f32, f32, &'a str);

pub struct Picture {
    pub rgb: Vec<u8>,
    pub pixel_width: i32,
    pub pixel_height: i32,
    /// x, y, width, height in points.
    pub placement: [f32; 4],
}

pub struct PageSpec<'a> {
    pub lines: Vec<Line<'a>>,
    pub picture: Option<Picture>,
}

impl<'a> PageSpec<'a> {
    pub fn text(lines: &[Line<'a>]) -> Self {
        PageSpec {
            lines: lines.to_vec(),
            picture: None,
        }
    }
}

/// Build an A4 PDF with Helvetica text and optional raw RGB pictures.
pub fn build_pdf(pages: &[PageSpec]) -> Vec<u8> {
    let mut pdf = Pdf::new();
    let mut next_id = 1;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let font_id = alloc();
    let page_refs: Vec<(Ref, Ref, Ref)> = pages.iter().map(|_| (alloc(), alloc(), alloc())).collect();

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_refs.iter().map(|(page_id, _, _)| *page_id))
        .count(pages.len() as i32);
    pdf.type1_font(font_id).base_font(Name(b"Helvetica"));

    for (spec, &(page_id, content_id, image_id)) in pages.iter().zip(&page_refs) {
        let mut content = Content::new();
        for &(x, y, size, text) in &spec.lines {
            content
                .begin_text()
                .set_font(Name(b"F1"), size)
                .next_line(x, y)
                .show(Str(text.as_bytes()))
                .end_text();
        }
        if let Some(picture) = &spec.picture {
            let [x, y, w, h] = picture.placement;
            content.save_state();
            content.transform([w, 0.0, 0.0, h, x, y]);
            content.x_object(Name(b"Im1"));
            content.restore_state();

            let mut image = pdf.image_xobject(image_id, &picture.rgb);
            image.width(picture.pixel_width);
            image.height(picture.pixel_height);
            image.color_space().device_rgb();
            image.bits_per_component(8);
            image.finish();
        }
        pdf.stream(content_id, &content.finish());

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, 595.0, 842.0));
        page.parent(pages_id);
        page.contents(content_id);
        let mut resources = page.resources();
        resources.fonts().pair(Name(b"F1"), font_id);
        if spec.picture.is_some() {
            resources.x_objects().pair(Name(b"Im1"), image_id);
        }
        resources.finish();
        page.finish();
    }

    pdf.finish()
}

pub fn read_part(docx: &Path, name: &str) -> String {
    let bytes = std::fs::read(docx).expect("output file should exist");
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("output should be a ZIP");
    let mut part = archive.by_name(name).expect("part should exist");
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

pub fn archive_names(docx: &Path) -> Vec<String> {
    let bytes = std::fs::read(docx).unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(String::from).collect()
}

/// Text of each `w:p` in the main document part.
pub fn paragraph_texts(docx: &Path) -> Vec<String> {
    let xml = read_part(docx, "word/document.xml");
    let doc = roxmltree::Document::parse(&xml).expect("document.xml should be well-formed");
    doc.descendants()
        .filter(|n| n.tag_name().name() == "p" && n.tag_name().namespace() == Some(WML_NS))
        .map(|p| {
            p.descendants()
                .filter(|n| n.tag_name().name() == "t" && n.tag_name().namespace() == Some(WML_NS))
                .filter_map(|n| n.text())
                .collect()
        })
        .collect()
}
