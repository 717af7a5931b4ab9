use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::docx;
use crate::error::{Error, PageError};
use crate::fonts::FontInfo;
use crate::layout::{self, PlacedImage, Span};
use crate::model::{self, EmbeddedImage, ImageFormat};
use crate::options::{ConversionOptions, PageRange};
use crate::session::{ConversionReport, Converter};

const MAX_REFERENCE_DEPTH: usize = 32;
const LETTER: (f32, f32) = (612.0, 792.0);
/// Filters lopdf can undo on a content stream.
const CONTENT_FILTERS: &[&[u8]] = &[b"FlateDecode", b"LZWDecode", b"ASCII85Decode"];

pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_REFERENCE_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

pub(crate) fn dict_get<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|o| resolve(doc, o))
}

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(v) => Some(*v as f32),
        Object::Real(v) => Some(*v as f32),
        _ => None,
    }
}

fn filters(stream: &Stream) -> Vec<&[u8]> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.as_slice()],
        Ok(Object::Array(names)) => names
            .iter()
            .filter_map(|n| match n {
                Object::Name(name) => Some(name.as_slice()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn has_filter(stream: &Stream, filter: &[u8]) -> bool {
    filters(stream).contains(&filter)
}

pub(crate) fn stream_data(stream: &Stream) -> Option<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content().ok()
    } else {
        Some(stream.content.clone())
    }
}

/// Look up a page attribute, following the `Parent` chain for inherited keys.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_object(page_id).ok()?;
    for _ in 0..MAX_REFERENCE_DEPTH {
        let Object::Dictionary(dict) = node else {
            return None;
        };
        if let Some(value) = dict_get(doc, dict, key) {
            return Some(value);
        }
        node = dict_get(doc, dict, b"Parent")?;
    }
    None
}

fn page_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let Some(Object::Array(bounds)) = inherited(doc, page_id, b"MediaBox") else {
        return LETTER;
    };
    let coords: Vec<f32> = bounds.iter().filter_map(number).collect();
    match coords.as_slice() {
        [x0, y0, x1, y1] if x1 != x0 && y1 != y0 => ((x1 - x0).abs(), (y1 - y0).abs()),
        _ => LETTER,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f32, ty: f32) -> Matrix {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self` applied first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    fn x_scale(&self) -> f32 {
        self.0[0].hypot(self.0[1])
    }

    fn y_scale(&self) -> f32 {
        self.0[2].hypot(self.0[3])
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        let values: Vec<f32> = operands.iter().filter_map(number).collect();
        let values: [f32; 6] = values.try_into().ok()?;
        Some(Matrix(values))
    }
}

#[derive(Clone)]
struct TextState {
    font: Option<Vec<u8>>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    h_scale: f32,
    leading: f32,
    rise: f32,
    tm: Matrix,
    tlm: Matrix,
}

impl Default for TextState {
    fn default() -> Self {
        TextState {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
        }
    }
}

/// Walks one page's content stream and collects positioned text and images.
struct PageInterpreter<'a> {
    doc: &'a Document,
    resources: Option<&'a Dictionary>,
    fonts: HashMap<Vec<u8>, FontInfo>,
    ctm: Matrix,
    saved: Vec<(Matrix, TextState)>,
    text: TextState,
    in_text: bool,
    spans: Vec<Span>,
    images: Vec<PlacedImage>,
}

impl<'a> PageInterpreter<'a> {
    fn new(doc: &'a Document, resources: Option<&'a Dictionary>) -> Self {
        PageInterpreter {
            doc,
            resources,
            fonts: HashMap::new(),
            ctm: Matrix::IDENTITY,
            saved: Vec::new(),
            text: TextState::default(),
            in_text: false,
            spans: Vec::new(),
            images: Vec::new(),
        }
    }

    fn resource(&self, category: &[u8], name: &[u8]) -> Option<&'a Object> {
        let resources = self.resources?;
        match dict_get(self.doc, resources, category)? {
            Object::Dictionary(entries) => dict_get(self.doc, entries, name),
            _ => None,
        }
    }

    fn load_font(&mut self, name: &[u8]) {
        if self.fonts.contains_key(name) {
            return;
        }
        let info = match self.resource(b"Font", name) {
            Some(Object::Dictionary(font)) => FontInfo::from_dict(self.doc, font),
            _ => {
                log::debug!("Font {} not in page resources", String::from_utf8_lossy(name));
                FontInfo::fallback()
            }
        };
        self.fonts.insert(name.to_vec(), info);
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.text.tlm = Matrix::translate(tx, ty).then(&self.text.tlm);
        self.text.tm = self.text.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.text.leading;
        self.move_line(0.0, -leading);
    }

    fn show(&mut self, bytes: &[u8]) {
        let Some(font_name) = self.text.font.clone() else {
            return;
        };
        self.load_font(&font_name);
        let Some(font) = self.fonts.get(&font_name) else {
            return;
        };
        let glyphs = font.decode(bytes);
        let (bold, italic) = (font.bold, font.italic);

        let ts = &self.text;
        let rendering = Matrix([ts.h_scale, 0.0, 0.0, 1.0, 0.0, ts.rise])
            .then(&ts.tm)
            .then(&self.ctm);
        let (x, y) = rendering.apply(0.0, 0.0);

        let mut advance = 0.0;
        let mut text = String::new();
        for glyph in &glyphs {
            let spacing = ts.char_spacing + if glyph.word_space { ts.word_spacing } else { 0.0 };
            advance += (glyph.width / 1000.0 * ts.size + spacing) * ts.h_scale;
            text.push_str(&glyph.text);
        }

        let font_size = ts.size * rendering.y_scale();
        let width = advance * ts.tm.then(&self.ctm).x_scale();
        self.text.tm = Matrix::translate(advance, 0.0).then(&self.text.tm);

        if font_size > 0.0 && !text.is_empty() {
            self.spans.push(Span {
                x,
                y,
                width,
                font_size,
                text,
                bold,
                italic,
            });
        }
    }

    /// `TJ`: strings interleaved with kerning adjustments in 1/1000 text space units.
    fn show_adjusted(&mut self, items: &[Object]) {
        for item in items {
            match item {
                Object::String(bytes, _) => self.show(bytes),
                other => {
                    if let Some(adjust) = number(other) {
                        let tx = -adjust / 1000.0 * self.text.size * self.text.h_scale;
                        self.text.tm = Matrix::translate(tx, 0.0).then(&self.text.tm);
                    }
                }
            }
        }
    }

    fn draw_xobject(&mut self, name: &[u8]) {
        let Some(Object::Stream(stream)) = self.resource(b"XObject", name) else {
            return;
        };
        match stream.dict.get(b"Subtype") {
            Ok(Object::Name(subtype)) if subtype.as_slice() == b"Image" => {}
            _ => {
                log::debug!("Skipping non-image XObject {}", String::from_utf8_lossy(name));
                return;
            }
        }
        let image = match extract_image(self.doc, stream, &self.ctm) {
            Ok(Some(image)) => image,
            Ok(None) => {
                log::debug!("Skipping unsupported image {}", String::from_utf8_lossy(name));
                return;
            }
            Err(e) => {
                log::debug!("Skipping image {}: {e}", String::from_utf8_lossy(name));
                return;
            }
        };
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        let top = corners
            .iter()
            .map(|&(x, y)| self.ctm.apply(x, y).1)
            .fold(f32::MIN, f32::max);
        self.images.push(PlacedImage { top, image });
    }

    fn execute(&mut self, op: &Operation) {
        let operands = &op.operands;
        let num = |i: usize| operands.get(i).and_then(number).unwrap_or(0.0);
        match op.operator.as_str() {
            "q" => self.saved.push((self.ctm, self.text.clone())),
            "Q" => {
                // Text parameters are graphics state; the text matrices are not.
                if let Some((ctm, text)) = self.saved.pop() {
                    self.ctm = ctm;
                    self.text = TextState {
                        tm: self.text.tm,
                        tlm: self.text.tlm,
                        ..text
                    };
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.ctm = m.then(&self.ctm);
                }
            }
            "BT" => {
                self.in_text = true;
                self.text.tm = Matrix::IDENTITY;
                self.text.tlm = Matrix::IDENTITY;
            }
            "ET" => self.in_text = false,
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.text.font = Some(name.clone());
                }
                self.text.size = num(1);
            }
            "Tc" => self.text.char_spacing = num(0),
            "Tw" => self.text.word_spacing = num(0),
            "Tz" => self.text.h_scale = num(0) / 100.0,
            "TL" => self.text.leading = num(0),
            "Ts" => self.text.rise = num(0),
            "Td" => self.move_line(num(0), num(1)),
            "TD" => {
                self.text.leading = -num(1);
                self.move_line(num(0), num(1));
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.text.tm = m;
                    self.text.tlm = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                self.text.word_spacing = num(0);
                self.text.char_spacing = num(1);
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    self.show_adjusted(items);
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.draw_xobject(name);
                }
            }
            _ => {}
        }
    }
}

fn color_components(doc: &Document, stream: &Stream) -> Option<usize> {
    let space = stream.dict.get(b"ColorSpace").ok().and_then(|o| resolve(doc, o))?;
    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceRGB" => Some(3),
            b"DeviceGray" => Some(1),
            _ => None,
        },
        Object::Array(parts) => {
            let is_icc = matches!(parts.first(), Some(Object::Name(n)) if n.as_slice() == b"ICCBased");
            if !is_icc {
                return None;
            }
            match resolve(doc, parts.get(1)?)? {
                Object::Stream(profile) => match profile.dict.get(b"N") {
                    Ok(Object::Integer(n)) if *n == 1 || *n == 3 => Some(*n as usize),
                    _ => None,
                },
                _ => None,
            }
        }
        _ => None,
    }
}

fn encode_png(
    width: u32,
    height: u32,
    components: usize,
    pixels: Vec<u8>,
) -> Result<Option<Vec<u8>>, Error> {
    let image = match components {
        3 => image::RgbImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageRgb8),
        1 => image::GrayImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageLuma8),
        _ => None,
    };
    let Some(image) = image else {
        return Ok(None);
    };
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    Ok(Some(png))
}

fn content_stream<'a>(doc: &'a Document, entry: &'a Object) -> Result<&'a Stream, String> {
    match entry {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Stream(stream)) => Ok(stream),
            Ok(_) => Err(format!("content object {} {} is not a stream", id.0, id.1)),
            Err(_) => Err(format!("missing content object {} {}", id.0, id.1)),
        },
        Object::Stream(stream) => Ok(stream),
        _ => Err("content entry is not a stream".to_string()),
    }
}

fn content_bytes(stream: &Stream) -> Result<Vec<u8>, String> {
    let filters = filters(stream);
    if filters.is_empty() {
        return Ok(stream.content.clone());
    }
    if let Some(unknown) = filters.iter().find(|f| !CONTENT_FILTERS.contains(*f)) {
        return Err(format!(
            "unsupported content filter {}",
            String::from_utf8_lossy(unknown)
        ));
    }
    let data = stream
        .decompressed_content()
        .map_err(|e| format!("cannot decode content stream: {e}"))?;
    // lopdf logs corrupt deflate data and hands back nothing.
    if data.is_empty() && !stream.content.is_empty() {
        return Err("content stream decodes to nothing".to_string());
    }
    Ok(data)
}

/// Decoded content of a page: every stream in `Contents`, in order.
fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, String> {
    let Ok(Object::Dictionary(page)) = doc.get_object(page_id) else {
        return Err("page object is not a dictionary".to_string());
    };
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };
    let entries = match contents {
        Object::Array(items) => items.as_slice(),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.as_slice(),
            _ => std::slice::from_ref(contents),
        },
        other => std::slice::from_ref(other),
    };

    let mut data = Vec::new();
    for entry in entries {
        data.extend(content_bytes(content_stream(doc, entry)?)?);
        data.push(b'\n');
    }
    Ok(data)
}

/// Convert an image XObject into an embeddable JPEG or PNG. `Ok(None)` means
/// the encoding is not one we can carry over.
fn extract_image(
    doc: &Document,
    stream: &Stream,
    ctm: &Matrix,
) -> Result<Option<EmbeddedImage>, Error> {
    let dimension = |key: &[u8]| match stream.dict.get(key) {
        Ok(Object::Integer(v)) if *v > 0 => u32::try_from(*v).ok(),
        _ => None,
    };
    let (Some(pixel_width), Some(pixel_height)) = (dimension(b"Width"), dimension(b"Height")) else {
        return Ok(None);
    };

    let (data, format) = if has_filter(stream, b"DCTDecode") {
        (stream.content.clone(), ImageFormat::Jpeg)
    } else {
        let bits = match stream.dict.get(b"BitsPerComponent") {
            Ok(Object::Integer(bits)) => *bits,
            _ => 8,
        };
        let Some(components) = color_components(doc, stream).filter(|_| bits == 8) else {
            return Ok(None);
        };
        let Some(mut pixels) = stream_data(stream) else {
            return Ok(None);
        };
        let expected = (pixel_width as usize)
            .checked_mul(pixel_height as usize)
            .and_then(|n| n.checked_mul(components));
        let Some(expected) = expected.filter(|&n| n <= pixels.len()) else {
            return Ok(None);
        };
        pixels.truncate(expected);
        match encode_png(pixel_width, pixel_height, components, pixels)? {
            Some(png) => (png, ImageFormat::Png),
            None => return Ok(None),
        }
    };

    Ok(Some(EmbeddedImage {
        data,
        format,
        pixel_width,
        pixel_height,
        display_width: ctm.x_scale(),
        display_height: ctm.y_scale(),
    }))
}

fn extract_page(
    doc: &Document,
    index: usize,
    page_id: ObjectId,
    options: &ConversionOptions,
) -> Result<model::Page, PageError> {
    let (width, height) = page_size(doc, page_id);
    let content = page_content(doc, page_id).map_err(|reason| PageError::new(index, reason))?;
    let content = Content::decode(&content)
        .map_err(|e| PageError::new(index, format!("cannot parse content stream: {e}")))?;

    let resources = match inherited(doc, page_id, b"Resources") {
        Some(Object::Dictionary(resources)) => Some(resources),
        _ => None,
    };
    let mut interpreter = PageInterpreter::new(doc, resources);
    for op in &content.operations {
        interpreter.execute(op);
    }
    if interpreter.in_text {
        return Err(PageError::new(index, "content stream ends inside a text object"));
    }
    log::debug!(
        "Page {}: {} spans, {} images",
        index + 1,
        interpreter.spans.len(),
        interpreter.images.len()
    );

    Ok(model::Page {
        width,
        height,
        blocks: layout::build_blocks(
            interpreter.spans,
            interpreter.images,
            options.merge_fragmented_text,
        ),
    })
}

/// Converter backed by a PDF loaded into memory.
pub struct PdfConverter {
    path: PathBuf,
    document: Option<Document>,
}

impl PdfConverter {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let document = Document::load(path)?;
        if document.is_encrypted() {
            return Err(Error::Encrypted);
        }
        log::debug!(
            "Loaded {} (PDF {}, {} pages)",
            path.display(),
            document.version,
            document.get_pages().len()
        );
        Ok(PdfConverter {
            path: path.to_path_buf(),
            document: Some(document),
        })
    }

    fn extract(
        &self,
        range: PageRange,
        options: &ConversionOptions,
    ) -> Result<(model::Document, ConversionReport), Error> {
        let doc = self.document.as_ref().ok_or(Error::Closed)?;
        let pages = doc.get_pages();
        let range = range.resolve(pages.len())?;

        let mut report = ConversionReport::default();
        let mut out = model::Document { pages: Vec::new() };
        for (index, page_id) in pages.values().copied().enumerate() {
            if !range.contains(&index) {
                continue;
            }
            match extract_page(doc, index, page_id, options) {
                Ok(page) => {
                    report.pages_converted += 1;
                    out.pages.push(page);
                }
                Err(e) if options.ignore_page_errors => {
                    log::warn!("Skipping {e}");
                    report.pages_skipped.push((e.page, e.reason));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok((out, report))
    }
}

impl Converter for PdfConverter {
    fn convert(
        &mut self,
        output: &Path,
        range: PageRange,
        options: &ConversionOptions,
    ) -> Result<ConversionReport, Error> {
        options.validate()?;
        let (document, mut report) = self.extract(range, options)?;
        for page in &document.pages {
            for block in &page.blocks {
                match block {
                    model::Block::Paragraph(_) => report.paragraphs += 1,
                    model::Block::Image(_) => report.images += 1,
                }
            }
        }
        let bytes = docx::write(&document)?;
        std::fs::write(output, bytes)?;
        log::info!(
            "Wrote {} ({} pages, {} paragraphs, {} images)",
            output.display(),
            report.pages_converted,
            report.paragraphs,
            report.images
        );
        Ok(report)
    }

    fn close(&mut self) {
        if self.document.take().is_some() {
            log::debug!("Released {}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    /// Builds one page's `Contents` entry, adding any streams it needs.
    type MakeContents = Box<dyn FnOnce(&mut Document) -> Object>;

    /// A document whose pages carry the given `Contents` entries. Fonts,
    /// resources and the media box live on the `Pages` node.
    fn document_with_contents(contents: Vec<MakeContents>) -> (Document, Vec<ObjectId>) {
        let mut doc = Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let pages_id = doc.new_object_id();
        let mut page_ids = Vec::new();
        for make_contents in contents {
            let contents = make_contents(&mut doc);
            page_ids.push(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => contents,
            }));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
                "Count" => page_ids.len() as i64,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        (doc, page_ids)
    }

    fn text_contents(content: &'static str) -> MakeContents {
        Box::new(move |doc: &mut Document| {
            let stream = Stream::new(dictionary! {}, content.as_bytes().to_vec());
            Object::Reference(doc.add_object(stream))
        })
    }

    fn stream_contents(stream: Stream) -> MakeContents {
        Box::new(move |doc: &mut Document| Object::Reference(doc.add_object(stream)))
    }

    fn raw_contents(entry: Object) -> MakeContents {
        Box::new(move |_: &mut Document| entry)
    }

    fn page_with_content(content: &'static str) -> (Document, ObjectId) {
        let (doc, pages) = document_with_contents(vec![text_contents(content)]);
        (doc, pages[0])
    }

    fn converter(doc: Document) -> PdfConverter {
        PdfConverter {
            path: PathBuf::from("fixture.pdf"),
            document: Some(doc),
        }
    }

    fn damaged_contents() -> Vec<MakeContents> {
        vec![
            raw_contents(Object::Reference((999, 0))),
            raw_contents(Object::Integer(7)),
            stream_contents(Stream::new(
                dictionary! { "Filter" => "FlateDecode" },
                b"this is not zlib data".to_vec(),
            )),
            stream_contents(Stream::new(
                dictionary! { "Filter" => "JBIG2Decode" },
                b"\x00\x01\x02".to_vec(),
            )),
            text_contents("BT /F1 12 Tf 72 700 Td (unterminated"),
        ]
    }

    fn paragraphs(page: &model::Page) -> Vec<String> {
        page.blocks
            .iter()
            .filter_map(|b| match b {
                model::Block::Paragraph(p) => Some(p.text()),
                model::Block::Image(_) => None,
            })
            .collect()
    }

    #[test]
    fn matrix_composition_order() {
        let scale = Matrix([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let shift = Matrix::translate(10.0, 5.0);
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 7.0));
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn inherits_media_box_and_resources() {
        let (doc, page_id) = page_with_content("BT /F1 12 Tf 72 700 Td (Hi) Tj ET");
        assert_eq!(page_size(&doc, page_id), (595.0, 842.0));
        let page = extract_page(&doc, 0, page_id, &ConversionOptions::default()).unwrap();
        assert_eq!(paragraphs(&page), vec!["Hi"]);
    }

    #[test]
    fn positions_follow_text_operators() {
        let (doc, page_id) = page_with_content(
            "BT /F1 12 Tf 14 TL 72 720 Td (first line) Tj T* (second line) Tj ET",
        );
        let page = extract_page(&doc, 0, page_id, &ConversionOptions::default()).unwrap();
        assert_eq!(paragraphs(&page), vec!["first line second line"]);

        let options = ConversionOptions {
            merge_fragmented_text: false,
            ..Default::default()
        };
        let page = extract_page(&doc, 0, page_id, &options).unwrap();
        assert_eq!(paragraphs(&page), vec!["first line", "second line"]);
    }

    #[test]
    fn tj_kerning_gap_becomes_space() {
        let (doc, page_id) =
            page_with_content("BT /F1 10 Tf 72 700 Td [(Hello) -400 (world)] TJ ET");
        let page = extract_page(&doc, 0, page_id, &ConversionOptions::default()).unwrap();
        assert_eq!(paragraphs(&page), vec!["Hello world"]);
    }

    #[test]
    fn text_matrix_scales_font_size() {
        let (doc, page_id) = page_with_content("BT /F1 1 Tf 18 0 0 18 72 700 Tm (Big) Tj ET");
        let page = extract_page(&doc, 0, page_id, &ConversionOptions::default()).unwrap();
        let model::Block::Paragraph(p) = &page.blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.runs[0].font_size, 18.0);
    }

    #[test]
    fn damaged_content_is_a_page_error() {
        let (doc, pages) = document_with_contents(damaged_contents());
        for (index, page_id) in pages.into_iter().enumerate() {
            let err = extract_page(&doc, index, page_id, &ConversionOptions::default())
                .err()
                .unwrap_or_else(|| panic!("page {index} should fail"));
            assert_eq!(err.page, index);
        }
    }

    #[test]
    fn page_without_contents_is_blank() {
        let (doc, pages) = document_with_contents(vec![raw_contents(Object::Array(Vec::new()))]);
        let page = extract_page(&doc, 0, pages[0], &ConversionOptions::default()).unwrap();
        assert!(page.blocks.is_empty());
    }

    #[test]
    fn content_array_is_concatenated() {
        let split: MakeContents = Box::new(|doc: &mut Document| {
            let first = doc.add_object(Stream::new(
                dictionary! {},
                b"BT /F1 12 Tf 72 700 Td (one) Tj".to_vec(),
            ));
            let second = doc.add_object(Stream::new(dictionary! {}, b"( two) Tj ET".to_vec()));
            Object::Array(vec![Object::Reference(first), Object::Reference(second)])
        });
        let (doc, pages) = document_with_contents(vec![split]);
        let page = extract_page(&doc, 0, pages[0], &ConversionOptions::default()).unwrap();
        assert_eq!(paragraphs(&page), vec!["one two"]);
    }

    #[test]
    fn failed_pages_are_skipped_and_recorded() {
        let mut contents = vec![text_contents("BT /F1 12 Tf 72 700 Td (kept) Tj ET")];
        contents.push(raw_contents(Object::Reference((999, 0))));
        contents.push(text_contents("BT /F1 12 Tf 72 700 Td (also kept) Tj ET"));
        let (doc, _) = document_with_contents(contents);

        let (out, report) = converter(doc)
            .extract(PageRange::ALL, &ConversionOptions::default())
            .unwrap();
        assert_eq!(report.pages_converted, 2);
        assert_eq!(out.pages.len(), 2);
        assert_eq!(report.pages_skipped.len(), 1);
        assert_eq!(report.pages_skipped[0].0, 1);
        assert!(report.pages_skipped[0].1.contains("999"), "{:?}", report.pages_skipped);
    }

    #[test]
    fn failed_page_aborts_when_errors_are_not_ignored() {
        let contents = vec![
            text_contents("BT /F1 12 Tf 72 700 Td (kept) Tj ET"),
            stream_contents(Stream::new(
                dictionary! { "Filter" => "JBIG2Decode" },
                b"\x00".to_vec(),
            )),
        ];
        let (doc, _) = document_with_contents(contents);
        let options = ConversionOptions {
            ignore_page_errors: false,
            ..Default::default()
        };
        let err = converter(doc).extract(PageRange::ALL, &options).err();
        assert!(matches!(err, Some(Error::Page(PageError { page: 1, .. }))), "{err:?}");
    }

    #[test]
    fn restore_brings_back_text_parameters() {
        let (doc, page_id) = page_with_content(
            "BT /F1 12 Tf 72 700 Td q /F1 30 Tf 50 Tz Q (Hi) Tj ET",
        );
        let page = extract_page(&doc, 0, page_id, &ConversionOptions::default()).unwrap();
        let model::Block::Paragraph(p) = &page.blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.runs[0].font_size, 12.0);
    }

    #[test]
    fn oversized_image_dimensions_are_skipped() {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 4_000_000_000_i64,
                "Height" => 4_000_000_000_i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            vec![0; 12],
        );
        let doc = Document::with_version("1.5");
        let image = extract_image(&doc, &stream, &Matrix::IDENTITY).unwrap();
        assert!(image.is_none());
    }
}
