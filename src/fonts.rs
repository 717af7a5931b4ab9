use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};

use crate::cmap::ToUnicode;
use crate::pdf::{dict_get, number, stream_data};

/// A decoded glyph: its text, advance width in 1/1000 text space units, and
/// whether it is the single-byte space that word spacing (`Tw`) applies to.
#[derive(Debug, PartialEq)]
pub(crate) struct Glyph {
    pub(crate) text: String,
    pub(crate) width: f32,
    pub(crate) word_space: bool,
}

enum Widths {
    Simple { first_char: u32, widths: Vec<f32>, missing: f32 },
    Composite { widths: HashMap<u32, f32>, default: f32 },
    Standard(StandardMetrics),
}

#[derive(Clone, Copy)]
enum StandardMetrics {
    Helvetica,
    Courier,
}

pub(crate) struct FontInfo {
    code_len: usize,
    to_unicode: Option<ToUnicode>,
    widths: Widths,
    pub(crate) bold: bool,
    pub(crate) italic: bool,
}

/// Windows-1252 (WinAnsi) byte to Unicode char mapping.
/// Bytes 0x80-0x9F are remapped; all others map directly to their Unicode codepoint.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}', // bullet
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

/// Approximate Helvetica width at 1000 units/em for a WinAnsi code.
fn helvetica_width(code: u32) -> f32 {
    match code {
        32 => 278.0,                          // space
        33..=47 => 333.0,                     // punctuation
        48..=57 => 556.0,                     // digits
        58..=64 => 333.0,                     // more punctuation
        73 | 74 => 278.0,                     // I J (narrow uppercase)
        77 => 833.0,                          // M (wide)
        65..=90 => 667.0,                     // uppercase A-Z (average)
        91..=96 => 333.0,                     // brackets etc.
        102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
        109 | 119 => 833.0,                   // m w (wide)
        97..=122 => 556.0,                    // lowercase a-z (average)
        _ => 556.0,
    }
}

/// Strip a subset tag such as `ABCDEF+` from a base font name.
fn base_font_name(font: &Dictionary) -> String {
    let raw = match font.get(b"BaseFont") {
        Ok(Object::Name(name)) => String::from_utf8_lossy(name).into_owned(),
        _ => return String::new(),
    };
    match raw.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => {
            rest.to_string()
        }
        _ => raw,
    }
}

fn style_from_name(name: &str) -> (bool, bool) {
    let lower = name.to_ascii_lowercase();
    let bold = ["bold", "black", "heavy", "semibold", "demi"]
        .iter()
        .any(|k| lower.contains(k));
    let italic = lower.contains("italic") || lower.contains("oblique");
    (bold, italic)
}

const FLAG_ITALIC: i64 = 1 << 6;
const FLAG_FORCE_BOLD: i64 = 1 << 18;

fn descriptor_flags(doc: &Document, font: &Dictionary) -> i64 {
    dict_get(doc, font, b"FontDescriptor")
        .and_then(|d| match d {
            Object::Dictionary(d) => dict_get(doc, d, b"Flags"),
            _ => None,
        })
        .and_then(|f| match f {
            Object::Integer(v) => Some(*v),
            _ => None,
        })
        .unwrap_or(0)
}

fn descendant_font<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    match dict_get(doc, font, b"DescendantFonts")? {
        Object::Array(items) => match crate::pdf::resolve(doc, items.first()?)? {
            Object::Dictionary(d) => Some(d),
            _ => None,
        },
        _ => None,
    }
}

/// Parse a CID font `W` array: `c [w1 w2 ...]` and `c_first c_last w` entries.
fn composite_widths(items: &[Object]) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < items.len() {
        let Some(first) = number(&items[i]) else {
            break;
        };
        let first = first as u32;
        match items.get(i + 1) {
            Some(Object::Array(list)) => {
                for (offset, w) in list.iter().enumerate() {
                    let code = u32::try_from(offset).ok().and_then(|o| first.checked_add(o));
                    if let (Some(code), Some(w)) = (code, number(w)) {
                        widths.insert(code, w);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Some(last), Some(w)) = (number(last), items.get(i + 2).and_then(number))
                else {
                    break;
                };
                let last = last as u32;
                if last >= first && last - first <= 0xFFFF {
                    for code in first..=last {
                        widths.insert(code, w);
                    }
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

impl FontInfo {
    pub(crate) fn from_dict(doc: &Document, font: &Dictionary) -> FontInfo {
        let subtype = match font.get(b"Subtype") {
            Ok(Object::Name(n)) => n.as_slice(),
            _ => b"Type1".as_slice(),
        };
        let composite = subtype == b"Type0";
        let name = base_font_name(font);
        let (mut bold, mut italic) = style_from_name(&name);

        let to_unicode = match dict_get(doc, font, b"ToUnicode") {
            Some(Object::Stream(stream)) => stream_data(stream).map(|data| ToUnicode::parse(&data)),
            _ => None,
        };

        let widths = if composite {
            let descendant = descendant_font(doc, font);
            let default = descendant
                .and_then(|d| dict_get(doc, d, b"DW"))
                .and_then(number)
                .unwrap_or(1000.0);
            let widths = match descendant.and_then(|d| dict_get(doc, d, b"W")) {
                Some(Object::Array(items)) => composite_widths(items),
                _ => HashMap::new(),
            };
            if let Some(d) = descendant {
                let flags = descriptor_flags(doc, d);
                bold |= flags & FLAG_FORCE_BOLD != 0;
                italic |= flags & FLAG_ITALIC != 0;
            }
            Widths::Composite { widths, default }
        } else {
            let flags = descriptor_flags(doc, font);
            bold |= flags & FLAG_FORCE_BOLD != 0;
            italic |= flags & FLAG_ITALIC != 0;
            match dict_get(doc, font, b"Widths") {
                Some(Object::Array(items)) => Widths::Simple {
                    first_char: dict_get(doc, font, b"FirstChar")
                        .and_then(number)
                        .unwrap_or(0.0) as u32,
                    widths: items.iter().map(|w| number(w).unwrap_or(0.0)).collect(),
                    missing: dict_get(doc, font, b"FontDescriptor")
                        .and_then(|d| match d {
                            Object::Dictionary(d) => dict_get(doc, d, b"MissingWidth"),
                            _ => None,
                        })
                        .and_then(number)
                        .unwrap_or(0.0),
                },
                _ if name.to_ascii_lowercase().contains("courier") => {
                    Widths::Standard(StandardMetrics::Courier)
                }
                _ => Widths::Standard(StandardMetrics::Helvetica),
            }
        };

        let code_len = to_unicode
            .as_ref()
            .and_then(ToUnicode::code_len)
            .filter(|len| (1..=4).contains(len))
            .unwrap_or(if composite { 2 } else { 1 });

        FontInfo {
            code_len,
            to_unicode,
            widths,
            bold,
            italic,
        }
    }

    /// Stand-in for a font the page names but does not define.
    pub(crate) fn fallback() -> FontInfo {
        FontInfo {
            code_len: 1,
            to_unicode: None,
            widths: Widths::Standard(StandardMetrics::Helvetica),
            bold: false,
            italic: false,
        }
    }

    fn width(&self, code: u32) -> f32 {
        match &self.widths {
            Widths::Simple {
                first_char,
                widths,
                missing,
            } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
                .copied()
                .unwrap_or(*missing),
            Widths::Composite { widths, default } => {
                widths.get(&code).copied().unwrap_or(*default)
            }
            Widths::Standard(StandardMetrics::Helvetica) => helvetica_width(code),
            Widths::Standard(StandardMetrics::Courier) => 600.0,
        }
    }

    fn text_for(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.lookup(code)) {
            return text.to_string();
        }
        if self.code_len == 1 {
            return winansi_to_char(code as u8).to_string();
        }
        char::from_u32(code)
            .filter(|c| !c.is_control())
            .map(String::from)
            .unwrap_or_else(|| '\u{FFFD}'.to_string())
    }

    pub(crate) fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        bytes
            .chunks(self.code_len)
            .map(|chunk| {
                let code = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
                Glyph {
                    text: self.text_for(code),
                    width: self.width(code),
                    word_space: self.code_len == 1 && code == 32,
                }
            })
            .collect()
    }
}
