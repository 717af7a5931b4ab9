//! `ToUnicode` CMap parsing.
//!
//! Only the parts needed to map character codes to text are understood:
//! `codespacerange` (for the code width), `bfchar` and `bfrange`.

use std::collections::HashMap;

/// Longest `bfrange` expanded; anything wider is malformed.
const MAX_RANGE_SPAN: u32 = 0xFFFF;

#[derive(Debug, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    ArrayOpen,
    ArrayClose,
    Word(String),
}

#[derive(Debug, Default)]
pub(crate) struct ToUnicode {
    code_len: Option<usize>,
    map: HashMap<u32, String>,
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'<' | b'>' | b'[' | b']' | b'(' | b')' | b'/' | b'%' | b'{' | b'}')
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn tokenize(src: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < src.len() {
        let b = src[i];
        match b {
            b if b.is_ascii_whitespace() => i += 1,
            b'%' => {
                while i < src.len() && src[i] != b'\n' && src[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if src.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if src.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                i += 1;
                let mut nibbles = Vec::new();
                while i < src.len() && src[i] != b'>' {
                    if let Some(v) = hex_value(src[i]) {
                        nibbles.push(v);
                    }
                    i += 1;
                }
                i += 1;
                if nibbles.len() % 2 == 1 {
                    nibbles.push(0);
                }
                let bytes = nibbles.chunks(2).map(|p| (p[0] << 4) | p[1]).collect();
                tokens.push(Token::Hex(bytes));
            }
            b'[' => {
                tokens.push(Token::ArrayOpen);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayClose);
                i += 1;
            }
            b'(' => {
                let mut depth = 0usize;
                while i < src.len() {
                    match src[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                i += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
            }
            _ => {
                let start = i;
                i += 1;
                while i < src.len() && !src[i].is_ascii_whitespace() && !is_delimiter(src[i]) {
                    i += 1;
                }
                tokens.push(Token::Word(
                    String::from_utf8_lossy(&src[start..i]).into_owned(),
                ));
            }
        }
    }
    tokens
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn utf16_text(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|p| match p {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect();
    String::from_utf16_lossy(&units)
}

/// Destination string for `offset` codes past the start of a `bfrange`:
/// the last UTF-16 unit is incremented.
fn offset_text(base: &[u8], offset: u32) -> String {
    let mut units: Vec<u16> = base
        .chunks(2)
        .map(|p| match p {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect();
    if let Some(last) = units.last_mut() {
        *last = last.wrapping_add(offset as u16);
    }
    String::from_utf16_lossy(&units)
}

impl ToUnicode {
    pub(crate) fn parse(src: &[u8]) -> ToUnicode {
        let tokens = tokenize(src);
        let mut cmap = ToUnicode::default();
        let mut i = 0;
        while i < tokens.len() {
            let Token::Word(word) = &tokens[i] else {
                i += 1;
                continue;
            };
            i += 1;
            match word.as_str() {
                "begincodespacerange" => {
                    while let Some(Token::Hex(lo)) = tokens.get(i) {
                        if cmap.code_len.is_none() && !lo.is_empty() {
                            cmap.code_len = Some(lo.len());
                        }
                        i += 2;
                    }
                }
                "beginbfchar" => {
                    while let (Some(Token::Hex(src)), Some(Token::Hex(dst))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        cmap.map.insert(code_of(src), utf16_text(dst));
                        i += 2;
                    }
                }
                "beginbfrange" => {
                    while let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        let (lo, hi) = (code_of(lo), code_of(hi));
                        i += 2;
                        match tokens.get(i) {
                            Some(Token::Hex(base)) => {
                                if hi >= lo && hi - lo <= MAX_RANGE_SPAN {
                                    for code in lo..=hi {
                                        cmap.map.insert(code, offset_text(base, code - lo));
                                    }
                                }
                                i += 1;
                            }
                            Some(Token::ArrayOpen) => {
                                i += 1;
                                let mut code = lo;
                                while let Some(Token::Hex(dst)) = tokens.get(i) {
                                    if code <= hi {
                                        cmap.map.insert(code, utf16_text(dst));
                                    }
                                    code = code.saturating_add(1);
                                    i += 1;
                                }
                                if tokens.get(i) == Some(&Token::ArrayClose) {
                                    i += 1;
                                }
                            }
                            _ => break,
                        }
                    }
                }
                _ => {}
            }
        }
        cmap
    }

    /// Code width in bytes declared by the codespace range, if any.
    pub(crate) fn code_len(&self) -> Option<usize> {
        self.code_len
    }

    pub(crate) fn lookup(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }
}
