//! Reading-order reconstruction: positioned spans become lines, lines become
//! paragraphs, and images are slotted in between by their vertical position.

use crate::model::{Block, EmbeddedImage, Paragraph, Run};

/// Spans whose baselines are closer than this fraction of the font size share a line.
const SAME_LINE_TOLERANCE: f32 = 0.5;
/// Horizontal gap, as a fraction of the font size, that reads as a word break.
const WORD_GAP: f32 = 0.15;
/// Baseline-to-baseline distance, as a multiple of the font size, still
/// considered part of the same paragraph.
const PARAGRAPH_LINE_GAP: f32 = 1.6;
const NORMAL_LEADING: f32 = 1.2;
const MAX_SPACE_BEFORE: f32 = 72.0;

/// Text shown by one string operand, in user space (y grows upwards).
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Span {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) width: f32,
    pub(crate) font_size: f32,
    pub(crate) text: String,
    pub(crate) bold: bool,
    pub(crate) italic: bool,
}

pub(crate) struct PlacedImage {
    /// Upper edge in user space.
    pub(crate) top: f32,
    pub(crate) image: EmbeddedImage,
}

struct Line {
    baseline: f32,
    font_size: f32,
    runs: Vec<Run>,
}

fn round_size(size: f32) -> f32 {
    (size * 2.0).round() / 2.0
}

fn push_run(runs: &mut Vec<Run>, run: Run) {
    if run.text.is_empty() {
        return;
    }
    match runs.last_mut() {
        Some(last)
            if last.bold == run.bold
                && last.italic == run.italic
                && last.font_size == run.font_size =>
        {
            last.text.push_str(&run.text);
        }
        _ => runs.push(run),
    }
}

fn build_line(mut spans: Vec<Span>) -> Option<Line> {
    spans.sort_by(|a, b| a.x.total_cmp(&b.x));
    let baseline = spans.first()?.y;
    let font_size = spans.iter().map(|s| s.font_size).fold(0.0, f32::max);

    let mut runs: Vec<Run> = Vec::new();
    let mut prev: Option<&Span> = None;
    for span in &spans {
        if let Some(p) = prev {
            // Text drawn twice at almost the same spot fakes bold; keep one copy.
            if p.text == span.text && (p.x - span.x).abs() < 1.0 {
                continue;
            }
            let gap = span.x - (p.x + p.width);
            let at_boundary = p.text.ends_with(char::is_whitespace)
                || span.text.starts_with(char::is_whitespace);
            if gap > WORD_GAP * span.font_size.max(p.font_size) && !at_boundary {
                if let Some(last) = runs.last_mut() {
                    last.text.push(' ');
                }
            }
        }
        push_run(
            &mut runs,
            Run {
                text: span.text.clone(),
                font_size: round_size(span.font_size),
                bold: span.bold,
                italic: span.italic,
            },
        );
        prev = Some(span);
    }

    if let Some(first) = runs.first_mut() {
        first.text = first.text.trim_start().to_string();
    }
    if let Some(last) = runs.last_mut() {
        last.text = last.text.trim_end().to_string();
    }
    runs.retain(|r| !r.text.is_empty());
    if runs.is_empty() {
        return None;
    }
    Some(Line {
        baseline,
        font_size,
        runs,
    })
}

fn group_lines(mut spans: Vec<Span>) -> Vec<Line> {
    spans.retain(|s| !s.text.is_empty());
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut groups: Vec<Vec<Span>> = Vec::new();
    for span in spans {
        match groups.last_mut() {
            Some(group)
                if (group[0].y - span.y).abs()
                    <= SAME_LINE_TOLERANCE * group[0].font_size.max(span.font_size) =>
            {
                group.push(span)
            }
            _ => groups.push(vec![span]),
        }
    }
    groups.into_iter().filter_map(build_line).collect()
}

/// Append `line` to `para`, undoing end-of-line hyphenation.
fn join_line(para: &mut Paragraph, line: Line) {
    let Some(last) = para.runs.last_mut() else {
        para.runs = line.runs;
        return;
    };
    let mut chars = last.text.chars().rev();
    let hyphenated = chars.next() == Some('-') && chars.next().is_some_and(char::is_alphabetic);
    if hyphenated {
        last.text.pop();
    } else {
        last.text.push(' ');
    }
    for run in line.runs {
        push_run(&mut para.runs, run);
    }
}

/// A paragraph together with the upper edge of its first line.
struct PlacedParagraph {
    top: f32,
    paragraph: Paragraph,
}

fn build_paragraphs(lines: Vec<Line>, merge: bool) -> Vec<PlacedParagraph> {
    let mut out: Vec<PlacedParagraph> = Vec::new();
    let mut prev: Option<(f32, f32)> = None; // (baseline, font size) of previous line

    for line in lines {
        let gap = prev.map(|(baseline, _)| baseline - line.baseline);
        let continues = match (prev, gap) {
            (Some((_, prev_size)), Some(gap)) => {
                merge
                    && gap <= PARAGRAPH_LINE_GAP * prev_size
                    && (prev_size - line.font_size).abs() < 1.0
            }
            _ => false,
        };
        prev = Some((line.baseline, line.font_size));

        if continues && let Some(current) = out.last_mut() {
            join_line(&mut current.paragraph, line);
            continue;
        }

        let space_before = gap
            .map(|g| (g - NORMAL_LEADING * line.font_size).clamp(0.0, MAX_SPACE_BEFORE))
            .unwrap_or(0.0);
        out.push(PlacedParagraph {
            top: line.baseline + line.font_size,
            paragraph: Paragraph {
                runs: line.runs,
                space_before,
            },
        });
    }
    out
}

/// Lay out one page's content in reading order, top to bottom.
pub(crate) fn build_blocks(
    spans: Vec<Span>,
    mut images: Vec<PlacedImage>,
    merge: bool,
) -> Vec<Block> {
    let paragraphs = build_paragraphs(group_lines(spans), merge);

    images.sort_by(|a, b| b.top.total_cmp(&a.top));

    let mut blocks = Vec::with_capacity(paragraphs.len() + images.len());
    let mut images = images.into_iter().peekable();
    for placed in paragraphs {
        while let Some(image) = images.next_if(|i| i.top > placed.top) {
            blocks.push(Block::Image(image.image));
        }
        blocks.push(Block::Paragraph(placed.paragraph));
    }
    blocks.extend(images.map(|i| Block::Image(i.image)));
    blocks
}
