use crate::error::Error;

/// Feature toggles passed to the converter.
///
/// The defaults are the only configuration the command-line tool ever uses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConversionOptions {
    /// Join consecutive lines of similar size into one paragraph instead of
    /// emitting a paragraph per text line.
    pub merge_fragmented_text: bool,
    /// Optical character recognition. Not available; must stay off.
    pub ocr_enabled: bool,
    /// Skip pages that fail individually instead of aborting the conversion.
    pub ignore_page_errors: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        ConversionOptions {
            merge_fragmented_text: true,
            ocr_enabled: false,
            ignore_page_errors: true,
        }
    }
}

impl ConversionOptions {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.ocr_enabled {
            return Err(Error::OcrUnsupported);
        }
        Ok(())
    }
}

/// Zero-based page selection; `end` is exclusive, `None` means "to the last page".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl PageRange {
    pub const ALL: PageRange = PageRange {
        start: 0,
        end: None,
    };

    /// Clamp against a document of `total` pages.
    pub(crate) fn resolve(&self, total: usize) -> Result<std::ops::Range<usize>, Error> {
        if total == 0 {
            return Err(Error::NoPages);
        }
        let end = self.end.map_or(total, |e| e.min(total));
        if self.start >= end {
            return Err(Error::InvalidPageRange {
                start: self.start,
                end: self.end,
                total,
            });
        }
        Ok(self.start..end)
    }
}

impl Default for PageRange {
    fn default() -> Self {
        PageRange::ALL
    }
}
