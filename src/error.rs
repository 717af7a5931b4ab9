use std::fmt;

#[derive(Debug)]
pub enum Error {
    Pdf(lopdf::Error),
    Encrypted,
    NoPages,
    InvalidPageRange {
        start: usize,
        end: Option<usize>,
        total: usize,
    },
    OcrUnsupported,
    Page(PageError),
    Zip(zip::result::ZipError),
    Image(image::ImageError),
    Io(std::io::Error),
    Closed,
}

/// A failure confined to a single page. Skipped when the options tolerate
/// page errors, fatal otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct PageError {
    /// Zero-based page index.
    pub page: usize,
    pub reason: String,
}

impl PageError {
    pub(crate) fn new(page: usize, reason: impl Into<String>) -> Self {
        PageError {
            page,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}: {}", self.page + 1, self.reason)
    }
}

impl std::error::Error for PageError {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Pdf(e) => write!(f, "not a readable PDF file: {e}"),
            Error::Encrypted => write!(f, "PDF is encrypted"),
            Error::NoPages => write!(f, "PDF has no pages"),
            Error::InvalidPageRange { start, end, total } => match end {
                Some(end) => write!(
                    f,
                    "page range {start}..{end} selects no pages (document has {total})"
                ),
                None => write!(
                    f,
                    "page range {start}.. selects no pages (document has {total})"
                ),
            },
            Error::OcrUnsupported => write!(f, "OCR is not supported"),
            Error::Page(e) => write!(f, "failed to convert {e}"),
            Error::Zip(e) => write!(f, "ZIP error: {e}"),
            Error::Image(e) => write!(f, "image error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Closed => write!(f, "converter is already closed"),
        }
    }
}

impl std::error::Error for Error {}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Error::Pdf(e)
    }
}

impl From<PageError> for Error {
    fn from(e: PageError) -> Self {
        Error::Page(e)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e)
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
