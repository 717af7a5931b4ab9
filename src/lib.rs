mod cmap;
mod docx;
mod error;
mod fonts;
mod layout;
mod model;
mod options;
mod pdf;
mod session;

pub use error::{Error, PageError};
pub use options::{ConversionOptions, PageRange};
pub use pdf::PdfConverter;
pub use session::{ConversionReport, Converter, Session};

use std::path::Path;

/// Convert every page of `input` with the default options.
pub fn convert_pdf_to_docx(input: &Path, output: &Path) -> Result<ConversionReport, Error> {
    convert_with(
        input,
        output,
        PageRange::ALL,
        &ConversionOptions::default(),
        PdfConverter::open,
    )
}

/// Open a converter with `open`, run one conversion, and release the
/// converter whether or not the conversion succeeded.
pub fn convert_with<C, F>(
    input: &Path,
    output: &Path,
    range: PageRange,
    options: &ConversionOptions,
    open: F,
) -> Result<ConversionReport, Error>
where
    C: Converter,
    F: FnOnce(&Path) -> Result<C, Error>,
{
    let mut session = Session::open(input, open)?;
    session.convert(output, range, options)
}
