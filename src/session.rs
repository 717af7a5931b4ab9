//! Converter lifecycle.
//!
//! A [`Session`] owns one open converter and releases it when dropped, so the
//! converter is closed exactly once on every path out of a conversion,
//! including early returns through `?`.

use std::path::Path;

use crate::error::Error;
use crate::options::{ConversionOptions, PageRange};

/// Summary of a finished conversion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversionReport {
    pub pages_converted: usize,
    /// Zero-based index and reason for each page that was skipped.
    pub pages_skipped: Vec<(usize, String)>,
    pub paragraphs: usize,
    pub images: usize,
}

/// A stateful handle bound to one input document.
pub trait Converter {
    fn convert(
        &mut self,
        output: &Path,
        range: PageRange,
        options: &ConversionOptions,
    ) -> Result<ConversionReport, Error>;

    /// Release the underlying document. Called once by [`Session`].
    fn close(&mut self);
}

pub struct Session<C: Converter> {
    converter: Option<C>,
}

impl<C: Converter> Session<C> {
    /// Acquire a converter for `input`. If `open` fails there is nothing to
    /// release and no session is created.
    pub fn open<F>(input: &Path, open: F) -> Result<Self, Error>
    where
        F: FnOnce(&Path) -> Result<C, Error>,
    {
        let converter = open(input)?;
        log::debug!("Opened converter for {}", input.display());
        Ok(Session {
            converter: Some(converter),
        })
    }

    pub fn convert(
        &mut self,
        output: &Path,
        range: PageRange,
        options: &ConversionOptions,
    ) -> Result<ConversionReport, Error> {
        let converter = self.converter.as_mut().ok_or(Error::Closed)?;
        converter.convert(output, range, options)
    }

    /// Release the converter now rather than at end of scope.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut converter) = self.converter.take() {
            converter.close();
            log::debug!("Closed converter");
        }
    }
}

impl<C: Converter> Drop for Session<C> {
    fn drop(&mut self) {
        self.release();
    }
}
