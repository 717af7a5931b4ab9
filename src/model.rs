pub struct Document {
    pub pages: Vec<Page>,
}

pub struct Page {
    pub width: f32,  // points
    pub height: f32, // points
    pub blocks: Vec<Block>,
}

pub enum Block {
    Paragraph(Paragraph),
    Image(EmbeddedImage),
}

#[derive(Debug, Default, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub space_before: f32, // points
}

#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub text: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

pub struct EmbeddedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub display_width: f32,  // points
    pub display_height: f32, // points
}

#[cfg(test)]
impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.blocks.is_empty())
    }
}
