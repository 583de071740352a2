use serde::Serialize;

use super::extract::ExtractError;

/// Page-space rectangle in PDF points, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Option<Self> {
        let finite = [left, top, right, bottom]
            .iter()
            .all(|value| value.is_finite());
        if !finite || left < 0.0 || top < 0.0 || left > right || top > bottom {
            return None;
        }

        Some(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn checked(
        page_index: usize,
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    ) -> Result<Self, ExtractError> {
        Self::new(left, top, right, bottom).ok_or_else(|| ExtractError::Decode {
            page: page_index + 1,
            reason: format!("invalid bounding box ({left}, {top}, {right}, {bottom})"),
        })
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub text: String,
    pub font_size: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TextLine {
    pub runs: Vec<TextRun>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .map(|run| run.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub page_index: usize,
    pub bbox: BoundingBox,
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    pub fn line_texts(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(TextLine::text)
            .filter(|line| !line.trim().is_empty())
            .collect()
    }

    pub fn flat_text(&self) -> String {
        self.line_texts().join(" ")
    }

    pub fn is_blank(&self) -> bool {
        self.lines
            .iter()
            .all(|line| line.runs.iter().all(|run| run.text.trim().is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageBlocks {
    pub page_index: usize,
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<TextBlock>,
}

pub fn sort_reading_order(blocks: &mut [&TextBlock]) {
    blocks.sort_by(|a, b| {
        a.bbox
            .top
            .total_cmp(&b.bbox.top)
            .then(a.bbox.left.total_cmp(&b.bbox.left))
    });
}
