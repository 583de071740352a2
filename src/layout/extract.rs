use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use tracing::debug;

use super::blocks::{BoundingBox, PageBlocks, TextBlock, TextLine, TextRun};

pub const DEFAULT_PDFTOTEXT: &str = "pdftotext";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{program} is not installed or not on PATH")]
    ToolUnavailable { program: String },

    #[error("{program} failed for {path}: {stderr}")]
    ToolFailed {
        program: String,
        path: String,
        stderr: String,
    },

    #[error("malformed bbox-layout XML at byte {position}: {message}")]
    Xml { position: usize, message: String },

    #[error("page {page} could not be decoded: {reason}")]
    Decode { page: usize, reason: String },
}

pub type PageOutcome = Result<PageBlocks, ExtractError>;

#[derive(Debug, Clone)]
pub struct BlockExtractor {
    program: PathBuf,
    max_pages: Option<usize>,
}

impl Default for BlockExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_PDFTOTEXT, None)
    }
}

impl BlockExtractor {
    pub fn new(program: impl Into<PathBuf>, max_pages: Option<usize>) -> Self {
        Self {
            program: program.into(),
            max_pages,
        }
    }

    pub fn extract(&self, pdf_path: &Path) -> Result<Vec<PageOutcome>, ExtractError> {
        let xml = self.run_bbox_layout(pdf_path)?;
        let pages = parse_bbox_layout(&xml)?;
        debug!(
            path = %pdf_path.display(),
            pages = pages.len(),
            failed_pages = pages.iter().filter(|page| page.is_err()).count(),
            "decoded bbox layout"
        );
        Ok(pages)
    }

    pub fn tool_version(&self) -> Option<String> {
        let output = Command::new(&self.program).arg("-v").output().ok()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let source = if stdout.trim().is_empty() {
            stderr.trim()
        } else {
            stdout.trim()
        };

        source
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
    }

    fn run_bbox_layout(&self, pdf_path: &Path) -> Result<String, ExtractError> {
        let program = self.program.display().to_string();
        let mut command = Command::new(&self.program);
        command
            .arg("-bbox-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg("-f")
            .arg("1");
        if let Some(max_pages) = self.max_pages {
            command.arg("-l").arg(max_pages.to_string());
        }
        command.arg(pdf_path).arg("-");

        let output = command.output().map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                ExtractError::ToolUnavailable {
                    program: program.clone(),
                }
            } else {
                ExtractError::ToolFailed {
                    program: program.clone(),
                    path: pdf_path.display().to_string(),
                    stderr: err.to_string(),
                }
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::ToolFailed {
                program,
                path: pdf_path.display().to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).replace('\u{0000}', ""))
    }
}

#[derive(Debug, Default)]
struct PageState {
    index: usize,
    width: f32,
    height: f32,
    blocks: Vec<TextBlock>,
    failure: Option<String>,
}

#[derive(Debug)]
struct BlockState {
    bbox: BoundingBox,
    lines: Vec<TextLine>,
}

#[derive(Debug)]
struct WordState {
    height: f32,
    text: String,
}

pub fn parse_bbox_layout(xml: &str) -> Result<Vec<PageOutcome>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut pages = Vec::<PageOutcome>::new();
    let mut page: Option<PageState> = None;
    let mut block: Option<BlockState> = None;
    let mut line: Option<Vec<(String, f32)>> = None;
    let mut word: Option<WordState> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => match element.name().as_ref() {
                b"page" => {
                    let index = pages.len();
                    let mut state = PageState {
                        index,
                        ..PageState::default()
                    };
                    match (attr_f32(&element, b"width"), attr_f32(&element, b"height")) {
                        (Some(width), Some(height)) => {
                            state.width = width;
                            state.height = height;
                        }
                        _ => state.failure = Some("page is missing width/height".to_string()),
                    }
                    page = Some(state);
                    block = None;
                    line = None;
                    word = None;
                }
                b"block" => {
                    let Some(current) = page.as_mut() else {
                        continue;
                    };
                    if current.failure.is_some() {
                        continue;
                    }
                    match element_bbox(&element, current) {
                        Ok(bbox) => {
                            block = Some(BlockState {
                                bbox,
                                lines: Vec::new(),
                            })
                        }
                        Err(err) => current.failure = Some(decode_reason(err)),
                    }
                }
                b"line" => {
                    if block.is_some() {
                        line = Some(Vec::new());
                    } else {
                        poison(&mut page, "line outside of a block");
                    }
                }
                b"word" => {
                    let Some(current) = page.as_mut() else {
                        continue;
                    };
                    if current.failure.is_some() {
                        continue;
                    }
                    if line.is_none() {
                        current.failure = Some("word outside of a line".to_string());
                        continue;
                    }
                    match element_bbox(&element, current) {
                        Ok(bbox) => {
                            word = Some(WordState {
                                height: bbox.height(),
                                text: String::new(),
                            })
                        }
                        Err(err) => current.failure = Some(decode_reason(err)),
                    }
                }
                _ => {}
            },
            Ok(Event::Text(text)) => {
                if let Some(current) = word.as_mut() {
                    let decoded = text
                        .unescape()
                        .map(|value| value.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                    current.text.push_str(&decoded);
                }
            }
            Ok(Event::End(element)) => match element.name().as_ref() {
                b"word" => {
                    if let (Some(finished), Some(words)) = (word.take(), line.as_mut()) {
                        let text = finished.text.trim().to_string();
                        if !text.is_empty() {
                            words.push((text, finished.height));
                        }
                    }
                }
                b"line" => {
                    if let (Some(words), Some(current)) = (line.take(), block.as_mut()) {
                        current.lines.push(group_runs(words));
                    }
                }
                b"block" => {
                    if let (Some(finished), Some(current)) = (block.take(), page.as_mut()) {
                        if current.failure.is_none() {
                            current.blocks.push(TextBlock {
                                page_index: current.index,
                                bbox: finished.bbox,
                                lines: finished.lines,
                            });
                        }
                    }
                }
                b"page" => {
                    if let Some(finished) = page.take() {
                        pages.push(finish_page(finished));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(ExtractError::Xml {
                    position: reader.buffer_position(),
                    message: err.to_string(),
                });
            }
            _ => {}
        }
    }

    if let Some(unfinished) = page.take() {
        let page_number = unfinished.index + 1;
        pages.push(Err(ExtractError::Decode {
            page: page_number,
            reason: "page element was not closed".to_string(),
        }));
    }

    Ok(pages)
}

fn finish_page(state: PageState) -> PageOutcome {
    match state.failure {
        Some(reason) => Err(ExtractError::Decode {
            page: state.index + 1,
            reason,
        }),
        None => Ok(PageBlocks {
            page_index: state.index,
            width: state.width,
            height: state.height,
            blocks: state.blocks,
        }),
    }
}

fn poison(page: &mut Option<PageState>, reason: &str) {
    if let Some(current) = page.as_mut() {
        if current.failure.is_none() {
            current.failure = Some(reason.to_string());
        }
    }
}

fn decode_reason(err: ExtractError) -> String {
    match err {
        ExtractError::Decode { reason, .. } => reason,
        other => other.to_string(),
    }
}

fn group_runs(words: Vec<(String, f32)>) -> TextLine {
    let mut runs = Vec::<TextRun>::new();
    for (text, height) in words {
        match runs.last_mut() {
            Some(run) if size_bucket(run.font_size) == size_bucket(height) => {
                run.text.push(' ');
                run.text.push_str(&text);
            }
            _ => runs.push(TextRun {
                text,
                font_size: height,
            }),
        }
    }
    TextLine { runs }
}

fn size_bucket(size: f32) -> i64 {
    (size * 10.0).round() as i64
}

fn element_bbox(element: &BytesStart<'_>, page: &PageState) -> Result<BoundingBox, ExtractError> {
    let page_index = page.index;
    let coordinate = |name: &[u8]| {
        attr_f32(element, name).ok_or_else(|| ExtractError::Decode {
            page: page_index + 1,
            reason: format!(
                "<{}> has a missing or non-numeric {} attribute",
                String::from_utf8_lossy(element.name().as_ref()),
                String::from_utf8_lossy(name)
            ),
        })
    };

    let left = clamp_to_page(coordinate(b"xMin")?, page.width);
    let top = clamp_to_page(coordinate(b"yMin")?, page.height);
    let right = clamp_to_page(coordinate(b"xMax")?, page.width);
    let bottom = clamp_to_page(coordinate(b"yMax")?, page.height);

    BoundingBox::checked(page_index, left, top, right, bottom)
}

// Stamps and bleed marks may sit slightly outside the media box.
fn clamp_to_page(value: f32, extent: f32) -> f32 {
    if !value.is_finite() {
        return value;
    }
    let value = value.max(0.0);
    if extent.is_finite() && extent > 0.0 {
        value.min(extent)
    } else {
        value
    }
}

fn attr_f32(element: &BytesStart<'_>, name: &[u8]) -> Option<f32> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .and_then(|attr| {
            std::str::from_utf8(&attr.value)
                .ok()
                .and_then(|value| value.trim().parse::<f32>().ok())
        })
}

#[cfg(test)]
pub(crate) fn page_xml(width: f32, height: f32, blocks: &[(f32, f32, f32, f32, &[&str])]) -> String {
    let mut xml = format!(r#"<page width="{width}" height="{height}"><flow>"#);
    for (left, top, right, bottom, lines) in blocks {
        xml.push_str(&format!(
            r#"<block xMin="{left}" yMin="{top}" xMax="{right}" yMax="{bottom}">"#
        ));
        for (offset, line) in lines.iter().enumerate() {
            let line_top = top + offset as f32 * 12.0;
            xml.push_str(&format!(
                r#"<line xMin="{left}" yMin="{line_top}" xMax="{right}" yMax="{}">"#,
                line_top + 10.0
            ));
            for word in line.split_whitespace() {
                xml.push_str(&format!(
                    r#"<word xMin="{left}" yMin="{line_top}" xMax="{right}" yMax="{}">{}</word>"#,
                    line_top + 10.0,
                    word.replace('&', "&amp;")
                ));
            }
            xml.push_str("</line>");
        }
        xml.push_str("</block>");
    }
    xml.push_str("</flow></page>");
    xml
}
