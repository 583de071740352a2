use serde::{Deserialize, Serialize};
use tracing::trace;

use super::blocks::TextBlock;

pub const DEFAULT_WATERMARK_LEFT: f32 = 550.0;
pub const DEFAULT_HEADER_TOP: f32 = 140.0;
pub const DEFAULT_SIDEBAR_LEFT: f32 = 450.0;
pub const DEFAULT_SIDEBAR_TOP: f32 = 200.0;
pub const DEFAULT_WATERMARK_PHRASE: &str = "Corte di Cassazione - copia non ufficiale";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Header,
    Sidebar,
    Body,
    Watermark,
}

impl Zone {
    pub fn as_str(self) -> &'static str {
        match self {
            Zone::Header => "header",
            Zone::Sidebar => "sidebar",
            Zone::Body => "body",
            Zone::Watermark => "watermark",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutThresholds {
    pub watermark_left: f32,
    pub watermark_phrase: String,
    pub header_top: f32,
    pub sidebar_left: f32,
    pub sidebar_top: f32,
}

impl Default for LayoutThresholds {
    fn default() -> Self {
        Self {
            watermark_left: DEFAULT_WATERMARK_LEFT,
            watermark_phrase: DEFAULT_WATERMARK_PHRASE.to_string(),
            header_top: DEFAULT_HEADER_TOP,
            sidebar_left: DEFAULT_SIDEBAR_LEFT,
            sidebar_top: DEFAULT_SIDEBAR_TOP,
        }
    }
}

type Predicate = fn(&TextBlock, &LayoutThresholds) -> bool;

#[derive(Clone, Copy)]
struct ZoneRule {
    zone: Zone,
    matches: Predicate,
}

const WATERMARK_RULE: ZoneRule = ZoneRule {
    zone: Zone::Watermark,
    matches: is_watermark,
};

const FIRST_PAGE_RULES: &[ZoneRule] = &[
    WATERMARK_RULE,
    ZoneRule {
        zone: Zone::Header,
        matches: is_header,
    },
    ZoneRule {
        zone: Zone::Sidebar,
        matches: is_sidebar,
    },
];

const CONTINUATION_RULES: &[ZoneRule] = &[WATERMARK_RULE];

fn is_header(block: &TextBlock, thresholds: &LayoutThresholds) -> bool {
    block.bbox.top < thresholds.header_top
}

fn is_sidebar(block: &TextBlock, thresholds: &LayoutThresholds) -> bool {
    block.bbox.left > thresholds.sidebar_left && block.bbox.top > thresholds.sidebar_top
}

fn is_watermark(block: &TextBlock, thresholds: &LayoutThresholds) -> bool {
    if block.bbox.left > thresholds.watermark_left {
        return true;
    }

    let phrase = thresholds.watermark_phrase.trim();
    !phrase.is_empty() && block.flat_text().contains(phrase)
}

#[derive(Debug, Clone)]
pub struct LayoutClassifier {
    thresholds: LayoutThresholds,
}

impl LayoutClassifier {
    pub fn new(thresholds: LayoutThresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify(&self, block: &TextBlock, first_page: bool) -> Zone {
        let rules = if first_page {
            FIRST_PAGE_RULES
        } else {
            CONTINUATION_RULES
        };

        rules
            .iter()
            .find(|rule| (rule.matches)(block, &self.thresholds))
            .map(|rule| rule.zone)
            .unwrap_or(Zone::Body)
    }

    pub fn classify_page<'a>(&self, blocks: &'a [TextBlock], first_page: bool) -> ClassifiedPage<'a> {
        let mut page = ClassifiedPage::default();
        for block in blocks {
            let zone = self.classify(block, first_page);
            trace!(
                page = block.page_index + 1,
                top = block.bbox.top,
                left = block.bbox.left,
                zone = zone.as_str(),
                "classified block"
            );
            match zone {
                Zone::Header => page.header.push(block),
                Zone::Sidebar => page.sidebar.push(block),
                Zone::Body => page.body.push(block),
                Zone::Watermark => page.watermark.push(block),
            }
        }
        page
    }
}

#[derive(Debug, Default)]
pub struct ClassifiedPage<'a> {
    pub header: Vec<&'a TextBlock>,
    pub sidebar: Vec<&'a TextBlock>,
    pub body: Vec<&'a TextBlock>,
    pub watermark: Vec<&'a TextBlock>,
}

impl ClassifiedPage<'_> {
    pub fn len(&self) -> usize {
        self.header.len() + self.sidebar.len() + self.body.len() + self.watermark.len()
    }
}
