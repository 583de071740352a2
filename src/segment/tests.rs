use super::window::OffsetLocator;
use super::*;

struct WhitespaceCounter;

impl TokenCounter for WhitespaceCounter {
    fn count(&self, text: &str) -> Result<usize, ChunkError> {
        Ok(text.split_whitespace().count())
    }

    fn describe(&self) -> String {
        "whitespace".to_string()
    }
}

fn segmenter() -> SectionSegmenter {
    let markers =
        SectionMarkers::compile(&MarkerPatterns::default()).expect("default markers compile");
    SectionSegmenter::new(markers)
}

fn windows(max_tokens: usize, overlap_tokens: usize) -> WindowChunker {
    WindowChunker::new(WindowConfig {
        max_tokens,
        overlap_tokens,
    })
    .expect("valid window config")
}

fn numbered_words(prefix: &str, count: usize) -> String {
    (1..=count)
        .map(|index| format!("{prefix}{index}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end - start).collect()
}

const SCENARIO_A: &str = "Header line\nJUDGMENT\n\nFACTS OF THE CASE\nSome facts.\n\nGROUNDS FOR DECISION\n1.- first ground text\n2.- second ground text\n\nRULING\nDenies the appeal.";

#[test]
fn segments_full_judgment_into_labeled_sections() {
    let chunks = segmenter()
        .segment(SCENARIO_A, &WhitespaceCounter)
        .expect("segment");

    let labeled = chunks
        .iter()
        .map(|chunk| {
            (
                chunk.chunk_id.as_str(),
                chunk.chunk_type.as_str(),
                chunk.content.as_str(),
            )
        })
        .collect::<Vec<_>>();

    assert_eq!(
        labeled,
        vec![
            ("001_metadata", "metadata", "Header line"),
            ("002_facts", "facts", "FACTS OF THE CASE\nSome facts."),
            ("003_ground_1", "ground_1", "first ground text"),
            ("004_ground_2", "ground_2", "second ground text"),
            ("999_ruling", "ruling", "RULING\nDenies the appeal."),
        ]
    );

    let ruling = chunks.last().expect("ruling chunk");
    assert_eq!(ruling.char_count, "RULING\nDenies the appeal.".chars().count());
    assert_eq!(ruling.token_count, 4);
}

#[test]
fn semantic_chunks_never_share_source_text() {
    let chunks = segmenter()
        .segment(SCENARIO_A, &WhitespaceCounter)
        .expect("segment");

    for (index, left) in chunks.iter().enumerate() {
        for right in &chunks[index + 1..] {
            let disjoint = left.source_range.end <= right.source_range.start
                || right.source_range.end <= left.source_range.start;
            assert!(
                disjoint,
                "{} overlaps {}",
                left.chunk_id, right.chunk_id
            );
        }
    }
}

#[test]
fn text_without_markers_yields_no_sections() {
    let text = "plain prose about a dispute between neighbours\nwith nothing that looks like a heading";
    let chunks = segmenter()
        .segment(text, &WhitespaceCounter)
        .expect("segment");
    assert!(chunks.is_empty());
}

#[test]
fn numbered_grounds_keep_their_own_numbers() {
    let text = "SENTENZA\nFATTI DI CAUSA\nfatti.\nRAGIONI DELLA DECISIONE\n1.- primo motivo\n2.- secondo motivo\n5.- quinto motivo\nP.Q.M.\nrigetta il ricorso.";
    let chunks = segmenter()
        .segment(text, &WhitespaceCounter)
        .expect("segment");

    let grounds = chunks
        .iter()
        .filter(|chunk| chunk.chunk_type.starts_with("ground_"))
        .map(|chunk| {
            (
                chunk.chunk_id.as_str(),
                chunk.chunk_type.as_str(),
                chunk.content.as_str(),
            )
        })
        .collect::<Vec<_>>();

    assert_eq!(
        grounds,
        vec![
            ("003_ground_1", "ground_1", "primo motivo"),
            ("004_ground_2", "ground_2", "secondo motivo"),
            ("007_ground_5", "ground_5", "quinto motivo"),
        ]
    );
    assert_eq!(
        chunks.last().map(|chunk| chunk.content.as_str()),
        Some("P.Q.M.\nrigetta il ricorso.")
    );
}

#[test]
fn oversized_ground_numbers_keep_their_marker() {
    let text = "SENTENZA\nFATTI DI CAUSA\nfatti.\nRAGIONI DELLA DECISIONE\n98.- penultimo motivo\n99999999999999999999999.- ultimo motivo\nP.Q.M.\nrigetta.";
    let chunks = segmenter()
        .segment(text, &WhitespaceCounter)
        .expect("segment");

    let grounds = chunks
        .iter()
        .filter(|chunk| chunk.chunk_type.starts_with("ground_"))
        .map(|chunk| {
            (
                chunk.chunk_id.as_str(),
                chunk.chunk_type.as_str(),
                chunk.content.as_str(),
            )
        })
        .collect::<Vec<_>>();

    assert_eq!(
        grounds,
        vec![
            ("100_ground_98", "ground_98", "penultimo motivo"),
            (
                "100000000000000000000001_ground_99999999999999999999999",
                "ground_99999999999999999999999",
                "ultimo motivo"
            ),
        ]
    );
}

#[test]
fn zero_padded_ground_numbers_keep_their_spelling() {
    let text = "SENTENZA\nFATTI DI CAUSA\nfatti.\nRAGIONI DELLA DECISIONE\n01.- primo motivo\nP.Q.M.\nrigetta.";
    let chunks = segmenter()
        .segment(text, &WhitespaceCounter)
        .expect("segment");

    let ground = chunks
        .iter()
        .find(|chunk| chunk.chunk_type.starts_with("ground_"))
        .expect("ground chunk");
    assert_eq!(ground.chunk_id, "003_ground_01");
    assert_eq!(ground.chunk_type, "ground_01");
}

#[test]
fn markers_match_regardless_of_case() {
    let text = "intestazione\nordinanza\nfatti di causa\nil ricorrente impugna.\nragioni della decisione\nil motivo è fondato.\np.q.m.\naccoglie.";
    let chunks = segmenter()
        .segment(text, &WhitespaceCounter)
        .expect("segment");

    let types = chunks
        .iter()
        .map(|chunk| chunk.chunk_type.as_str())
        .collect::<Vec<_>>();
    assert_eq!(types, vec!["metadata", "facts", "grounds", "ruling"]);
    assert_eq!(chunks[2].chunk_id, "003_grounds");
    assert_eq!(
        chunks[2].content,
        "ragioni della decisione\nil motivo è fondato."
    );
}

#[test]
fn facts_without_closing_marker_take_half_of_the_rest() {
    let chunks = segmenter()
        .segment("FACTS OF THE CASE abcdef", &WhitespaceCounter)
        .expect("segment");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_type, "facts");
    assert_eq!(chunks[0].content, "FACTS OF THE");
}

#[test]
fn inline_ruling_marker_truncates_facts_and_drops_overlapping_ruling() {
    let text = "JUDGMENT\nFACTS OF THE CASE\nthe lower court RULING was wrong\n\nGROUNDS FOR DECISION\n1.- the appeal is unfounded\n\nRULING\nDenied.";
    let chunks = segmenter()
        .segment(text, &WhitespaceCounter)
        .expect("segment");

    let labeled = chunks
        .iter()
        .map(|chunk| (chunk.chunk_type.as_str(), chunk.content.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        labeled,
        vec![
            ("facts", "FACTS OF THE CASE\nthe lower court"),
            ("ground_1", "the appeal is unfounded"),
        ]
    );
}

#[test]
fn invalid_marker_pattern_is_reported_by_name() {
    let patterns = MarkerPatterns {
        facts: "FATTI (".to_string(),
        ..MarkerPatterns::default()
    };

    let err = SectionMarkers::compile(&patterns).expect_err("broken pattern");
    assert!(matches!(err, ChunkError::InvalidPattern { ref name, .. } if name == "facts"));
}

#[test]
fn numbered_ground_pattern_needs_a_capture_group() {
    let patterns = MarkerPatterns {
        numbered_ground: r"\n\d+\.-".to_string(),
        ..MarkerPatterns::default()
    };

    let err = SectionMarkers::compile(&patterns).expect_err("missing group");
    assert!(matches!(err, ChunkError::InvalidConfig(_)));
}

#[test]
fn windows_respect_token_bound_and_overlap() {
    let text = numbered_words("parola", 60);
    let chunks = windows(20, 5)
        .chunk(&text, &WhitespaceCounter)
        .expect("chunk");

    let spans = chunks
        .iter()
        .map(|chunk| {
            let words = chunk.content.split_whitespace().collect::<Vec<_>>();
            (words[0].to_string(), words[words.len() - 1].to_string())
        })
        .collect::<Vec<_>>();
    assert_eq!(
        spans,
        vec![
            ("parola1".to_string(), "parola20".to_string()),
            ("parola16".to_string(), "parola35".to_string()),
            ("parola31".to_string(), "parola50".to_string()),
            ("parola46".to_string(), "parola60".to_string()),
        ]
    );

    for chunk in &chunks {
        assert!(chunk.token_count <= 20);
    }
    assert_eq!(
        chunks.iter().map(|chunk| chunk.chunk_id.as_str()).collect::<Vec<_>>(),
        vec!["fixed_001", "fixed_002", "fixed_003", "fixed_004"]
    );
}

#[test]
fn window_offsets_slice_back_to_content_in_characters() {
    let text = numbered_words("città", 40);
    let chunks = windows(10, 2)
        .chunk(&text, &WhitespaceCounter)
        .expect("chunk");

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.offset_exact);
        assert_eq!(
            char_slice(&text, chunk.start_offset, chunk.end_offset),
            chunk.content
        );
        assert_eq!(chunk.char_count, chunk.content.chars().count());
    }
}

#[test]
fn repeated_text_windows_advance_through_the_document() {
    let text = vec!["ripetuto"; 40].join(" ");
    let chunks = windows(10, 2)
        .chunk(&text, &WhitespaceCounter)
        .expect("chunk");

    assert!(chunks.len() > 4);
    for pair in chunks.windows(2) {
        assert!(
            pair[0].start_offset < pair[1].start_offset,
            "{} starts at {}, {} at {}",
            pair[0].chunk_id,
            pair[0].start_offset,
            pair[1].chunk_id,
            pair[1].start_offset
        );
    }
    for chunk in &chunks {
        assert!(chunk.offset_exact);
        assert_eq!(
            char_slice(&text, chunk.start_offset, chunk.end_offset),
            chunk.content
        );
    }
    assert_eq!(chunks[0].start_offset, 0);
    assert_eq!(
        chunks.last().map(|chunk| chunk.end_offset),
        Some(text.chars().count())
    );
}

#[test]
fn locator_falls_back_to_previous_end_for_missing_text() {
    let mut locator = OffsetLocator::new("alpha beta");

    let alpha = locator.locate("alpha", 0..5);
    assert!(alpha.exact);
    assert_eq!((alpha.start, alpha.end), (0, 5));

    let beta = locator.locate("beta", 0..4);
    assert!(beta.exact);
    assert_eq!((beta.start, beta.end), (6, 10));

    let gamma = locator.locate("gamma", 0..5);
    assert!(!gamma.exact);
    assert_eq!((gamma.start, gamma.end), (10, 15));

    let past_end = locator.locate("delta epsilon", 40..53);
    assert!(!past_end.exact);
    assert_eq!((past_end.start, past_end.end), (15, 28));
}

#[test]
fn locator_counts_characters_not_bytes() {
    let text = "perché così è";
    let mut locator = OffsetLocator::new(text);

    let start = text.find("così").expect("substring");
    let located = locator.locate("così", start..start + "così".len());
    assert!(located.exact);
    assert_eq!((located.start, located.end), (7, 11));
}

#[test]
fn paragraphs_are_kept_whole_when_they_fit() {
    let paragraphs = (1..=5)
        .map(|index| numbered_words(&format!("p{index}w"), 8))
        .collect::<Vec<_>>();
    let text = paragraphs.join("\n\n");

    let chunks = windows(20, 0)
        .chunk(&text, &WhitespaceCounter)
        .expect("chunk");

    let contents = chunks
        .iter()
        .map(|chunk| chunk.content.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        contents,
        vec![
            format!("{}\n\n{}", paragraphs[0], paragraphs[1]),
            format!("{}\n\n{}", paragraphs[2], paragraphs[3]),
            paragraphs[4].clone(),
        ]
    );
}

#[test]
fn unmarked_document_still_gets_windows_covering_everything() {
    let text = numbered_words("alpha", 30);

    let semantic = segmenter()
        .segment(&text, &WhitespaceCounter)
        .expect("segment");
    assert!(semantic.is_empty());

    let fixed = windows(8, 2)
        .chunk(&text, &WhitespaceCounter)
        .expect("chunk");
    assert!(!fixed.is_empty());
    assert_eq!(fixed[0].start_offset, 0);
    assert_eq!(
        fixed.last().map(|chunk| chunk.end_offset),
        Some(text.chars().count())
    );
}

#[test]
fn blank_text_produces_no_windows() {
    let chunks = windows(20, 5)
        .chunk("  \n\n ", &WhitespaceCounter)
        .expect("chunk");
    assert!(chunks.is_empty());
}

#[test]
fn window_config_rejects_overlap_not_below_max() {
    let err = WindowChunker::new(WindowConfig {
        max_tokens: 20,
        overlap_tokens: 20,
    })
    .expect_err("overlap equal to max");
    assert!(matches!(err, ChunkError::InvalidConfig(_)));

    let err = WindowChunker::new(WindowConfig {
        max_tokens: 0,
        overlap_tokens: 0,
    })
    .expect_err("zero max");
    assert!(matches!(err, ChunkError::InvalidConfig(_)));
}

const WORD_LEVEL_TOKENIZER: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": null,
  "pre_tokenizer": { "type": "Whitespace" },
  "post_processor": null,
  "decoder": null,
  "model": {
    "type": "WordLevel",
    "vocab": { "[UNK]": 0, "il": 1, "ricorso": 2, "respinto": 3, ".": 4 },
    "unk_token": "[UNK]"
  }
}"#;

#[test]
fn hf_counter_counts_subword_tokens() {
    let counter =
        HfTokenCounter::from_json(WORD_LEVEL_TOKENIZER, "inline").expect("load tokenizer");

    assert_eq!(counter.count("il ricorso è respinto.").expect("count"), 5);
    assert_eq!(counter.count("").expect("count"), 0);
    assert_eq!(counter.describe(), "hf-tokenizer:inline");
}

#[test]
fn hf_counter_reports_malformed_tokenizer() {
    let err = HfTokenCounter::from_json("{ not json", "broken")
        .err()
        .expect("malformed tokenizer");
    assert!(matches!(err, ChunkError::Tokenizer(_)));
}
