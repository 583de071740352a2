use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ChunkError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerPatterns {
    pub case_type: String,
    pub facts: String,
    pub grounds: String,
    pub law: String,
    pub ruling: String,
    pub numbered_ground: String,
}

impl Default for MarkerPatterns {
    fn default() -> Self {
        Self {
            case_type: r"\b(?:ORDINANZA|SENTENZA|ORDER|JUDGMENT)\b".to_string(),
            facts: r"FATTI DI CAUSA|FACTS OF THE CASE".to_string(),
            grounds: r"RAGIONI DELLA DECISIONE|MOTIVI DELLA DECISIONE|GROUNDS FOR DECISION|REASONS FOR THE DECISION"
                .to_string(),
            law: r"\b(?:DIRITTO|LAW)\b".to_string(),
            ruling: r"P\.Q\.M\.|\bRULING\b".to_string(),
            numbered_ground: r"\n(\d+)\.-".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SectionMarkers {
    pub case_type: Regex,
    pub facts: Regex,
    pub grounds: Regex,
    pub law: Regex,
    pub ruling: Regex,
    pub numbered_ground: Regex,
}

impl SectionMarkers {
    pub fn compile(patterns: &MarkerPatterns) -> Result<Self, ChunkError> {
        let numbered_ground = compile("numbered_ground", &patterns.numbered_ground)?;
        if numbered_ground.captures_len() < 2 {
            return Err(ChunkError::InvalidConfig(
                "numbered_ground pattern must capture the ground number".to_string(),
            ));
        }

        Ok(Self {
            case_type: compile("case_type", &patterns.case_type)?,
            facts: compile("facts", &patterns.facts)?,
            grounds: compile("grounds", &patterns.grounds)?,
            law: compile("law", &patterns.law)?,
            ruling: compile("ruling", &patterns.ruling)?,
            numbered_ground,
        })
    }
}

fn compile(name: &str, pattern: &str) -> Result<Regex, ChunkError> {
    Regex::new(&format!("(?i){pattern}")).map_err(|err| ChunkError::InvalidPattern {
        name: name.to_string(),
        message: err.to_string(),
    })
}
