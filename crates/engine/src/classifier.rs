//! Intent classifier — keyword match of an idea against catalog scenarios.
//!
//! Cheap and deterministic: no model call. Used to pick sensible assembly
//! defaults before the dialogue starts.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::catalog::{FALLBACK_SCENARIO, FALLBACK_TEMPLATE, PromptCatalog};

/// Below this confidence the idea is treated as general.
pub const MIN_CONFIDENCE: f32 = 0.3;

/// Confidence never exceeds this.
pub const MAX_CONFIDENCE: f32 = 0.95;

/// The inferred assembly options for an idea.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub scenario: String,
    pub persona: Option<String>,
    pub template: String,
    pub confidence: f32,
    pub matched_keywords: Vec<String>,
}

pub struct IntentClassifier {
    catalog: Arc<PromptCatalog>,
}

impl IntentClassifier {
    pub fn new(catalog: Arc<PromptCatalog>) -> Self {
        Self { catalog }
    }

    /// Classify an idea.
    ///
    /// The best scenario has the most keyword hits (ties go to the smaller
    /// id). Confidence is `min(0.95, 2 · hits / keywords)`; anything under
    /// 0.3 falls back to `general` with zero confidence.
    pub fn classify(&self, idea: &str) -> Classification {
        let text = idea.to_lowercase();

        // BTreeMap iteration is in ascending id order, so a strict `>` keeps
        // the smallest id on ties.
        let mut best: Option<(&str, Vec<String>, usize)> = None;
        for (id, scenario) in &self.catalog.scenarios {
            if scenario.keywords.is_empty() {
                continue;
            }
            let hits: Vec<String> = scenario
                .keywords
                .iter()
                .filter(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
                .cloned()
                .collect();
            if hits.is_empty() {
                continue;
            }
            if best.as_ref().is_none_or(|(_, b, _)| hits.len() > b.len()) {
                best = Some((id, hits, scenario.keywords.len()));
            }
        }

        let Some((id, hits, total)) = best else {
            return self.fallback();
        };

        let confidence = (2.0 * hits.len() as f32 / total.max(1) as f32).min(MAX_CONFIDENCE);
        if confidence < MIN_CONFIDENCE {
            debug!(scenario = id, confidence, "Low-confidence match, using general");
            return self.fallback();
        }

        let (_, entry) = self.catalog.scenario(id);
        debug!(scenario = id, confidence, hits = hits.len(), "Idea classified");
        Classification {
            scenario: id.to_string(),
            persona: entry.recommended_persona.clone(),
            template: entry.recommended_template.clone(),
            confidence: (confidence * 100.0).round() / 100.0,
            matched_keywords: hits,
        }
    }

    fn fallback(&self) -> Classification {
        let (id, entry) = self.catalog.scenario(FALLBACK_SCENARIO);
        let template = if entry.recommended_template.is_empty() {
            FALLBACK_TEMPLATE.to_string()
        } else {
            entry.recommended_template.clone()
        };
        Classification {
            scenario: id.to_string(),
            persona: entry.recommended_persona.clone(),
            template,
            confidence: 0.0,
            matched_keywords: Vec::new(),
        }
    }
}
