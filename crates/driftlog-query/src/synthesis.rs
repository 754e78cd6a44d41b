//! Grounded answer synthesis: prompt, generate, then validate citations.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::debug;

use driftlog_core::{
    AnswerResult, Citation, GenerationRequest, Generator, RankedResult, Result,
};

use crate::prompts::{build_user_prompt, SYSTEM_PROMPT};

/// Default maximum excerpt length in characters.
pub const DEFAULT_EXCERPT_CHARS: usize = 150;

const ELLIPSIS: &str = "...";

/// Builds the grounding prompt, calls the generator, and turns the reply
/// into an [`AnswerResult`].
pub struct AnswerSynthesizer<G: ?Sized> {
    generator: Arc<G>,
    max_tokens: u32,
    excerpt_chars: usize,
}

impl<G> AnswerSynthesizer<G>
where
    G: Generator + ?Sized,
{
    pub fn new(generator: Arc<G>, max_tokens: u32) -> Self {
        Self {
            generator,
            max_tokens,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }

    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    /// Answer `question` from `chunks`, numbered 1..N in the order given.
    ///
    /// `chunks_retrieved` is passed through to the result. Generator errors
    /// are returned as-is.
    pub async fn synthesize(
        &self,
        question: &str,
        chunks: &[RankedResult],
        chunks_retrieved: usize,
    ) -> Result<AnswerResult> {
        let request = GenerationRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: build_user_prompt(question, chunks),
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let answer = self.generator.generate(&request).await?;

        let cited = parse_citations(&answer, chunks.len());
        debug!("Answer cites {:?} of {} chunks", cited, chunks.len());

        let citations = cited
            .iter()
            .map(|&index| {
                let chunk = &chunks[index - 1].chunk;
                Citation {
                    index,
                    chunk_id: chunk.id,
                    source: chunk.metadata.source_label().to_string(),
                    location: chunk.metadata.location_label().to_string(),
                    excerpt: excerpt(&chunk.content, self.excerpt_chars),
                }
            })
            .collect();

        let confidence = confidence(cited.iter().map(|&index| &chunks[index - 1]));

        Ok(AnswerResult {
            answer,
            confidence,
            citations,
            chunks_retrieved,
            chunks_after_rerank: chunks.len(),
        })
    }
}

/// Distinct `[n]` markers in `text` with `1 <= n <= chunk_count`, ascending.
pub fn parse_citations(text: &str, chunk_count: usize) -> Vec<usize> {
    static CITATION: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(pattern) = CITATION.get_or_init(|| Regex::new(r"\[(\d+)\]").ok()) else {
        return Vec::new();
    };

    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<usize>().ok())
        .filter(|&n| (1..=chunk_count).contains(&n))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// First `max_chars` characters of `content`, with an ellipsis appended
/// only when something was cut.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &content[..cut], ELLIPSIS),
        None => content.to_string(),
    }
}

/// Mean rerank score of the cited chunks that carry one, to 4 places.
pub fn confidence<'a>(cited: impl IntoIterator<Item = &'a RankedResult>) -> f64 {
    let scores: Vec<f64> = cited.into_iter().filter_map(|r| r.rerank_score).collect();
    if scores.is_empty() {
        return 0.0;
    }
    round4(scores.iter().sum::<f64>() / scores.len() as f64)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
