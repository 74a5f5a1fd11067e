use crate::error::EngineError;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Rescale a base similarity by how well query sentiment matches a course's
/// aggregate review sentiment: `base * (1 - alpha * |qs - ds|)`.
///
/// `alpha = 0` disables the effect entirely. Applied identically regardless
/// of which scorer produced the base score.
pub fn rescale(query_sentiment: f32, doc_sentiment: f32, base: f32, alpha: f32) -> f32 {
    let alignment = 1.0 - alpha * (query_sentiment - doc_sentiment).abs();
    base * alignment
}

/// External sentiment classifier applied to query text. Positive scores
/// mean positive sentiment; magnitude is confidence.
pub trait SentimentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<f32, EngineError>;
}

lazy_static! {
    static ref LEXICON: HashMap<&'static str, i32> = {
        let entries: &[(&str, i32)] = &[
            ("amazing", 4), ("awesome", 4), ("excellent", 3), ("fantastic", 4),
            ("great", 3), ("love", 3), ("loved", 3), ("best", 3), ("fun", 2),
            ("enjoyable", 2), ("enjoyed", 2), ("good", 2), ("interesting", 2),
            ("engaging", 2), ("helpful", 2), ("clear", 1), ("rewarding", 2),
            ("easy", 1), ("fascinating", 3), ("recommend", 2), ("favorite", 3),
            ("worthwhile", 2), ("useful", 2), ("practical", 1), ("inspiring", 3),
            ("awful", -4), ("terrible", -4), ("horrible", -4), ("worst", -3),
            ("bad", -2), ("hate", -3), ("hated", -3), ("boring", -2),
            ("confusing", -2), ("hard", -1), ("difficult", -1), ("stressful", -2),
            ("useless", -3), ("disappointing", -2), ("dry", -1), ("tedious", -2),
            ("unfair", -2), ("brutal", -3), ("overwhelming", -2), ("painful", -2),
            ("waste", -3), ("dreadful", -3), ("unclear", -1), ("frustrating", -2),
        ];
        entries.iter().copied().collect()
    };
}

fn is_negator(token: &str) -> bool {
    matches!(
        token,
        "not" | "no" | "never" | "isn't" | "wasn't" | "aren't" | "won't" | "can't" | "cannot"
            | "without" | "don't" | "doesn't" | "didn't"
    )
}

/// Lexicon-based sentiment classifier: signed word scores with a
/// three-token negation window, averaged and squashed into [-1, 1].
/// Ships as the default when no external model is wired in.
#[derive(Debug, Clone, Default)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl SentimentClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> Result<f32, EngineError> {
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|t| !t.is_empty())
            .map(|t| t.to_ascii_lowercase())
            .collect();

        let mut sum = 0i32;
        let mut hits = 0u32;
        for i in 0..tokens.len() {
            let base = *LEXICON.get(tokens[i].as_str()).unwrap_or(&0);
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(&tokens[i - k]));
            sum += if negated { -base } else { base };
            hits += 1;
        }

        if hits == 0 {
            return Ok(0.0);
        }
        let mean = sum as f32 / hits as f32;
        Ok((mean / 4.0).clamp(-1.0, 1.0))
    }
}
