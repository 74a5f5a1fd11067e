use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Word-ish runs (letters/digits with embedded apostrophes) or a single
    // punctuation character, so "doesn't," splits into "doesn't" and ",".
    static ref RE: Regex =
        Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*|[^\s\p{L}\p{N}]").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves",
            // clitics produced by treebank-style splitting
            "n't","'s","'re","'ve","'ll","'d","'m",
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

fn has_alphanumeric(token: &str) -> bool {
    token.chars().any(|c| c.is_alphanumeric())
}

/// Split a word token into its treebank-style pieces: "doesn't" becomes
/// ["does", "n't"], "course's" becomes ["course", "'s"].
fn split_clitics(token: &str) -> Vec<&str> {
    const SUFFIXES: &[&str] = &["n't", "'s", "'re", "'ve", "'ll", "'d", "'m"];
    for suffix in SUFFIXES {
        if let Some(base) = token.strip_suffix(suffix) {
            if !base.is_empty() {
                return vec![base, suffix];
            }
        }
    }
    vec![token]
}

/// Normalize text into search terms: NFKC normalization, lowercasing,
/// treebank-style word splitting, then stop-word and punctuation removal.
///
/// Deterministic and pure; empty or whitespace-only input yields an empty
/// vector.
pub fn normalize(text: &str) -> Vec<String> {
    let folded = text.nfkc().collect::<String>().to_lowercase();
    let mut terms = Vec::new();
    for mat in RE.find_iter(&folded) {
        for piece in split_clitics(mat.as_str()) {
            if !has_alphanumeric(piece) || is_stopword(piece) {
                continue;
            }
            terms.push(piece.to_string());
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_splits() {
        let t = normalize("Intro to Programming in Python");
        assert_eq!(t, vec!["intro", "programming", "python"]);
    }

    #[test]
    fn splits_contractions() {
        let t = normalize("This course doesn't require calculus");
        assert!(t.contains(&"require".to_string()));
        assert!(!t.iter().any(|w| w.contains("n't")));
    }

    #[test]
    fn drops_punctuation_tokens() {
        let t = normalize("data structures, algorithms; recursion!");
        assert_eq!(t, vec!["data", "structures", "algorithms", "recursion"]);
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(normalize("").is_empty());
        assert!(normalize("   \t\n").is_empty());
    }

    #[test]
    fn folds_unicode() {
        let t = normalize("café seminar");
        assert!(t.contains(&"café".to_string()) || t.contains(&"cafe".to_string()));
        assert!(t.contains(&"seminar".to_string()));
    }
}
