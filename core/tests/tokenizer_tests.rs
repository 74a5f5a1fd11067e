use coursefinder_core::tokenizer::normalize;

#[test]
fn it_lowercases_and_filters_stopwords() {
    let terms = normalize("The Quick Introduction to the Course and its Topics");
    assert!(!terms.contains(&"the".to_string()));
    assert!(!terms.contains(&"and".to_string()));
    assert!(terms.contains(&"quick".to_string()));
    assert!(terms.contains(&"introduction".to_string()));
}

#[test]
fn it_splits_and_drops_clitics() {
    let terms = normalize("The professor's lectures weren't boring");
    assert!(terms.contains(&"professor".to_string()));
    assert!(terms.contains(&"lectures".to_string()));
    assert!(terms.contains(&"boring".to_string()));
    assert!(!terms.iter().any(|t| t.ends_with("n't") || t.ends_with("'s")));
}

#[test]
fn it_keeps_numbers_and_drops_punctuation() {
    let terms = normalize("CS 2110: data structures (spring), 4 credits!");
    assert!(terms.contains(&"2110".to_string()));
    assert!(terms.contains(&"credits".to_string()));
    assert!(terms.iter().all(|t| t.chars().any(char::is_alphanumeric)));
}
