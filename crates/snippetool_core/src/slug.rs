const STOP_WORDS: &[&str] = &[
    "measure", "check", "analyze", "analyse", "detect", "find", "get", "fetch", "track",
    "monitor", "for", "all", "the", "a", "an", "to", "of", "and", "or", "with", "in", "by",
    "via", "its",
];

/// Turn a heading into a hyphen-joined, capitalized fragment, dropping stop words, single
/// characters and any word already present in the document's base name.
///
/// `derive_slug(Some("Measure TTFB sub-parts"), "TTFB")` is `"Sub-Parts"`. The result is
/// empty when there is no heading or nothing survives filtering.
pub fn derive_slug(heading: Option<&str>, base_name: &str) -> String {
    let Some(heading) = heading else {
        return String::new();
    };

    let base_words = base_name_words(base_name);
    let cleaned: String = heading
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-' || ch.is_whitespace())
        .collect();

    cleaned
        .split(|ch: char| ch.is_whitespace() || ch == '-')
        .filter(|word| word.len() > 1)
        .filter(|word| {
            let lowered = word.to_ascii_lowercase();
            !STOP_WORDS.contains(&lowered.as_str()) && !base_words.contains(&lowered)
        })
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("-")
}

fn base_name_words(base_name: &str) -> Vec<String> {
    base_name
        .to_ascii_lowercase()
        .replace(['-', '_'], " ")
        .split(' ')
        .map(str::to_string)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
