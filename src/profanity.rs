//! Word-list profanity filter applied before any user content is persisted.
//!
//! Matching is substring-based on purpose: a listed word embedded in a longer
//! token still triggers. That trades false positives for simplicity.

/// Prohibited words (Turkish and English), all lowercase.
const BAD_WORDS: &[&str] = &[
    // Turkish
    "amk", "aq", "siktir", "orospu", "yarrak", "kahpe", "pezevenk",
    "serefsiz", "şerefsiz", "gerizekalı", "dangalak", "salak", "aptal", "piç",
    // English
    "fuck", "shit", "bitch", "asshole", "bastard", "cunt", "dick", "prick",
    "whore", "slut", "wanker", "motherfucker", "idiot", "stupid", "moron",
];

// Lowercasing is done per character so offsets stay aligned with the
// original text (Turkish dotted/dotless i would otherwise shift bytes).
fn lowered_chars(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

fn find_word(haystack: &[char], word: &[char], from: usize) -> Option<usize> {
    if word.is_empty() || haystack.len() < word.len() {
        return None;
    }
    (from..=haystack.len() - word.len()).find(|&i| haystack[i..i + word.len()] == *word)
}

/// True iff any list entry occurs, case-insensitively, anywhere in `text`.
pub fn contains_profanity(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let lowered = lowered_chars(text);
    BAD_WORDS.iter().any(|word| {
        let w: Vec<char> = word.chars().collect();
        find_word(&lowered, &w, 0).is_some()
    })
}

/// Replace every list-entry occurrence with an asterisk run of equal length.
/// Unmatched text keeps its original casing.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    let mut lowered = lowered_chars(text);

    for word in BAD_WORDS {
        let w: Vec<char> = word.chars().collect();
        let mut at = 0;
        while let Some(i) = find_word(&lowered, &w, at) {
            for j in i..i + w.len() {
                chars[j] = '*';
                lowered[j] = '*';
            }
            at = i + w.len();
        }
    }

    chars.into_iter().collect()
}
