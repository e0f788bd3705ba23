/**
 * Checking guesses against vocabulary items.
 */
use unicode_normalization::UnicodeNormalization;

use super::vocab::VocabularyItem;


/// Characters removed from guesses and answers before they are compared.
const PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '\'', '"', '(', ')', '[', ']', '{', '}', '-', '~', '…',
    '·', '“', '”', '‘', '’', '「', '」',
];


/// Bring `s` into the form in which guesses are compared: NFC-composed so that Hangul
/// typed as separate jamo matches precomposed syllables, lowercased, punctuation
/// removed, and runs of whitespace collapsed to a single space.
///
/// Composition runs first because it can turn a character into punctuation (U+037E
/// becomes `;`). It runs again at the end because removing punctuation can leave a
/// combining mark next to a letter it composes with.
pub fn normalize(s: &str) -> String {
    let stripped: String = s
        .nfc()
        .flat_map(char::to_lowercase)
        .filter(|c| !PUNCTUATION.contains(c))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.nfc().collect::<String>()
}


/// Return `true` if `guess` is the Korean side of `item`. Only the one canonical form
/// is accepted.
pub fn check_korean(item: &VocabularyItem, guess: &str) -> bool {
    let guess = normalize(guess);
    !guess.is_empty() && guess == normalize(&item.korean)
}


/// Return `true` if `guess` matches any of the accepted English spellings of `item`.
pub fn check_english(item: &VocabularyItem, guess: &str) -> bool {
    let guess = normalize(guess);
    if guess.is_empty() {
        return false;
    }
    item.spellings().iter().any(|variant| normalize(variant) == guess)
}
