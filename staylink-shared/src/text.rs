//! Text normalization shared by cache keys and cross-supplier deduplication.

/// Lowercases `input` and keeps only alphanumeric words, joined by a single space.
///
/// `"  Hôtel  Le-Marais, Paris "` becomes `"hôtel le marais paris"`.
pub fn normalize_key(input: &str) -> String {
    input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive substring match on normalized text.
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    let needle = normalize_key(needle);
    if needle.is_empty() {
        return true;
    }
    normalize_key(haystack).contains(&needle)
}

/// URL-friendly slug derived from a display name.
pub fn slugify(input: &str) -> String {
    normalize_key(input).replace(' ', "-")
}
