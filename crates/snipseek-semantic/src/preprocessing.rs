/// Maximum words kept in a query when the caller gives no budget
/// (1 token ~= 1 word for English, close enough for a truncation guard)
const DEFAULT_MAX_WORDS: usize = 512;

/// Light query normalization before embedding
///
/// Queries describe code, so case and punctuation carry meaning and are
/// kept as-is. Whitespace runs collapse to single spaces and anything past
/// the encoder's input budget is cut off.
pub fn normalize_query(query: &str, max_words: usize) -> String {
    let max_words = if max_words == 0 { DEFAULT_MAX_WORDS } else { max_words };
    let words: Vec<&str> = query.split_whitespace().take(max_words).collect();
    words.join(" ")
}
