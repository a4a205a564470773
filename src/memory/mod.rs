pub mod consolidate;
pub mod context;
pub mod decay;
pub mod keywords;
pub mod patterns;
pub mod search;
pub mod store;
pub mod types;

/// Truncate to `max_chars` characters, appending "..." if anything was cut.
pub fn truncate_chars(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((end, _)) => format!("{}...", &content[..end]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
    }
}
