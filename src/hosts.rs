use once_cell::sync::Lazy;
use regex::Regex;

static HOST_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://([^/?#<>\s]+)").expect("valid host regex"));

/// Extracts the hostname of every URL in the text, in order of
/// appearance. Duplicates are kept; callers dedup if they need to.
pub fn extract_hosts(text: &str) -> Vec<String> {
    HOST_REGEX
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}
