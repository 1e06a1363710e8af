//! Token estimation for vendors that omit usage counts

const CHARS_PER_TOKEN: usize = 4;

/// Rough token count: one per four characters, at least one
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    let tokens = chars.div_ceil(CHARS_PER_TOKEN).max(1);
    u32::try_from(tokens).unwrap_or(u32::MAX)
}
