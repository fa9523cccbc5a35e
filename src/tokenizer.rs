//! Splitting of a command segment into its argument vector.
//!
//! The language has no quoting or escaping: a `"` or `\` is an ordinary
//! character and every run of whitespace separates two arguments.

/// Splits `segment` on runs of whitespace, preserving order and dropping
/// empty tokens.
///
/// An empty or whitespace-only input yields an empty vector, which callers
/// treat as "nothing to execute".
///
/// # Arguments
/// * `segment` - The text of one command segment.
///
/// # Returns
/// The argument vector; the first element (if any) is the program name.
pub fn tokenize(segment: &str) -> Vec<String> {
    segment.split_whitespace().map(str::to_owned).collect()
}
