//! Reserved command words. A `\word` in source text must be one of these or
//! the name of a registered custom function.

use once_cell::sync::Lazy;
use regex::Regex;

pub const RESERVED_WORDS: &[&str] = &[
    "sqrt", "frac", "log", "lg", "ln",
    "sin", "cos", "tan", "cot", "sec", "csc",
    "sinh", "cosh", "tanh", "coth", "sech", "csch",
    "arcsin", "arccos", "arctan", "arccot", "arcsec", "arccsc",
    "pm", "mp", "pi", "Phi", "Omega",
    "cdot", "times",
];

/// A backslash command: `\` followed by ASCII letters.
pub(crate) static COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\([A-Za-z]+)").expect("command pattern"));

pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

/// True when byte `pos` of `text` sits inside (or right after the backslash of)
/// a `\command` word.
pub(crate) fn inside_command(text: &str, pos: usize) -> bool {
    let bytes = text.as_bytes();
    let mut i = pos;
    while i > 0 && bytes[i - 1].is_ascii_alphabetic() {
        i -= 1;
    }
    i > 0 && bytes[i - 1] == b'\\'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_command() {
        let text = "2a\\arctan@/1/@";
        assert!(!inside_command(text, 1));
        assert!(inside_command(text, 4));
        assert!(inside_command(text, 9));
        assert!(!inside_command(text, 10));
    }
}
