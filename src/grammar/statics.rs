//! Literal tokens that stand for one or more fixed values.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StaticValue {
    /// Expands to an arithmetic sign (`\pm` -> `+` or `-`).
    Operator(char),
    Number(f64),
}

pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;
pub const OMEGA: f64 = 0.007_874_996_9;
/// What a variable declared as `e` is bound to.
pub const EULER_APPROX: &str = "2.7182818284";

pub const STATIC_OPERANDS: &[(&str, &[StaticValue])] = &[
    ("\\pm", &[StaticValue::Operator('+'), StaticValue::Operator('-')]),
    ("\\mp", &[StaticValue::Operator('-'), StaticValue::Operator('+')]),
    ("\\Phi", &[StaticValue::Number(GOLDEN_RATIO)]),
    ("\\pi", &[StaticValue::Number(std::f64::consts::PI)]),
    ("\\Omega", &[StaticValue::Number(OMEGA)]),
];

pub fn lookup(symbol: &str) -> Option<&'static [StaticValue]> {
    STATIC_OPERANDS.iter().find(|(s, _)| *s == symbol).map(|(_, v)| *v)
}

/// The value of a single-valued numeric static operand.
pub fn constant(symbol: &str) -> Option<f64> {
    match lookup(symbol)? {
        [StaticValue::Number(v)] => Some(*v),
        _ => None,
    }
}

pub fn symbols() -> impl Iterator<Item = &'static str> {
    STATIC_OPERANDS.iter().map(|(s, _)| *s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pm_has_two_alternatives() {
        assert_eq!(lookup("\\pm").map(|v| v.len()), Some(2));
        assert_eq!(constant("\\pm"), None);
    }

    #[test]
    fn test_pi_is_single_constant() {
        assert_eq!(constant("\\pi"), Some(std::f64::consts::PI));
    }
}
