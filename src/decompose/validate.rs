//! Construction-time checks on the variable list and the source text.

use super::binding::protected_mask;
use crate::error::InitError;
use crate::grammar::keywords::COMMAND;
use crate::grammar::GrammarRegistry;

/// Validates declared variable names, keeping their order.
pub fn parse_variables(names: &[&str], registry: &GrammarRegistry) -> Result<Vec<char>, InitError> {
    let mut variables = Vec::with_capacity(names.len());
    for &name in names {
        let bad = || InitError::BadVariables { name: name.to_string() };
        let mut chars = name.chars();
        let letter = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_lowercase() => c,
            _ => return Err(bad()),
        };
        if variables.contains(&letter) || registry.is_command(name) {
            return Err(bad());
        }
        variables.push(letter);
    }
    Ok(variables)
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || "+-*/.^_\\(){}[]".contains(c)
}

/// Checks whitespace-free source text before decomposition.
pub(crate) fn check_expression(text: &str, variables: &[char], registry: &GrammarRegistry) -> Result<(), InitError> {
    if text.is_empty() {
        return Err(malformed("the expression is empty"));
    }
    if let Some(symbol) = text.chars().find(|&c| !is_allowed(c)) {
        return Err(InitError::UnknownSymbol { symbol });
    }
    check_groups(text)?;
    check_commands(text, registry)?;

    let custom: Vec<&str> = registry.custom_names().collect();
    let mask = protected_mask(text, custom.iter().copied());
    for (i, c) in text.char_indices() {
        if !c.is_ascii_alphabetic() || mask[i] {
            continue;
        }
        if variables.is_empty() {
            return Err(InitError::NotAConst);
        }
        if !variables.contains(&c) {
            return Err(InitError::UnknownSymbol { symbol: c });
        }
    }
    Ok(())
}

fn malformed(reason: &str) -> InitError {
    InitError::MalformedExpression { reason: reason.to_string() }
}

fn check_groups(text: &str) -> Result<(), InitError> {
    let mut open: Vec<char> = Vec::new();
    let mut previous = None;
    for c in text.chars() {
        let opener = match c {
            '(' | '{' | '[' => {
                open.push(c);
                None
            }
            ')' => Some('('),
            '}' => Some('{'),
            ']' => Some('['),
            _ => None,
        };
        if let Some(expected) = opener {
            if open.pop() != Some(expected) {
                return Err(InitError::MalformedExpression { reason: format!("unbalanced '{}'", c) });
            }
            if previous == Some(expected) {
                return Err(InitError::MalformedExpression { reason: format!("empty group '{}{}'", expected, c) });
            }
        }
        previous = Some(c);
    }
    match open.last() {
        Some(c) => Err(InitError::MalformedExpression { reason: format!("unclosed '{}'", c) }),
        None => Ok(()),
    }
}

fn check_commands(text: &str, registry: &GrammarRegistry) -> Result<(), InitError> {
    let backslashes = text.matches('\\').count();
    let commands: Vec<_> = COMMAND.captures_iter(text).collect();
    if commands.len() != backslashes {
        return Err(malformed("a backslash must start a command name"));
    }
    let unsupported: Vec<String> = commands
        .iter()
        .filter(|c| !registry.is_command(&c[1]))
        .map(|c| c[0].to_string())
        .collect();
    if !unsupported.is_empty() {
        return Err(InitError::UnsupportedOperands { operands: unsupported });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::CustomFunction;
    use rstest::rstest;

    fn registry() -> GrammarRegistry {
        GrammarRegistry::with_custom([CustomFunction::fibonacci()]).unwrap()
    }

    #[rstest]
    #[case(&["a", "b", "c"], Ok(vec!['a', 'b', 'c']))]
    #[case(&["x", "x"], Err("x"))]
    #[case(&["xy"], Err("xy"))]
    #[case(&["X"], Err("X"))]
    #[case(&["1"], Err("1"))]
    fn test_parse_variables(#[case] names: &[&str], #[case] expected: Result<Vec<char>, &str>) {
        let got = parse_variables(names, &registry());
        match expected {
            Ok(vars) => assert_eq!(got.unwrap(), vars),
            Err(name) => assert_eq!(got.unwrap_err(), InitError::BadVariables { name: name.into() }),
        }
    }

    #[rstest]
    #[case("\\frac{-b\\pm\\sqrt{b^{2}-4ac}}{2a}", &['a', 'b', 'c'])]
    #[case("fib(x)-\\log_{2}{x}", &['x'])]
    #[case("\\pm1", &[])]
    #[case("2\\cdot\\pi", &[])]
    fn test_accepts(#[case] text: &str, #[case] vars: &[char]) {
        assert_eq!(check_expression(text, vars, &registry()), Ok(()));
    }

    #[rstest]
    #[case("", &[], "MalformedExpression")]
    #[case("x@1", &['x'], "UnknownSymbol")]
    #[case("(x", &['x'], "MalformedExpression")]
    #[case("x)", &['x'], "MalformedExpression")]
    #[case("{x)", &['x'], "MalformedExpression")]
    #[case("x+()", &['x'], "MalformedExpression")]
    #[case("\\foo{x}+\\bar{x}", &['x'], "UnsupportedOperands")]
    #[case("2\\", &[], "MalformedExpression")]
    #[case("2x", &[], "NotAConst")]
    #[case("x+y", &['x'], "UnknownSymbol")]
    fn test_rejects(#[case] text: &str, #[case] vars: &[char], #[case] kind: &str) {
        let err = check_expression(text, vars, &registry()).unwrap_err();
        assert!(format!("{:?}", err).starts_with(kind), "{:?}", err);
    }

    #[test]
    fn test_unsupported_lists_every_command() {
        let err = check_expression("\\foo{x}+\\bar{x}", &['x'], &registry()).unwrap_err();
        assert_eq!(err, InitError::UnsupportedOperands { operands: vec!["\\foo".into(), "\\bar".into()] });
    }

    #[test]
    fn test_custom_name_cannot_be_variable() {
        let custom = CustomFunction::new("f", Default::default(), |x| Ok(x)).unwrap();
        let registry = GrammarRegistry::with_custom([custom]).unwrap();
        assert!(parse_variables(&["f"], &registry).is_err());
    }
}
