//! The callable form of a compiled expression.

use crate::analysis::topology;
use crate::compute::{assignment_key, numeric, Assignment, AssignmentKey, Engine, Ledger};
use crate::config::EvalConfig;
use crate::decompose::{decompose, parse_variables};
use crate::display;
use crate::error::{Result, UserError};
use crate::grammar::{CustomFunction, GrammarRegistry};
use crate::store::{ContextMap, NodeId, NodeStore};
use log::debug;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;

/// A variable value as passed to `call`: a number or decimal text.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Number(f64),
    Text(String),
}

impl Argument {
    fn to_decimal(&self) -> Option<f64> {
        let value = match self {
            Argument::Number(v) => *v,
            Argument::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Number(v) => write!(f, "{}", v),
            Argument::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Argument {
    fn from(v: f64) -> Self { Argument::Number(v) }
}
impl From<i32> for Argument {
    fn from(v: i32) -> Self { Argument::Number(v.into()) }
}
impl From<u32> for Argument {
    fn from(v: u32) -> Self { Argument::Number(v.into()) }
}
impl From<i64> for Argument {
    fn from(v: i64) -> Self { Argument::Number(v as f64) }
}
impl From<&str> for Argument {
    fn from(s: &str) -> Self { Argument::Text(s.to_string()) }
}
impl From<String> for Argument {
    fn from(s: String) -> Self { Argument::Text(s) }
}

/// An expression decomposed once and evaluated on demand. Results are cached
/// per variable assignment for the lifetime of the value.
#[derive(Debug)]
pub struct CompiledExpression {
    variables: Vec<char>,
    registry: GrammarRegistry,
    context_map: ContextMap,
    store: NodeStore,
    ledger: Ledger,
    config: EvalConfig,
}

impl CompiledExpression {
    /// Compiles `expression` over the declared variables, with the built-in
    /// rules extended by `extra_rules`.
    pub fn compile(
        expression: &str,
        variables: &[&str],
        extra_rules: impl IntoIterator<Item = CustomFunction>,
    ) -> Result<Self> {
        let registry = GrammarRegistry::with_custom(extra_rules)?;
        Self::compile_with(expression, variables, registry, EvalConfig::default())
    }

    pub fn compile_with(
        expression: &str,
        variables: &[&str],
        registry: GrammarRegistry,
        config: EvalConfig,
    ) -> Result<Self> {
        config.validate()?;
        let variables = parse_variables(variables, &registry)?;
        let context_map = decompose(expression, &variables, &registry)?;
        Self::assemble(variables, registry, context_map, config)
    }

    /// Skips decomposition and uses a precompiled map. Sparse indices are
    /// renumbered densely.
    pub fn from_context_map(map: ContextMap, variables: &[&str], registry: GrammarRegistry) -> Result<Self> {
        let variables = parse_variables(variables, &registry)?;
        map.validate()?;
        Self::assemble(variables, registry, map.compact(), EvalConfig::default())
    }

    pub fn from_json(json: &str, variables: &[&str], registry: GrammarRegistry) -> Result<Self> {
        let map = ContextMap::from_json(json)?;
        Self::from_context_map(map, variables, registry)
    }

    fn assemble(variables: Vec<char>, registry: GrammarRegistry, context_map: ContextMap, config: EvalConfig) -> Result<Self> {
        topology::evaluation_order(&context_map)?;
        let store = NodeStore::build(&context_map, &registry, &variables)?;
        debug!("compiled {} contexts over variables {:?}", store.count(), variables);
        let ledger = Ledger::new(store.count());
        Ok(Self { variables, registry, context_map, store, ledger, config })
    }

    pub fn with_config(mut self, config: EvalConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Every real branch of the root for `assignment`, ascending, each rounded
    /// to `round_digits` places. Rounding happens after deduplication, so
    /// entries may coincide once rounded.
    pub fn call<I, K, A>(&self, assignment: I, round_digits: u32) -> Result<Vec<f64>>
    where
        I: IntoIterator<Item = (K, A)>,
        K: AsRef<str>,
        A: Into<Argument>,
    {
        let (values, key) = self.bind(assignment)?;
        let engine = Engine::new(&self.store, &self.registry, &self.ledger, self.config.precision);
        let branches = engine.evaluate(NodeId::ROOT, Assignment { values: &values, key: &key })?;
        Ok(branches.iter().map(|&v| numeric::round(v, round_digits)).collect())
    }

    /// `call` with the configured rounding.
    pub fn call_default<I, K, A>(&self, assignment: I) -> Result<Vec<f64>>
    where
        I: IntoIterator<Item = (K, A)>,
        K: AsRef<str>,
        A: Into<Argument>,
    {
        self.call(assignment, self.config.round_digits)
    }

    /// Evaluates many assignments in parallel against the shared cache.
    pub fn call_batch(&self, assignments: &[HashMap<String, f64>], round_digits: u32) -> Vec<Result<Vec<f64>>> {
        assignments
            .par_iter()
            .map(|assignment| self.call(assignment.iter().map(|(k, v)| (k.as_str(), *v)), round_digits))
            .collect()
    }

    /// Dependency tree of the root with the values computed for `assignment`.
    pub fn trace<I, K, A>(&self, assignment: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, A)>,
        K: AsRef<str>,
        A: Into<Argument>,
    {
        let (values, key) = self.bind(assignment)?;
        let engine = Engine::new(&self.store, &self.registry, &self.ledger, self.config.precision);
        engine.evaluate(NodeId::ROOT, Assignment { values: &values, key: &key })?;
        Ok(display::format_trace(&self.store, &self.registry, &self.ledger, &key, NodeId::ROOT))
    }

    fn bind<I, K, A>(&self, assignment: I) -> std::result::Result<(Vec<f64>, AssignmentKey), UserError>
    where
        I: IntoIterator<Item = (K, A)>,
        K: AsRef<str>,
        A: Into<Argument>,
    {
        let given: HashMap<String, Argument> =
            assignment.into_iter().map(|(k, a)| (k.as_ref().to_string(), a.into())).collect();

        let mut values = Vec::with_capacity(self.variables.len());
        for letter in &self.variables {
            let name = letter.to_string();
            let argument = given.get(&name).ok_or_else(|| UserError::NotEnoughVariables { name: name.clone() })?;
            let value = argument
                .to_decimal()
                .ok_or_else(|| UserError::NotDecimal { name: name.clone(), value: argument.to_string() })?;
            values.push(value);
        }
        let key = assignment_key(&values);
        Ok((values, key))
    }

    pub fn supported_operands(&self) -> Result<String> {
        Ok(display::supported_operands(&self.registry)?)
    }

    pub fn variables(&self) -> &[char] {
        &self.variables
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn context_map(&self) -> &ContextMap {
        &self.context_map
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        self.context_map.to_json()
    }

    /// Number of cached (index, assignment) entries.
    pub fn cache_len(&self) -> usize {
        self.ledger.len()
    }

    /// Indices in an order where dependencies come first.
    pub fn dependency_order(&self) -> Result<Vec<NodeId>> {
        Ok(topology::evaluation_order(&self.context_map)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ComputeError, InitError, TexCalcError};
    use rstest::rstest;

    const QUADRATIC: &str = "\\frac{-b\\pm\\sqrt{b^{2}-4ac}}{2a}";

    fn builtin(expression: &str, variables: &[&str]) -> CompiledExpression {
        CompiledExpression::compile(expression, variables, []).unwrap()
    }

    fn no_args() -> Vec<(&'static str, f64)> {
        Vec::new()
    }

    #[test]
    fn test_quadratic_formula() {
        let f = builtin(QUADRATIC, &["a", "b", "c"]);
        assert_eq!(f.call([("a", 1), ("b", -8), ("c", 15)], 5).unwrap(), vec![3.0, 5.0]);
    }

    #[test]
    fn test_quadratic_formula_with_irrational_roots() {
        let f = builtin(QUADRATIC, &["a", "b", "c"]);
        let got = f.call([("a", -2.34), ("b", 4.87), ("c", 13.0)], 5).unwrap();
        assert_eq!(got, vec![-1.53591, 3.61711]);
    }

    #[rstest]
    #[case("\\log_{2}{8}", 3.0)]
    #[case("x^2", 16.0)]
    #[case("\\frac{1}{x}", 0.25)]
    #[case("fib(x+3)", 13.0)]
    fn test_numeric_literals_evaluate(#[case] expression: &str, #[case] expected: f64) {
        let f = CompiledExpression::compile(expression, &["x"], [CustomFunction::fibonacci()]).unwrap();
        assert_eq!(f.call([("x", 4)], 5).unwrap(), vec![expected]);
    }

    #[rstest]
    #[case("a \\cdot b", vec![6.0])]
    #[case("a \\times b", vec![6.0])]
    #[case("a \\pm b", vec![-1.0, 5.0])]
    #[case("\\pi a^{2}", vec![12.56637])]
    #[case("\\sqrt b + a", vec![3.73205])]
    #[case("\\pm fib(b)", vec![-2.0, 2.0])]
    fn test_space_after_command(#[case] expression: &str, #[case] expected: Vec<f64>) {
        let f = CompiledExpression::compile(expression, &["a", "b"], [CustomFunction::fibonacci()]).unwrap();
        assert_eq!(f.call([("a", 2), ("b", 3)], 5).unwrap(), expected);
    }

    #[test]
    fn test_plus_minus_constant() {
        let f = builtin("\\pm 1", &[]);
        assert_eq!(f.call(no_args(), 5).unwrap(), vec![-1.0, 1.0]);
    }

    #[test]
    fn test_even_root_of_negative() {
        let f = builtin("\\sqrt{x}", &["x"]);
        let err = f.call([("x", -4)], 5).unwrap_err();
        assert_eq!(err, TexCalcError::Compute(ComputeError::SqrtOfNegativeValue { degree: 2.0, value: -4.0 }));
    }

    #[test]
    fn test_fibonacci_rule() {
        let f = CompiledExpression::compile("fib(x)", &["x"], [CustomFunction::fibonacci()]).unwrap();
        assert_eq!(f.call([("x", 7)], 5).unwrap(), vec![13.0]);
        let err = f.call([("x", 0)], 5).unwrap_err();
        assert_eq!(err, TexCalcError::Compute(ComputeError::InvalidFibonacciPosition { position: 0.0 }));
    }

    #[test]
    fn test_custom_and_builtin_rules_mix() {
        let f = CompiledExpression::compile("fib(x)-\\log_{2}{\\sqrt[3]{x-1}+2}", &["x"], [CustomFunction::fibonacci()])
            .unwrap();
        assert_eq!(f.call([("x", 9)], 5).unwrap(), vec![32.0]);
    }

    #[test]
    fn test_product_to_sum_identity() {
        let f = builtin("2\\sin{\\frac{a+b}{2}}\\cos{\\frac{a-b}{2}}", &["a", "b"]);
        let expected = numeric::round(1f64.sin() + 2f64.sin(), 5);
        assert_eq!(f.call([("a", 1), ("b", 2)], 5).unwrap(), vec![expected]);
    }

    #[test]
    fn test_repeated_subexpression_shares_an_index() {
        let f = builtin("\\sin{a}+\\sin{a}", &["a"]);
        let sines = f.context_map().iter().filter(|(_, c)| c.starts_with("\\sin")).count();
        assert_eq!(sines, 1);
        let expected = numeric::round(2.0 * 0.5f64.sin(), 5);
        assert_eq!(f.call([("a", 0.5)], 5).unwrap(), vec![expected]);
    }

    #[rstest]
    #[case(QUADRATIC, &["a", "b", "c"])]
    #[case("\\sin{x}^{2}+\\cos{x}^{2}", &["x"])]
    #[case("\\sqrt[3]{\\frac{(x+1)(x-1)}{\\pi}}", &["x"])]
    #[case("\\ln{\\lg{x^{2}}}\\cdot\\arctan{x}", &["x"])]
    fn test_no_index_depends_on_itself(#[case] expression: &str, #[case] variables: &[&str]) {
        let f = builtin(expression, variables);
        for i in 0..f.store.count() {
            let id = NodeId::new(i);
            assert!(!topology::closure(&f.store, id).contains(&id), "{} in {:?}", id, f.context_map());
        }
        assert_eq!(f.dependency_order().unwrap().len(), f.store.count());
    }

    #[test]
    fn test_cached_and_cold_calls_agree() {
        let f = builtin(QUADRATIC, &["a", "b", "c"]);
        let cold = f.call([("a", 2), ("b", 3), ("c", -5)], 5).unwrap();
        let cached_entries = f.cache_len();
        let warm = f.call([("a", 2), ("b", 3), ("c", -5)], 5).unwrap();
        assert_eq!(cold, warm);
        assert_eq!(f.cache_len(), cached_entries);
        assert_eq!(cold, vec![-2.5, 1.0]);
    }

    #[test]
    fn test_pythagorean_identity_collapses_to_one_value() {
        let f = builtin("\\sin{x}^{2}+\\cos{x}^{2}", &["x"]);
        assert_eq!(f.call([("x", 0.7)], 5).unwrap(), vec![1.0]);
    }

    #[rstest]
    #[case(vec![("a", Argument::from(1))], UserError::NotEnoughVariables { name: "b".into() })]
    #[case(
        vec![("a", Argument::from(1)), ("b", Argument::from("abc"))],
        UserError::NotDecimal { name: "b".into(), value: "abc".into() }
    )]
    #[case(
        vec![("a", Argument::from(f64::NAN)), ("b", Argument::from(1))],
        UserError::NotDecimal { name: "a".into(), value: "NaN".into() }
    )]
    fn test_call_argument_errors(#[case] args: Vec<(&str, Argument)>, #[case] expected: UserError) {
        let f = builtin("a+b", &["a", "b"]);
        assert_eq!(f.call(args, 5).unwrap_err(), TexCalcError::User(expected));
    }

    #[test]
    fn test_decimal_text_and_extra_arguments_are_accepted() {
        let f = builtin("a+b", &["a", "b"]);
        let args = vec![("a", Argument::from(" 1.25 ")), ("b", Argument::from(2)), ("z", Argument::from("ignored"))];
        assert_eq!(f.call(args, 5).unwrap(), vec![3.25]);
    }

    #[test]
    fn test_rounding_applies_after_evaluation() {
        let f = builtin("\\frac{1}{3}", &[]);
        assert_eq!(f.call(no_args(), 2).unwrap(), vec![0.33]);
        assert_eq!(f.call_default(no_args()).unwrap(), vec![0.33333]);
    }

    #[test]
    fn test_rounding_may_repeat_values() {
        let f = builtin("1\\pm0.001", &[]);
        assert_eq!(f.call(no_args(), 5).unwrap(), vec![0.999, 1.001]);
        assert_eq!(f.call(no_args(), 1).unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_euler_variable_uses_its_approximation() {
        let f = builtin("e^{x}", &["e", "x"]);
        assert_eq!(f.call([("e", 100), ("x", 1)], 5).unwrap(), vec![2.71828]);
    }

    #[rstest]
    #[case("2x", &[], TexCalcError::Init(InitError::NotAConst))]
    #[case("x", &["xy"], TexCalcError::Init(InitError::BadVariables { name: "xy".into() }))]
    #[case("\\foo{x}", &["x"], TexCalcError::Init(InitError::UnsupportedOperands { operands: vec!["\\foo".into()] }))]
    fn test_construction_errors(#[case] expression: &str, #[case] variables: &[&str], #[case] expected: TexCalcError) {
        assert_eq!(CompiledExpression::compile(expression, variables, []).unwrap_err(), expected);
    }

    #[test]
    fn test_precompiled_map_round_trip() {
        let f = builtin(QUADRATIC, &["a", "b", "c"]);
        let json = f.to_json().unwrap();
        let g = CompiledExpression::from_json(&json, &["a", "b", "c"], GrammarRegistry::builtin()).unwrap();
        assert_eq!(g.context_map(), f.context_map());
        assert_eq!(g.call([("a", 1), ("b", -8), ("c", 15)], 5).unwrap(), vec![3.0, 5.0]);
    }

    #[test]
    fn test_sparse_precompiled_map() {
        let json = r#"{"0": "\\frac@/7/@@/3/@", "3": "2", "7": "@/9/@+1", "9": "x"}"#;
        let f = CompiledExpression::from_json(json, &["x"], GrammarRegistry::builtin()).unwrap();
        assert_eq!(f.context_map().root(), Some("\\frac@/2/@@/1/@"));
        assert_eq!(f.call([("x", 5)], 5).unwrap(), vec![3.0]);
    }

    #[test]
    fn test_invalid_precompiled_map() {
        let err = CompiledExpression::from_json("[]", &[], GrammarRegistry::builtin()).unwrap_err();
        assert!(matches!(err, TexCalcError::InvalidContextMap(_)));
    }

    #[test]
    fn test_batch_matches_single_calls() {
        let f = builtin(QUADRATIC, &["a", "b", "c"]);
        let batch: Vec<HashMap<String, f64>> = (1..=4)
            .map(|c| HashMap::from([("a".to_string(), 1.0), ("b".to_string(), -8.0), ("c".to_string(), c as f64)]))
            .collect();
        let results = f.call_batch(&batch, 5);
        for (assignment, result) in batch.iter().zip(results) {
            let single = f.call(assignment.iter().map(|(k, v)| (k.as_str(), *v)), 5).unwrap();
            assert_eq!(result.unwrap(), single);
        }
    }

    #[test]
    fn test_trace_and_docs() {
        let f = CompiledExpression::compile("fib(x)+1", &["x"], [CustomFunction::fibonacci()]).unwrap();
        let trace = f.trace([("x", 3)]).unwrap();
        assert!(trace.lines().nth(2).unwrap().ends_with("= [3]"), "{trace}");
        assert!(trace.contains("fib '"), "{trace}");

        let docs = f.supported_operands().unwrap();
        assert!(docs.starts_with("Fibonacci"));
        assert!(docs.ends_with("\\Omega"));
    }

    #[test]
    fn test_config_controls_default_rounding() {
        let config = EvalConfig::from_json(r#"{"round_digits": 1}"#).unwrap();
        let f = CompiledExpression::compile_with("\\pi", &[], GrammarRegistry::builtin(), config).unwrap();
        assert_eq!(f.call_default(no_args()).unwrap(), vec![3.1]);
    }
}
