use super::custom::CustomFunction;
use super::keywords::is_reserved;
use super::{builtins, Rule};
use crate::error::{CustomFunctionError, FieldError};
use crate::store::{RuleId, RuleMatch};

/// Ordered rule set. Custom functions come first, in registration order,
/// followed by the built-ins. Match attempts always follow this order.
#[derive(Debug, Clone)]
pub struct GrammarRegistry {
    rules: Vec<Rule>,
    custom_count: usize,
}

impl Default for GrammarRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GrammarRegistry {
    pub fn builtin() -> Self {
        Self { rules: builtins::all(), custom_count: 0 }
    }

    pub fn with_custom(extras: impl IntoIterator<Item = CustomFunction>) -> Result<Self, CustomFunctionError> {
        let mut registry = Self::builtin();
        for function in extras {
            registry.register(function)?;
        }
        Ok(registry)
    }

    /// Adds a custom function after the previously registered ones.
    /// Registering shifts built-in `RuleId`s, so finish before compiling.
    pub fn register(&mut self, function: CustomFunction) -> Result<RuleId, CustomFunctionError> {
        if self.is_command(function.name()) {
            return Err(CustomFunctionError::InvalidName {
                name: function.name().to_string(),
                reason: "a function with this name is already registered".to_string(),
            });
        }
        let id = RuleId::new(self.custom_count);
        self.rules.insert(self.custom_count, function.into_rule());
        self.custom_count += 1;
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Rule)> + '_ {
        self.rules.iter().enumerate().map(|(i, r)| (RuleId::new(i), r))
    }

    pub fn custom_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules[..self.custom_count].iter().map(Rule::name)
    }

    pub fn is_custom_name(&self, word: &str) -> bool {
        self.custom_names().any(|n| n == word)
    }

    /// Reserved word or registered custom function name.
    pub fn is_command(&self, word: &str) -> bool {
        is_reserved(word) || self.is_custom_name(word)
    }

    /// The first rule, in registry order, whose leftmost match spans all of `context`.
    pub fn resolve(&self, context: &str) -> Result<Option<RuleMatch>, FieldError> {
        for (id, rule) in self.iter() {
            if let Some(m) = rule.find_full(id, context)? {
                return Ok(Some(m));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::RuleDoc;

    #[test]
    fn test_custom_rules_precede_builtins() {
        let registry = GrammarRegistry::with_custom([CustomFunction::fibonacci()]).unwrap();
        let names: Vec<_> = registry.iter().map(|(_, r)| r.name().to_string()).collect();
        assert_eq!(
            names,
            ["fib", "Sqrt", "Fraction", "Logarithm", "Trigonometry", "InverseTrigonometry", "Exponentiation", "Constant"]
        );
        assert!(registry.is_command("fib"));
        assert!(registry.is_command("arctan"));
        assert!(!registry.is_command("foo"));
    }

    #[test]
    fn test_duplicate_custom_name_rejected() {
        let twice = [CustomFunction::fibonacci(), CustomFunction::fibonacci()];
        assert!(matches!(GrammarRegistry::with_custom(twice), Err(CustomFunctionError::InvalidName { .. })));
    }

    #[test]
    fn test_registration_order_is_kept() {
        let double = CustomFunction::new("dbl", RuleDoc::new("Double", "dbl(x)", "2x"), |x| Ok(2.0 * x)).unwrap();
        let mut registry = GrammarRegistry::builtin();
        assert_eq!(registry.register(CustomFunction::fibonacci()).unwrap(), RuleId(0));
        assert_eq!(registry.register(double).unwrap(), RuleId(1));
        assert_eq!(registry.custom_names().collect::<Vec<_>>(), ["fib", "dbl"]);
    }

    #[test]
    fn test_resolve_requires_full_span() {
        let registry = GrammarRegistry::builtin();
        let m = registry.resolve("\\frac@/1/@@/2/@").unwrap().unwrap();
        assert_eq!(registry.get(m.rule).unwrap().name(), "Fraction");
        assert!(registry.resolve("@/1/@+@/2/@").unwrap().is_none());
        assert!(registry.resolve("\\sin@/1/@+2").unwrap().is_none());
    }
}
