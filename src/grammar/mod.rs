//! Grammar rules: patterns over index-token syntax, the operand slots they
//! capture, and the scalar function that computes a value from those operands.
//!
//! A rule never sees multi-valued operands. The evaluator expands every
//! index-referenced slot into its result tuple and calls the rule once per
//! combination (Cartesian product), holding literal slots fixed.

pub mod builtins;
pub mod custom;
pub mod keywords;
pub mod registry;
pub mod statics;

pub use custom::CustomFunction;
pub use registry::GrammarRegistry;

use crate::error::{ComputeError, FieldError};
use crate::store::{tokens, NodeId, Operand, RuleId, RuleMatch};
use regex::{Captures, Regex};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

pub type ComputeFn = Arc<dyn Fn(&ScalarArgs<'_>) -> Result<f64, ComputeError> + Send + Sync>;

/// Emulates a lookbehind: receives the context and the match start, returns
/// whether the match is acceptable there.
pub type Guard = fn(&str, usize) -> bool;

/// Which operand categories a slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    LiteralOnly,
    LiteralOrContext,
    LiteralOrIndex,
    /// Literal, index reference, or (transiently) raw context.
    Any,
}

impl SlotKind {
    fn accepts_index(self) -> bool {
        matches!(self, SlotKind::LiteralOrIndex | SlotKind::Any)
    }

    fn accepts_context(self) -> bool {
        matches!(self, SlotKind::LiteralOrContext | SlotKind::Any)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Also the name of the capture group in the rule's pattern.
    pub name: &'static str,
    pub kind: SlotKind,
    /// Used when the optional group did not participate in the match.
    pub default: Option<f64>,
    /// A required slot without a default must be captured by every match.
    pub required: bool,
}

impl Slot {
    pub const fn new(name: &'static str, kind: SlotKind) -> Self {
        Self { name, kind, default: None, required: true }
    }

    pub const fn with_default(mut self, value: f64) -> Self {
        self.default = Some(value);
        self
    }

    /// The slot may be absent; the rule sees `None` for it.
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Self-description used by `supported_operands`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleDoc {
    pub verbose_name: String,
    pub example: String,
    pub description: String,
}

impl RuleDoc {
    pub fn new(verbose_name: &str, example: &str, description: &str) -> Self {
        Self {
            verbose_name: verbose_name.to_string(),
            example: example.to_string(),
            description: description.to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        [&self.verbose_name, &self.example, &self.description]
            .iter()
            .all(|s| !s.trim().is_empty())
    }
}

/// The captured function keyword and its allowed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    pub group: &'static str,
    pub choices: &'static [&'static str],
}

/// One scalar combination of a rule's operands.
#[derive(Debug, Clone, Copy)]
pub struct ScalarArgs<'a> {
    pub selector: Option<&'a str>,
    values: &'a [Option<f64>],
}

impl<'a> ScalarArgs<'a> {
    pub fn new(selector: Option<&'a str>, values: &'a [Option<f64>]) -> Self {
        Self { selector, values }
    }

    /// `None` when slot `i` is an absent optional operand.
    pub fn get(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied().flatten()
    }

    /// Value of a slot that is required or has a default.
    pub fn value(&self, i: usize) -> f64 {
        self.get(i).unwrap_or(f64::NAN)
    }
}

#[derive(Clone)]
pub struct Rule {
    name: String,
    pattern: Regex,
    guard: Option<Guard>,
    selector: Option<Selector>,
    slots: Vec<Slot>,
    compute: ComputeFn,
    doc: RuleDoc,
    custom: bool,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("slots", &self.slots)
            .field("custom", &self.custom)
            .finish()
    }
}

impl Rule {
    pub fn new<F>(name: &str, pattern: Regex, slots: Vec<Slot>, doc: RuleDoc, compute: F) -> Self
    where
        F: Fn(&ScalarArgs<'_>) -> Result<f64, ComputeError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            pattern,
            guard: None,
            selector: None,
            slots,
            compute: Arc::new(compute),
            doc,
            custom: false,
        }
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_selector(mut self, group: &'static str, choices: &'static [&'static str]) -> Self {
        self.selector = Some(Selector { group, choices });
        self
    }

    pub(crate) fn into_custom(mut self) -> Self {
        self.custom = true;
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn doc(&self) -> &RuleDoc { &self.doc }
    pub fn slots(&self) -> &[Slot] { &self.slots }
    pub fn is_custom(&self) -> bool { self.custom }
    pub fn pattern(&self) -> &str { self.pattern.as_str() }

    pub fn compute(&self, args: &ScalarArgs<'_>) -> Result<f64, ComputeError> {
        (self.compute)(args)
    }

    /// Leftmost acceptable match of this rule in `context`.
    pub fn find(&self, id: RuleId, context: &str) -> Result<Option<RuleMatch>, FieldError> {
        let mut start = 0;
        while start <= context.len() {
            let Some(caps) = self.pattern.captures_at(context, start) else {
                return Ok(None);
            };
            let Some(whole) = caps.get(0) else {
                return Ok(None);
            };
            if self.guard.map_or(true, |accept| accept(context, whole.start())) {
                return self.build_match(id, &caps).map(Some);
            }
            start = whole.start() + context[whole.start()..].chars().next().map_or(1, char::len_utf8);
        }
        Ok(None)
    }

    /// A match covering all of `context`, if the leftmost match does.
    pub fn find_full(&self, id: RuleId, context: &str) -> Result<Option<RuleMatch>, FieldError> {
        Ok(self.find(id, context)?.filter(|m| m.is_full(context)))
    }

    fn build_match(&self, id: RuleId, caps: &Captures<'_>) -> Result<RuleMatch, FieldError> {
        let whole = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));

        let selector = match self.selector {
            Some(sel) => {
                let word = caps.name(sel.group).map_or("", |m| m.as_str());
                if !sel.choices.contains(&word) {
                    return Err(FieldError::BadChoicesMap { field: sel.group.to_string(), value: word.to_string() });
                }
                Some(word.to_string())
            }
            None => None,
        };

        let mut operands = SmallVec::new();
        for slot in &self.slots {
            let text = caps.name(slot.name).map(|m| m.as_str());
            if text.is_none() && slot.required && slot.default.is_none() {
                return Err(FieldError::MissingField { field: slot.name.to_string(), rule: self.name.clone() });
            }
            operands.push(parse_operand(slot, text)?);
        }

        Ok(RuleMatch {
            rule: id,
            span: whole,
            matched: caps.get(0).map_or_else(String::new, |m| m.as_str().to_string()),
            selector,
            operands,
        })
    }
}

/// Decimal literal or single-valued static constant.
fn literal_value(text: &str) -> Option<f64> {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return text.parse::<f64>().ok();
    }
    statics::constant(text)
}

fn parse_operand(slot: &Slot, text: Option<&str>) -> Result<Option<Operand>, FieldError> {
    let Some(text) = text else {
        return Ok(slot.default.map(Operand::Literal));
    };
    if let Some(v) = literal_value(text) {
        return Ok(Some(Operand::Literal(v)));
    }
    if slot.kind.accepts_index() {
        if let Some(id) = tokens::single(text) {
            return Ok(Some(Operand::IndexRef(id)));
        }
    }
    if slot.kind.accepts_context() {
        return Ok(Some(Operand::RawContext(text.to_string())));
    }
    Err(FieldError::BadFieldArgument { field: slot.name.to_string(), value: text.to_string() })
}

/// Index references held by a match, in slot order.
pub fn referenced_nodes(m: &RuleMatch) -> impl Iterator<Item = NodeId> + '_ {
    m.operands.iter().filter_map(|op| match op {
        Some(Operand::IndexRef(id)) => Some(*id),
        _ => None,
    })
}
