//! Turns source text into a deduplicated index → context map.
//!
//! Four passes run in order, each to a fixpoint:
//! 1. `{...}` groups are replaced by index tokens; the remainder is the root.
//! 2. innermost `(...)` and `[...]` groups are extracted from every index.
//! 3. every rule pattern is applied to every index, extracting non-full matches.
//! 4. declared variable letters are bound to their own indices.
//!
//! Indices are interned in an arena, so identical contexts share one index
//! and merges caused by later rewrites are folded back in before finishing.

mod arena;
mod binding;
mod groups;
mod validate;

pub use groups::avoid_parentheses;
pub use validate::parse_variables;

use crate::error::{FieldError, TexCalcError};
use crate::grammar::GrammarRegistry;
use crate::store::{ContextMap, NodeId};
use arena::ContextArena;
use log::{debug, trace};
use std::collections::VecDeque;

pub struct Decomposer<'a> {
    registry: &'a GrammarRegistry,
    variables: &'a [char],
    arena: ContextArena,
}

impl<'a> Decomposer<'a> {
    pub fn new(registry: &'a GrammarRegistry, variables: &'a [char]) -> Self {
        Self { registry, variables, arena: ContextArena::new() }
    }

    /// Runs all passes over `expression`. Whitespace only separates a command
    /// from a following letter.
    pub fn run(mut self, expression: &str) -> Result<ContextMap, TexCalcError> {
        let registry = self.registry;
        let custom: Vec<&str> = registry.custom_names().collect();
        let text = groups::strip_whitespace(expression, &custom);
        validate::check_expression(&text, self.variables, self.registry)?;

        groups::extract_braces(&mut self.arena, &text);
        debug!("braces extracted: {} contexts", self.arena.live_ids().len());

        groups::flatten_groups(&mut self.arena);
        self.arena.canonicalize();
        debug!("groups flattened: {} contexts", self.arena.live_ids().len());

        self.reduce_grammar()?;
        self.arena.canonicalize();
        debug!("grammar reduced: {} contexts", self.arena.live_ids().len());

        binding::bind_variables(&mut self.arena, self.variables, &custom);
        let map = self.arena.finish();
        debug!("variables bound: {} contexts", map.len());
        Ok(map)
    }

    /// Pass 3. An index whose text changed is queued again, since an earlier
    /// rule may match the rewritten text.
    fn reduce_grammar(&mut self) -> Result<(), FieldError> {
        let registry = self.registry;
        let mut queue: VecDeque<NodeId> = self.arena.live_ids().into();
        while let Some(id) = queue.pop_front() {
            let mut changed = false;
            'rules: for (rule_id, rule) in registry.iter() {
                loop {
                    if !self.arena.is_live(id) {
                        break 'rules;
                    }
                    let text = self.arena.text(id).to_string();
                    let Some(m) = rule.find(rule_id, &text)? else { break };
                    if m.is_full(&text) {
                        break;
                    }
                    let (start, end) = m.span;
                    let rewritten = format!("{}{}{}", &text[..start], self.extract(&m.matched, &mut queue), &text[end..]);
                    self.arena.rewrite(id, rewritten);
                    changed = true;
                }
            }
            if changed && self.arena.is_live(id) {
                queue.push_back(id);
            }
        }
        Ok(())
    }

    fn extract(&mut self, matched: &str, queue: &mut VecDeque<NodeId>) -> String {
        let (child, created) = self.arena.intern(matched);
        if created {
            trace!("extracted {} = '{}'", child, matched);
            queue.push_back(child);
        }
        child.token()
    }
}

/// Decomposes `expression` with already validated variables.
pub fn decompose(expression: &str, variables: &[char], registry: &GrammarRegistry) -> Result<ContextMap, TexCalcError> {
    Decomposer::new(registry, variables).run(expression)
}
