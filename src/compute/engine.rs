//! Demand-driven evaluation of a compiled node store for one assignment.
use super::arithmetic;
use super::ledger::{AssignmentKey, Ledger};
use super::numeric::{self, for_each_combination};
use crate::error::ComputeError;
use crate::grammar::{GrammarRegistry, ScalarArgs};
use crate::store::{Branches, NodeId, NodeKind, NodeStore, Operand, RuleMatch};
use log::debug;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::sync::Arc;

/// Values of the declared variables for one call, in declared order.
#[derive(Debug, Clone, Copy)]
pub struct Assignment<'a> {
    pub values: &'a [f64],
    pub key: &'a AssignmentKey,
}

pub struct Engine<'a> {
    store: &'a NodeStore,
    registry: &'a GrammarRegistry,
    ledger: &'a Ledger,
    precision: u32,
}

impl<'a> Engine<'a> {
    pub fn new(store: &'a NodeStore, registry: &'a GrammarRegistry, ledger: &'a Ledger, precision: u32) -> Self {
        Self { store, registry, ledger, precision }
    }

    /// Computes `target` and every dependency not yet in the ledger for this
    /// assignment. Dependencies are fully computed before their consumers.
    pub fn evaluate(&self, target: NodeId, assignment: Assignment<'_>) -> Result<Arc<Branches>, ComputeError> {
        if let Some(hit) = self.ledger.get(target, assignment.key) {
            return Ok(hit);
        }

        let mut eval_order = Vec::new();
        let mut visiting = HashSet::new();
        let mut visited = HashSet::new();
        self.build_eval_order_dfs(target, assignment.key, &mut eval_order, &mut visiting, &mut visited)?;
        debug!("cache miss for {} under {:?}: computing {} nodes", target, assignment.key, eval_order.len());

        for &node_id in &eval_order {
            let result = self.evaluate_node(node_id, assignment)?;
            self.ledger.insert(node_id, assignment.key, Arc::new(result));
        }

        self.ledger
            .get(target, assignment.key)
            .ok_or(ComputeError::NotComputableProcessor {
                index: target,
                context: self.context(target).to_string(),
                reason: "no such index".to_string(),
            })
    }

    /// Post-order DFS over dependencies, skipping nodes already in the ledger.
    fn build_eval_order_dfs(
        &self,
        node_id: NodeId,
        key: &AssignmentKey,
        eval_order: &mut Vec<NodeId>,
        visiting: &mut HashSet<NodeId>,
        visited: &mut HashSet<NodeId>,
    ) -> Result<(), ComputeError> {
        if visited.contains(&node_id) || self.ledger.contains(node_id, key) {
            return Ok(());
        }
        if visiting.contains(&node_id) {
            return Err(ComputeError::CycleDetected { index: node_id });
        }
        if node_id.index() >= self.store.count() {
            return Err(ComputeError::NotComputableProcessor {
                index: node_id,
                context: String::new(),
                reason: "no such index".to_string(),
            });
        }

        visiting.insert(node_id);
        for &parent_id in self.store.get_parents(node_id) {
            self.build_eval_order_dfs(parent_id, key, eval_order, visiting, visited)?;
        }
        visiting.remove(&node_id);
        visited.insert(node_id);
        eval_order.push(node_id);
        Ok(())
    }

    fn evaluate_node(&self, node_id: NodeId, assignment: Assignment<'_>) -> Result<Branches, ComputeError> {
        let values = match &self.store.kinds[node_id.index()] {
            NodeKind::Variable(pos) => {
                let value = assignment.values.get(*pos).copied().ok_or_else(|| ComputeError::NotComputableProcessor {
                    index: node_id,
                    context: self.context(node_id).to_string(),
                    reason: format!("no value for variable #{}", pos),
                })?;
                SmallVec::from_elem(value, 1)
            }
            NodeKind::Rule(m) => self.evaluate_rule(node_id, m, assignment.key)?,
            NodeKind::Arithmetic => {
                arithmetic::evaluate(node_id, self.context(node_id), |dep| self.ledger.get(dep, assignment.key))?
            }
        };
        Ok(numeric::settle(values, self.precision))
    }

    /// Cartesian product over index-referenced slots, literals held fixed.
    fn evaluate_rule(&self, node_id: NodeId, m: &RuleMatch, key: &AssignmentKey) -> Result<Branches, ComputeError> {
        let rule = self
            .registry
            .get(m.rule)
            .ok_or_else(|| ComputeError::UnknownFunction { name: format!("rule {}", m.rule.0) })?;

        let mut choices: SmallVec<[Arc<Branches>; 3]> = SmallVec::new();
        let mut fixed: SmallVec<[Option<f64>; 3]> = SmallVec::new();
        let mut axis_of: SmallVec<[Option<usize>; 3]> = SmallVec::new();
        for (slot, operand) in rule.slots().iter().zip(&m.operands) {
            match operand {
                None => {
                    fixed.push(None);
                    axis_of.push(None);
                }
                Some(Operand::Literal(v)) => {
                    fixed.push(Some(*v));
                    axis_of.push(None);
                }
                Some(Operand::IndexRef(dep)) => {
                    let values = self.ledger.get(*dep, key).ok_or_else(|| ComputeError::NotComputableField {
                        field: slot.name.to_string(),
                        rule: rule.name().to_string(),
                        index: node_id,
                    })?;
                    fixed.push(None);
                    axis_of.push(Some(choices.len()));
                    choices.push(values);
                }
                Some(Operand::RawContext(_)) => {
                    return Err(ComputeError::NotComputableField {
                        field: slot.name.to_string(),
                        rule: rule.name().to_string(),
                        index: node_id,
                    });
                }
            }
        }

        let lens: SmallVec<[usize; 3]> = choices.iter().map(|c| c.len()).collect();
        let mut out = Branches::new();
        for_each_combination(&lens, |combo| {
            let args: SmallVec<[Option<f64>; 3]> = fixed
                .iter()
                .zip(&axis_of)
                .map(|(&literal, axis)| match axis {
                    Some(k) => Some(choices[*k][combo[*k]]),
                    None => literal,
                })
                .collect();
            let value = rule.compute(&ScalarArgs::new(m.selector.as_deref(), &args))?;
            if !value.is_finite() {
                return Err(ComputeError::DomainError {
                    rule: rule.name().to_string(),
                    inputs: args.iter().flatten().copied().collect(),
                });
            }
            out.push(value);
            Ok(())
        })?;
        Ok(out)
    }

    fn context(&self, id: NodeId) -> &str {
        self.store.context(id).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ledger::assignment_key;
    use crate::grammar::CustomFunction;
    use crate::store::ContextMap;

    fn store(entries: &[(u32, &str)], registry: &GrammarRegistry, vars: &[char]) -> NodeStore {
        let map: ContextMap = entries.iter().map(|(k, v)| (*k, v.to_string())).collect();
        NodeStore::build(&map, registry, vars).unwrap()
    }

    fn run(store: &NodeStore, registry: &GrammarRegistry, ledger: &Ledger, values: &[f64]) -> Result<Vec<f64>, ComputeError> {
        let key = assignment_key(values);
        let engine = Engine::new(store, registry, ledger, 15);
        engine.evaluate(NodeId::ROOT, Assignment { values, key: &key }).map(|b| b.to_vec())
    }

    #[test]
    fn test_multi_valued_operands_multiply_out() {
        // \sqrt{\pm x + 10}
        let registry = GrammarRegistry::builtin();
        let store = store(&[(0, "\\sqrt@/1/@"), (1, "\\pm@/2/@+10"), (2, "x")], &registry, &['x']);
        let ledger = Ledger::new(store.count());
        assert_eq!(run(&store, &registry, &ledger, &[6.0]).unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_results_are_cached_per_assignment() {
        let registry = GrammarRegistry::builtin();
        let store = store(&[(0, "@/1/@*2"), (1, "x")], &registry, &['x']);
        let ledger = Ledger::new(store.count());

        let first = run(&store, &registry, &ledger, &[3.0]).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(run(&store, &registry, &ledger, &[3.0]).unwrap(), first);
        assert_eq!(ledger.len(), 2);
        run(&store, &registry, &ledger, &[4.0]).unwrap();
        assert_eq!(ledger.len(), 4);
    }

    #[test]
    fn test_raw_context_operand_is_not_computable() {
        let registry = GrammarRegistry::builtin();
        // Exponent base left as a letter that is not a declared variable.
        let store = store(&[(0, "y^2")], &registry, &[]);
        let ledger = Ledger::new(store.count());
        let err = run(&store, &registry, &ledger, &[]).unwrap_err();
        assert!(matches!(err, ComputeError::NotComputableField { ref field, .. } if field == "value"), "{err:?}");
    }

    #[test]
    fn test_non_finite_result_is_domain_error() {
        let registry = GrammarRegistry::builtin();
        let store = store(&[(0, "\\ln@/1/@"), (1, "x")], &registry, &['x']);
        let ledger = Ledger::new(store.count());
        let err = run(&store, &registry, &ledger, &[0.0]).unwrap_err();
        assert_eq!(err, ComputeError::DomainError { rule: "Logarithm".into(), inputs: vec![0.0] });
    }

    #[test]
    fn test_custom_rule_failure_propagates() {
        let registry = GrammarRegistry::with_custom([CustomFunction::fibonacci()]).unwrap();
        let store = store(&[(0, "fib@/1/@"), (1, "x")], &registry, &['x']);
        let ledger = Ledger::new(store.count());
        assert_eq!(run(&store, &registry, &ledger, &[7.0]).unwrap(), vec![13.0]);
        let err = run(&store, &registry, &ledger, &[0.0]).unwrap_err();
        assert_eq!(err, ComputeError::InvalidFibonacciPosition { position: 0.0 });
    }
}
