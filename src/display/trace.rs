use crate::compute::{AssignmentKey, Ledger};
use crate::grammar::GrammarRegistry;
use crate::store::{NodeId, NodeKind, NodeStore};
use std::collections::HashMap;
use std::fmt::Write;

/// Indented dependency tree of `target` with the values cached under `key`.
/// A node reached a second time is printed as a reference to its first line.
pub fn format_trace(
    store: &NodeStore,
    registry: &GrammarRegistry,
    ledger: &Ledger,
    key: &AssignmentKey,
    target: NodeId,
) -> String {
    let mut tracer = Tracer { store, registry, ledger, key, visited_at_level: HashMap::new(), output: String::new() };

    match store.context(target) {
        Some(context) => {
            let _ = writeln!(tracer.output, "TRACE for '{}':", context);
            let _ = writeln!(tracer.output, "--------------------------------------------------");
            tracer.trace_node(target, 1, "");
        }
        None => {
            let _ = writeln!(tracer.output, "Error: Invalid Node ID {:?}", target);
        }
    }
    tracer.output
}

struct Tracer<'a> {
    store: &'a NodeStore,
    registry: &'a GrammarRegistry,
    ledger: &'a Ledger,
    key: &'a AssignmentKey,
    visited_at_level: HashMap<NodeId, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, node_id: NodeId, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&node_id) {
            let _ = writeln!(self.output, "{}-> (Ref to L{}) {}", prefix, first_seen, node_id);
            return;
        }
        self.visited_at_level.insert(node_id, level);

        let context = self.store.context(node_id).unwrap_or_default();
        let label = match self.store.kind(node_id) {
            Some(NodeKind::Variable(_)) => "Var".to_string(),
            Some(NodeKind::Rule(m)) => self.registry.get(m.rule).map_or("?", |r| r.name()).to_string(),
            Some(NodeKind::Arithmetic) => "Arithmetic".to_string(),
            None => "?".to_string(),
        };
        let _ = writeln!(
            self.output,
            "{}[L{}] {} {} '{}' = {}",
            prefix,
            level,
            node_id,
            label,
            context,
            self.format_value(node_id)
        );

        let parents = self.store.get_parents(node_id);
        self.recurse_children(prefix, parents, level);
    }

    fn recurse_children(&mut self, prefix: &str, children: &[NodeId], level: usize) {
        let stem = self.build_child_stem(prefix);
        for (i, &child) in children.iter().enumerate() {
            let connector = if i == children.len() - 1 { "`--" } else { "|--" };
            let full_prefix = format!("{}{}", stem, connector);
            self.trace_node(child, level + 1, &full_prefix);
        }
    }

    fn format_value(&self, id: NodeId) -> String {
        match self.ledger.get(id, self.key) {
            Some(values) => {
                let parts: Vec<String> = values.iter().map(|v| format!("{}", v)).collect();
                format!("[{}]", parts.join(", "))
            }
            None => "[?]".to_string(),
        }
    }

    fn build_child_stem(&self, current_prefix: &str) -> String {
        current_prefix.replace("`--", "   ").replace("|--", "|  ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{assignment_key, Assignment, Engine};
    use crate::store::ContextMap;

    #[test]
    fn test_trace_shows_shared_nodes_once() {
        let registry = GrammarRegistry::builtin();
        let map: ContextMap =
            [(0, "@/1/@+@/1/@".to_string()), (1, "\\sin@/2/@".to_string()), (2, "a".to_string())].into_iter().collect();
        let store = NodeStore::build(&map, &registry, &['a']).unwrap();
        let ledger = Ledger::new(store.count());
        let key = assignment_key(&[0.0]);
        Engine::new(&store, &registry, &ledger, 15)
            .evaluate(NodeId::ROOT, Assignment { values: &[0.0], key: &key })
            .unwrap();

        let out = format_trace(&store, &registry, &ledger, &key, NodeId::ROOT);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "TRACE for '@/1/@+@/1/@':");
        assert_eq!(lines[2], "[L1] #0 Arithmetic '@/1/@+@/1/@' = [0]");
        assert_eq!(lines[3], "`--[L2] #1 Trigonometry '\\sin@/2/@' = [0]");
        assert_eq!(lines[4], "   `--[L3] #2 Var 'a' = [0]");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_trace_marks_repeated_references() {
        let registry = GrammarRegistry::builtin();
        let map: ContextMap =
            [(0, "@/1/@*@/2/@".to_string()), (1, "@/2/@+1".to_string()), (2, "x".to_string())].into_iter().collect();
        let store = NodeStore::build(&map, &registry, &['x']).unwrap();
        let ledger = Ledger::new(store.count());
        let key = assignment_key(&[2.0]);

        let out = format_trace(&store, &registry, &ledger, &key, NodeId::ROOT);
        assert!(out.contains("|--[L2] #1 Arithmetic '@/2/@+1' = [?]"), "{out}");
        assert!(out.contains("`---> (Ref to L3) #2"), "{out}");
    }
}
