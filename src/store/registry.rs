use super::context_map::ContextMap;
use super::tokens;
use super::types::*;
use crate::error::FieldError;
use crate::grammar::GrammarRegistry;

/// Dense, columnar view of a compiled expression. Node `i` holds the context
/// stored under index `i`; dependencies are kept in a flat CSR layout.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    pub kinds: Vec<NodeKind>,
    pub contexts: Vec<String>,

    // Topology: the indices each node's context references.
    pub parents_flat: Vec<NodeId>,
    pub parents_ranges: Vec<(u32, u32)>, // (start, count)
}

impl NodeStore {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.kinds.len() }

    /// Resolves every context of a dense map into a node. A context equal to a
    /// declared variable becomes a variable leaf; one that a rule matches in
    /// full becomes a rule node; anything else is an arithmetic leaf.
    pub fn build(map: &ContextMap, registry: &GrammarRegistry, variables: &[char]) -> Result<Self, FieldError> {
        let mut store = Self::new();
        for (_, context) in map.iter() {
            let kind = match variable_position(context, variables) {
                Some(pos) => NodeKind::Variable(pos),
                None => match registry.resolve(context)? {
                    Some(m) => NodeKind::Rule(m),
                    None => NodeKind::Arithmetic,
                },
            };
            let parents = tokens::references(context);
            store.add_node(kind, context.to_string(), &parents);
        }
        Ok(store)
    }

    pub fn add_node(&mut self, kind: NodeKind, context: String, parents: &[NodeId]) -> NodeId {
        let id = NodeId::new(self.kinds.len());

        let start = self.parents_flat.len() as u32;
        self.parents_flat.extend_from_slice(parents);
        self.parents_ranges.push((start, parents.len() as u32));

        self.kinds.push(kind);
        self.contexts.push(context);
        id
    }

    #[inline(always)]
    pub fn get_parents(&self, id: NodeId) -> &[NodeId] {
        let (start, count) = self.parents_ranges[id.index()];
        &self.parents_flat[start as usize..(start + count) as usize]
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.kinds.get(id.index())
    }

    pub fn context(&self, id: NodeId) -> Option<&str> {
        self.contexts.get(id.index()).map(String::as_str)
    }
}

fn variable_position(context: &str, variables: &[char]) -> Option<usize> {
    let mut chars = context.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => variables.iter().position(|&v| v == c),
        _ => None,
    }
}
