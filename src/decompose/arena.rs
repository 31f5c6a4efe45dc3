//! Mutable context arena used while decomposing. Every live text is interned
//! so identical contexts always share one index.

use crate::store::{tokens, ContextMap, NodeId};
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Entry {
    Live(String),
    /// Merged into another index whose text became identical.
    Alias(NodeId),
}

#[derive(Debug, Clone)]
pub(crate) struct ContextArena {
    entries: Vec<Entry>,
    interned: HashMap<String, NodeId>,
}

impl ContextArena {
    /// Starts with an empty root at index 0.
    pub fn new() -> Self {
        Self { entries: vec![Entry::Live(String::new())], interned: HashMap::new() }
    }

    /// Index holding `text`, creating it if needed. The flag is true when created.
    pub fn intern(&mut self, text: &str) -> (NodeId, bool) {
        if let Some(&id) = self.interned.get(text) {
            return (id, false);
        }
        let id = NodeId::new(self.entries.len());
        self.entries.push(Entry::Live(text.to_string()));
        self.interned.insert(text.to_string(), id);
        (id, true)
    }

    pub fn lookup(&self, text: &str) -> Option<NodeId> {
        self.interned.get(text).copied()
    }

    pub fn resolve(&self, mut id: NodeId) -> NodeId {
        while let Some(Entry::Alias(next)) = self.entries.get(id.index()) {
            id = *next;
        }
        id
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        matches!(self.entries.get(id.index()), Some(Entry::Live(_)))
    }

    pub fn text(&self, id: NodeId) -> &str {
        match self.entries.get(self.resolve(id).index()) {
            Some(Entry::Live(text)) => text,
            _ => "",
        }
    }

    pub fn live_ids(&self) -> Vec<NodeId> {
        (0..self.entries.len()).map(NodeId::new).filter(|&id| self.is_live(id)).collect()
    }

    /// Replaces the text of a live index. If another index already holds the
    /// new text, `id` becomes an alias of it.
    pub fn rewrite(&mut self, id: NodeId, text: String) {
        if let Some(Entry::Live(old)) = self.entries.get(id.index()) {
            if self.interned.get(old) == Some(&id) {
                self.interned.remove(old);
            }
        }
        match self.interned.get(&text) {
            Some(&other) if other != id => self.entries[id.index()] = Entry::Alias(other),
            _ => {
                self.interned.insert(text.clone(), id);
                self.entries[id.index()] = Entry::Live(text);
            }
        }
    }

    /// Points every token at its live index until no alias is referenced.
    /// Rewriting can merge further indices, hence the loop.
    pub fn canonicalize(&mut self) {
        loop {
            let mut changed = false;
            for id in self.live_ids() {
                if !self.is_live(id) {
                    continue;
                }
                let current = self.text(id);
                let remapped = tokens::remap(current, |t| self.resolve(t));
                if remapped != current {
                    self.rewrite(id, remapped);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Freezes the arena into a dense map. The resolved root becomes index 0,
    /// the other live indices keep their relative order.
    pub fn finish(mut self) -> ContextMap {
        self.canonicalize();
        let root = self.resolve(NodeId::ROOT);
        let order: Vec<NodeId> = std::iter::once(root)
            .chain(self.live_ids().into_iter().filter(|&id| id != root))
            .collect();

        let mut renumber = vec![NodeId::ROOT; self.entries.len()];
        for (new, old) in order.iter().enumerate() {
            renumber[old.index()] = NodeId::new(new);
        }

        let mut map = ContextMap::new();
        for (new, &old) in order.iter().enumerate() {
            let context = tokens::remap(self.text(old), |t| renumber[self.resolve(t).index()]);
            map.insert(NodeId::new(new), context);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_reuses_identical_text() {
        let mut arena = ContextArena::new();
        let (a, created) = arena.intern("x+1");
        assert!(created);
        assert_eq!(arena.intern("x+1"), (a, false));
    }

    #[test]
    fn test_rewrite_into_existing_text_merges() {
        let mut arena = ContextArena::new();
        let (a, _) = arena.intern("\\sin@/3/@");
        let (b, _) = arena.intern("\\sin@/4/@");
        arena.rewrite(b, "\\sin@/3/@".into());
        assert_eq!(arena.resolve(b), a);
        assert!(!arena.is_live(b));
    }

    #[test]
    fn test_finish_moves_merged_root_to_zero() {
        let mut arena = ContextArena::new();
        let (x, _) = arena.intern("x");
        let (s, _) = arena.intern(&format!("\\sin{}", x.token()));
        arena.rewrite(NodeId::ROOT, format!("\\sin{}", x.token()));

        let map = arena.finish();
        assert_eq!(s, NodeId(2));
        assert_eq!(map.len(), 2);
        assert_eq!(map.root(), Some("\\sin@/1/@"));
        assert_eq!(map.get(NodeId(1)), Some("x"));
    }
}
