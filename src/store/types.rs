use serde::{Serialize, Deserialize};
use smallvec::SmallVec;
use std::fmt;

/// Index of a context in the decomposed expression graph. Index 0 is the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }

    /// The placeholder that stands for this node inside a context string.
    pub fn token(&self) -> String { format!("@/{}/@", self.0) }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a rule in its `GrammarRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RuleId(pub u32);

impl RuleId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// One matched operand of a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(f64),
    /// Stands for the whole result tuple of the referenced node.
    IndexRef(NodeId),
    /// Text that was not reduced to an index. Computing against it is an error.
    RawContext(String),
}

/// A context whose whole span matched a single grammar rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule: RuleId,
    /// Byte span of the match inside the context it was found in.
    pub span: (usize, usize),
    pub matched: String,
    /// Function keyword captured by rules that dispatch on it (`sin`, `log`, ...).
    pub selector: Option<String>,
    /// One entry per declared slot; `None` for an absent optional slot.
    pub operands: SmallVec<[Option<Operand>; 3]>,
}

impl RuleMatch {
    pub fn is_full(&self, context: &str) -> bool {
        self.span == (0, context.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Leaf equal to a declared variable; holds its position in declared order.
    Variable(usize),
    /// Leaf holding arithmetic over index tokens, numbers and static operands.
    Arithmetic,
    Rule(RuleMatch),
}

/// Result tuple of one node: every real branch it can take.
pub type Branches = SmallVec<[f64; 2]>;
