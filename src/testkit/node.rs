//! A minimal reentrant DAG unifier, used only by `testkit`'s `ToyFs` to give
//! the engine's test suite something concrete to drive the `FeatureStructure`
//! trait with. Not part of the public API: the real unifier is external
//! (§1/§6).

use std::collections::{HashMap, HashSet};
use std::fmt;

pub type Err = Box<dyn std::error::Error + 'static>;

/// Index type for the node arena
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeIdx(pub u32);

/// Unpacked representation of a feature, that NodeArena::alloc_from_features can turn into a Node
#[derive(Debug)]
pub struct Feature {
  /// Dotted path where each segment will be a node: "a.b.c" -> [a: [b: [c: ...]]]
  pub path: String,
  /// Unique string that will link features into a reentrant node, or None
  pub tag: Option<String>,
  /// What will end up at `path`. Will be unified with any other feature values with the same tag.
  pub value: NodeIdx,
}

/// A node in the feature structure graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
  /// Top can unify with anything
  Top,
  /// A string-valued feature, such as "nom" in [case: nom]. Unifies with eq. Str nodes
  Str(String),
  /// An arc-containing node with arcs to other NodeIdxs
  Edged(HashMap<String, NodeIdx>),
  /// A node that has been forwarded to another node through unification.
  /// Before using a node, it should be dereferenced to resolve its forward
  Forwarded(NodeIdx),
}

impl Node {
  fn new_str(s: String) -> Self {
    Self::Str(s)
  }

  fn new_edged() -> Self {
    Self::Edged(HashMap::new())
  }

  fn is_top(&self) -> bool {
    matches!(self, Self::Top)
  }

  fn str(&self) -> Option<&str> {
    match self {
      Self::Str(s) => Some(s),
      _ => None,
    }
  }

  fn is_str(&self) -> bool {
    self.str().is_some()
  }

  fn edged(&self) -> Option<&HashMap<String, NodeIdx>> {
    match self {
      Self::Edged(v) => Some(v),
      _ => None,
    }
  }

  fn edged_mut(&mut self) -> Option<&mut HashMap<String, NodeIdx>> {
    match self {
      Self::Edged(v) => Some(v),
      _ => None,
    }
  }

  fn is_edged(&self) -> bool {
    self.edged().is_some()
  }
}

/// An arena that stores all nodes and provides methods to operate on them
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NodeArena {
  nodes: Vec<Node>,
}

impl NodeArena {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn alloc(&mut self, node: Node) -> NodeIdx {
    let idx = self.nodes.len() as u32;
    self.nodes.push(node);
    NodeIdx(idx)
  }

  pub fn replace(&mut self, idx: NodeIdx, node: Node) -> Node {
    std::mem::replace(&mut self.nodes[idx.0 as usize], node)
  }

  pub fn alloc_top(&mut self) -> NodeIdx {
    self.alloc(Node::Top)
  }

  pub fn alloc_str(&mut self, s: String) -> NodeIdx {
    self.alloc(Node::new_str(s))
  }

  pub fn alloc_edged(&mut self) -> NodeIdx {
    self.alloc(Node::new_edged())
  }

  /// Display a NodeIdx
  pub fn display(&self, idx: NodeIdx) -> NodeDisplay {
    NodeDisplay { arena: self, idx }
  }

  /// Creates a Node from a list of (name, noderef) features. Names CANNOT be dotted!
  pub fn alloc_from_edges<I>(&mut self, edges: I) -> Result<NodeIdx, Err>
  where
    I: IntoIterator<Item = (String, NodeIdx)>,
  {
    let node = self.alloc_edged();

    for (label, target) in edges {
      assert!(
        !label.contains('.'),
        "alloc_from_edges cannot take dotted paths!"
      );

      self.push_edge(node, label, target)?; // error if unification failure
    }

    Ok(node)
  }

  pub fn alloc_from_features<I>(&mut self, paths: I) -> Result<NodeIdx, Err>
  where
    I: IntoIterator<Item = Feature>,
  {
    let root = self.alloc_edged();

    let mut tags: HashMap<String, NodeIdx> = HashMap::new();
    for Feature { value, tag, path } in paths {
      if let Some(tag) = tag {
        if tags.contains_key(&tag) {
          let tagged = tags[&tag];
          self.unify(value, tagged)?;
        } else {
          tags.insert(tag.to_string(), value);
        }
      }

      let mut current = root;
      let mut parts = path.split('.').peekable();
      loop {
        let next = parts.next().expect("shouldn't be empty b/c path.len() > 0");
        let is_last = parts.peek().is_none();

        if is_last {
          self.push_edge(current, next.to_string(), value)?;
          break;
        } else {
          let new = self.alloc_edged();
          self.push_edge(current, next.to_string(), new)?;
          current = new;
        }
      }
    }

    Ok(root)
  }

  /// Get an idx. Assumes valid, panics on OOB
  pub fn get(&self, idx: NodeIdx) -> &Node {
    self.nodes.get(idx.0 as usize).expect("Invalid NodeIdx")
  }

  /// Mutably get an idx. Assumes valid, panics on OOB
  pub fn get_mut(&mut self, idx: NodeIdx) -> &mut Node {
    self.nodes.get_mut(idx.0 as usize).expect("Invalid NodeIdx")
  }

  pub fn forward_to(&mut self, target: NodeIdx, to: NodeIdx) {
    self.nodes[target.0 as usize] = Node::Forwarded(to);
  }

  pub fn is_top(&self, n: NodeIdx) -> bool {
    self.get(n).is_top()
  }

  pub fn is_str(&self, n: NodeIdx) -> bool {
    self.get(n).is_str()
  }

  pub fn is_edged(&self, n: NodeIdx) -> bool {
    self.get(n).is_edged()
  }

  fn str(&self, n: NodeIdx) -> Option<&str> {
    self.get(n).str()
  }

  fn edged(&self, n: NodeIdx) -> Option<&HashMap<String, NodeIdx>> {
    self.get(n).edged()
  }

  fn edged_mut(&mut self, n: NodeIdx) -> Option<&mut HashMap<String, NodeIdx>> {
    self.get_mut(n).edged_mut()
  }

  #[allow(clippy::map_entry)]
  fn push_edge(&mut self, parent: NodeIdx, label: String, target: NodeIdx) -> Result<(), Err> {
    let node = self.get_mut(parent);

    if node.is_top() {
      *node = Node::new_edged();
    }

    if let Some(arcs) = node.edged_mut() {
      if arcs.contains_key(&label) {
        let existing = arcs[&label];
        self.unify(existing, target)?;
      } else {
        arcs.insert(label, target);
      }
      return Ok(());
    }

    Err(format!("unification failure: {}", label).into())
  }

  /// Public wrapper over `push_edge`, used by `ToyFs::unify_np`/`unify_restrict`
  /// to attach a daughter's fs to a rule's argument slot.
  pub fn unify_edge(&mut self, parent: NodeIdx, label: String, target: NodeIdx) -> Result<(), Err> {
    self.push_edge(parent, label, target)
  }

  /// Remove a top-level edge from `parent` (the `unify_restrict` "deleted
  /// daughters" step, §4.D). A no-op if `parent` isn't edged or doesn't carry
  /// the label.
  pub fn remove_edge(&mut self, parent: NodeIdx, label: &str) {
    let parent = self.dereference(parent);
    if let Some(arcs) = self.edged_mut(parent) {
      arcs.remove(label);
    }
  }

  pub fn dereference(&self, mut idx: NodeIdx) -> NodeIdx {
    while let Node::Forwarded(r) = self.get(idx) {
      idx = *r;
    }
    idx
  }

  /// Unify two feature structures within this arena. Both may be mutated.
  pub fn unify(&mut self, n1: NodeIdx, n2: NodeIdx) -> Result<(), Err> {
    let n1 = self.dereference(n1);
    let n2 = self.dereference(n2);

    // if same node, already unified
    if n1 == n2 {
      return Ok(());
    }

    // If either is top, forward to the other
    if self.is_top(n1) {
      self.forward_to(n1, n2);
      return Ok(());
    } else if self.is_top(n2) {
      self.forward_to(n2, n1);
      return Ok(());
    }

    // try to unify string values
    if self.is_str(n1) && self.is_str(n2) {
      let n1_str = self.str(n1).unwrap();
      let n2_str = self.str(n2).unwrap();

      if n1_str == n2_str {
        self.forward_to(n1, n2);
        return Ok(());
      } else {
        return Err(format!("unification failure: {n1_str} & {n2_str}").into());
      }
    }

    // if both are edged, unify their contents
    if self.is_edged(n1) && self.is_edged(n2) {
      let n1 = self.replace(n1, Node::Forwarded(n2));
      let n1arcs = n1.edged().unwrap();

      for (label, value) in n1arcs.iter() {
        if self.edged(n2).unwrap().contains_key(label) {
          // shared arc
          let other = self.edged(n2).unwrap().get(label).unwrap();
          self.unify(*value, *other)?;
        } else {
          // complement arc
          self.edged_mut(n2).unwrap().insert(label.clone(), *value);
        }
      }

      return Ok(());
    }

    Err(
      format!(
        "unification failure: {:?} & {:?}",
        self.get(n1),
        self.get(n2)
      )
      .into(),
    )
  }

  /// Deep-copy `idx` into fresh nodes, preserving internal reentrancy
  /// (shared sub-nodes stay shared in the copy). Backs `FeatureStructure::copy`.
  pub fn deep_clone(&mut self, idx: NodeIdx) -> NodeIdx {
    let mut seen = HashMap::new();
    self.deep_clone_rec(idx, &mut seen)
  }

  fn deep_clone_rec(&mut self, idx: NodeIdx, seen: &mut HashMap<NodeIdx, NodeIdx>) -> NodeIdx {
    let idx = self.dereference(idx);
    if let Some(copied) = seen.get(&idx) {
      return *copied;
    }

    match self.get(idx).clone() {
      Node::Top => {
        let new = self.alloc_top();
        seen.insert(idx, new);
        new
      }
      Node::Str(s) => {
        let new = self.alloc_str(s);
        seen.insert(idx, new);
        new
      }
      Node::Edged(edges) => {
        let new = self.alloc_edged();
        seen.insert(idx, new);
        let mut copied_edges = HashMap::with_capacity(edges.len());
        for (label, value) in edges {
          copied_edges.insert(label, self.deep_clone_rec(value, seen));
        }
        *self.get_mut(new) = Node::Edged(copied_edges);
        new
      }
      Node::Forwarded(_) => unreachable!("dereference already resolved forwards"),
    }
  }

  /// Structural unifiability pre-check (`FeatureStructure::compatible`):
  /// would `unify(a, b)` succeed, without actually mutating the arena?
  pub fn compatible(&self, a: NodeIdx, b: NodeIdx) -> bool {
    let mut seen = HashSet::new();
    self.compatible_rec(a, b, &mut seen)
  }

  fn compatible_rec(&self, a: NodeIdx, b: NodeIdx, seen: &mut HashSet<(NodeIdx, NodeIdx)>) -> bool {
    let a = self.dereference(a);
    let b = self.dereference(b);
    if a == b {
      return true;
    }
    if !seen.insert((a, b)) {
      // already assumed compatible higher up this recursion; breaks cycles
      // in reentrant structures the same way a real unifier's union-find
      // would.
      return true;
    }

    match (self.get(a), self.get(b)) {
      (Node::Top, _) | (_, Node::Top) => true,
      (Node::Str(s1), Node::Str(s2)) => s1 == s2,
      (Node::Edged(e1), Node::Edged(e2)) => e1
        .iter()
        .filter_map(|(k, v)| e2.get(k).map(|v2| (*v, *v2)))
        .all(|(v1, v2)| self.compatible_rec(v1, v2, seen)),
      _ => false,
    }
  }

  /// Structural subsumption (`FeatureStructure::subsumes`): does `a`
  /// generalize `b` (every edge `a` has, `b` has too, with subsuming
  /// values), and vice versa?
  pub fn subsumes(&self, a: NodeIdx, b: NodeIdx) -> (bool, bool) {
    let fwd = self.subsumes_dir(a, b, &mut HashSet::new());
    let bwd = self.subsumes_dir(b, a, &mut HashSet::new());
    (fwd, bwd)
  }

  fn subsumes_dir(&self, a: NodeIdx, b: NodeIdx, seen: &mut HashSet<(NodeIdx, NodeIdx)>) -> bool {
    let a = self.dereference(a);
    let b = self.dereference(b);
    if a == b {
      return true;
    }
    if !seen.insert((a, b)) {
      return true;
    }

    match (self.get(a), self.get(b)) {
      (Node::Top, _) => true,
      (Node::Str(s1), Node::Str(s2)) => s1 == s2,
      (Node::Edged(e1), Node::Edged(e2)) => e1
        .iter()
        .all(|(k, v)| e2.get(k).is_some_and(|v2| self.subsumes_dir(*v, *v2, seen))),
      _ => false,
    }
  }
}

/// Helper struct for displaying a node
#[derive(Clone)]
pub struct NodeDisplay<'a> {
  pub arena: &'a NodeArena,
  pub idx: NodeIdx,
}

impl fmt::Display for NodeDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut counts = HashMap::new();
    count_in_pointers(self, &mut counts);
    let mut has_printed = HashMap::new();
    format_node(self, &counts, &mut has_printed, 0, f)
  }
}

// for fmt::Display impl
#[allow(clippy::map_entry)]
fn count_in_pointers(n: &NodeDisplay, seen: &mut HashMap<NodeIdx, usize>) {
  let nref = n.arena.dereference(n.idx);
  if seen.contains_key(&nref) {
    seen.entry(nref).and_modify(|cnt| *cnt += 1);
  } else {
    seen.insert(nref, 1);
    if let Some(arcs) = n.arena.edged(nref) {
      for value in arcs.values() {
        count_in_pointers(
          &NodeDisplay {
            arena: n.arena,
            idx: *value,
          },
          seen,
        );
      }
    }
  }
}

// for fmt::Display impl
fn format_node(
  nd: &NodeDisplay,
  counts: &HashMap<NodeIdx, usize>,
  has_printed: &mut HashMap<NodeIdx, usize>,
  indent: usize,
  f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
  let arena = nd.arena;
  let idx = arena.dereference(nd.idx);

  if counts[&idx] > 1 && has_printed.contains_key(&idx) {
    return write!(f, "#{}", has_printed[&idx]);
  }

  if counts[&idx] > 1 {
    let id = has_printed.len();
    has_printed.insert(idx, id);
    write!(f, "#{} ", id)?;
  }

  let r = nd.arena.get(idx);
  match r {
    Node::Top => write!(f, "**top**"),
    Node::Str(s) => write!(f, "{}", s),
    Node::Edged(arcs) => {
      if arcs.is_empty() {
        write!(f, "[]")
      } else if arcs.len() == 1 {
        let (label, value) = arcs.iter().next().unwrap();
        write!(f, "[ {}: ", label)?;
        format_node(
          &NodeDisplay { arena, idx: *value },
          counts,
          has_printed,
          0,
          f,
        )?;
        write!(f, " ]")
      } else {
        writeln!(f, "[")?;
        for (label, value) in arcs.iter() {
          write!(f, "{:indent$}{}: ", "", label, indent = indent + 2)?;
          format_node(
            &NodeDisplay { arena, idx: *value },
            counts,
            has_printed,
            indent + 2,
            f,
          )?;
          writeln!(f)?;
        }
        write!(f, "{:indent$}]", "", indent = indent)
      }
    }
    Node::Forwarded(_) => panic!("unexpected forward"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_construct_fs() {
    let mut arena = NodeArena::new();

    let features = vec![
      Feature {
        path: "a.b".to_string(),
        tag: Some("1".to_string()),
        value: arena.alloc_top(),
      },
      Feature {
        path: "a.b.c".to_string(),
        tag: None,
        value: arena.alloc_str("foo".to_string()),
      },
      Feature {
        path: "a.b.d".to_string(),
        tag: None,
        value: arena.alloc_str("bar".to_string()),
      },
      Feature {
        path: "e".to_string(),
        tag: Some("1".to_string()),
        value: arena.alloc_top(),
      },
    ];

    let root = arena.alloc_from_features(features).unwrap();

    println!("{}", arena.display(root));
  }

  #[test]
  fn test_unify_tags() {
    let mut arena = NodeArena::new();

    let features1 = vec![
      Feature {
        path: "a.b".to_string(),
        tag: Some("1".to_string()),
        value: arena.alloc_top(),
      },
      Feature {
        path: "c".to_string(),
        tag: Some("1".to_string()),
        value: arena.alloc_top(),
      },
    ];

    let fs1 = arena.alloc_from_features(features1).unwrap();

    let features2 = vec![Feature {
      path: "c".to_string(),
      tag: None,
      value: arena.alloc_str("foo".to_string()),
    }];

    let fs2 = arena.alloc_from_features(features2).unwrap();

    // everything in fs1 is still **top** at this point, so it serializes away
    assert!(super::serialized::SerializedNode::from_node(&arena, fs1).is_none());

    arena.unify(fs1, fs2).unwrap();

    let gold = super::serialized::SerializedNode::Edged(
      vec![
        (
          "a".into(),
          super::serialized::SerializedNode::Edged(
            vec![("b".into(), "foo".into())].into_iter().collect(),
          ),
        ),
        ("c".into(), "foo".into()),
      ]
      .into_iter()
      .collect(),
    );

    assert!(super::serialized::SerializedNode::from_node(&arena, fs1) == Some(gold.clone()));
    assert!(super::serialized::SerializedNode::from_node(&arena, fs2) == Some(gold));
  }

  #[test]
  fn subsumption_top_generalizes_everything() {
    let mut arena = NodeArena::new();
    let top = arena.alloc_top();
    let str_ = arena.alloc_str("foo".to_string());
    assert_eq!(arena.subsumes(top, str_), (true, false));
  }

  #[test]
  fn subsumption_equivalent_structures() {
    let mut arena = NodeArena::new();
    let v1 = arena.alloc_str("1".to_string());
    let a = arena.alloc_from_edges(vec![("x".to_string(), v1)]).unwrap();
    let v2 = arena.alloc_str("1".to_string());
    let b = arena.alloc_from_edges(vec![("x".to_string(), v2)]).unwrap();
    assert_eq!(arena.subsumes(a, b), (true, true));
  }
}
