//! Containment relationships between concepts and the walks over them.
//!
//! The engine never owns a taxonomy. Walks go through the
//! [`RelationshipOracle`] capability, which a host implements over its own
//! relationship store. [`ContainmentGraph`] is a small petgraph-backed
//! implementation for hosts that hand relationships over directly.
use super::error::WalkError;
use crate::facts::ConceptId;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// The dimensional relationship arcroles the walks follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arcrole {
    HypercubeDimension,
    DimensionDomain,
    DomainMember,
}

impl Arcrole {
    pub const DIMENSIONAL: [Arcrole; 3] = [Arcrole::HypercubeDimension, Arcrole::DimensionDomain, Arcrole::DomainMember];

    pub fn uri(self) -> &'static str {
        match self {
            Arcrole::HypercubeDimension => "http://xbrl.org/int/dim/arcrole/hypercube-dimension",
            Arcrole::DimensionDomain => "http://xbrl.org/int/dim/arcrole/dimension-domain",
            Arcrole::DomainMember => "http://xbrl.org/int/dim/arcrole/domain-member",
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::DIMENSIONAL.into_iter().find(|a| a.uri() == uri)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub from: ConceptId,
    pub to: ConceptId,
    pub arcrole: Arcrole,
    pub link_role: String,
    /// Link role where the consecutive relationships continue, if not this one.
    pub target_role: Option<String>,
}

impl Relationship {
    pub fn new(from: ConceptId, to: ConceptId, arcrole: Arcrole, link_role: impl Into<String>) -> Self {
        Self { from, to, arcrole, link_role: link_role.into(), target_role: None }
    }

    pub fn with_target_role(mut self, role: impl Into<String>) -> Self {
        self.target_role = Some(role.into());
        self
    }

    pub fn consecutive_link_role(&self) -> &str {
        self.target_role.as_deref().unwrap_or(&self.link_role)
    }
}

/// Read access to a host's relationship store.
pub trait RelationshipOracle {
    /// Relationships of `arcrole` leaving `from`, in document order.
    /// `link_role: None` spans every link role.
    fn relationships_from(&self, from: &ConceptId, arcrole: Arcrole, link_role: Option<&str>) -> Vec<&Relationship>;

    /// Concepts of the active model with the given local name.
    fn concepts_named(&self, local_name: &str) -> Vec<ConceptId>;
}

/// Restricts walk output to concepts of the standard taxonomies.
pub type StandardNamespaces = HashSet<String>;

/// Members under each dimension-domain relationship of `axis`, domain included.
pub fn axis_members(
    oracle: &dyn RelationshipOracle,
    axis: &ConceptId,
    standard_only: Option<&StandardNamespaces>,
) -> Result<BTreeSet<ConceptId>, WalkError> {
    let mut members = BTreeSet::new();
    for rel in oracle.relationships_from(axis, Arcrole::DimensionDomain, None) {
        domain_members(oracle, rel, standard_only, &mut members)?;
    }
    Ok(members)
}

/// Descendants of every concept named `local_name` under domain-member relationships.
pub fn member_children(oracle: &dyn RelationshipOracle, local_name: &str) -> Result<BTreeSet<ConceptId>, WalkError> {
    let mut members = BTreeSet::new();
    for concept in oracle.concepts_named(local_name) {
        for rel in oracle.relationships_from(&concept, Arcrole::DomainMember, None) {
            domain_members(oracle, rel, None, &mut members)?;
        }
    }
    Ok(members)
}

/// Adds the target of `rel` and its domain-member descendants within the consecutive link role.
///
/// A concept reached twice through different parents is fine; reaching a
/// concept that is on the current path is a cycle.
pub fn domain_members(
    oracle: &dyn RelationshipOracle,
    rel: &Relationship,
    standard_only: Option<&StandardNamespaces>,
    members: &mut BTreeSet<ConceptId>,
) -> Result<(), WalkError> {
    let mut path = Vec::new();
    walk_domain(oracle, rel, standard_only, members, &mut path)
}

fn walk_domain(
    oracle: &dyn RelationshipOracle,
    rel: &Relationship,
    standard_only: Option<&StandardNamespaces>,
    members: &mut BTreeSet<ConceptId>,
    path: &mut Vec<ConceptId>,
) -> Result<(), WalkError> {
    let to = &rel.to;
    if let Some(start) = path.iter().position(|c| c == to) {
        let mut cycle = path[start..].to_vec();
        cycle.push(to.clone());
        return Err(WalkError::Cycle { cycle });
    }
    if standard_only.map_or(true, |ns| ns.contains(&to.namespace)) {
        members.insert(to.clone());
    }

    path.push(to.clone());
    for child in oracle.relationships_from(to, Arcrole::DomainMember, Some(rel.consecutive_link_role())) {
        walk_domain(oracle, child, standard_only, members, path)?;
    }
    path.pop();
    Ok(())
}

/// Whether `target` is reachable from `root` through dimensional relationships,
/// each step staying in the consecutive link role of the previous one.
pub fn is_descendant(
    oracle: &dyn RelationshipOracle,
    root: &ConceptId,
    target: &ConceptId,
    link_role: Option<&str>,
) -> bool {
    let mut visited: HashSet<(ConceptId, Option<String>)> = HashSet::new();
    let mut queue = VecDeque::from([(root.clone(), link_role.map(str::to_string))]);

    while let Some((concept, role)) = queue.pop_front() {
        if !visited.insert((concept.clone(), role.clone())) {
            continue;
        }
        for arcrole in Arcrole::DIMENSIONAL {
            for rel in oracle.relationships_from(&concept, arcrole, role.as_deref()) {
                if &rel.to == target {
                    return true;
                }
                queue.push_back((rel.to.clone(), Some(rel.consecutive_link_role().to_string())));
            }
        }
    }
    false
}

/// An in-memory relationship store.
#[derive(Debug, Clone, Default)]
pub struct ContainmentGraph {
    graph: DiGraph<ConceptId, Relationship>,
    nodes: HashMap<ConceptId, NodeIndex>,
}

impl ContainmentGraph {
    pub fn new() -> Self { Self::default() }

    fn node(&mut self, concept: &ConceptId) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(concept) {
            return idx;
        }
        let idx = self.graph.add_node(concept.clone());
        self.nodes.insert(concept.clone(), idx);
        idx
    }

    pub fn add(&mut self, rel: Relationship) {
        let from = self.node(&rel.from);
        let to = self.node(&rel.to);
        self.graph.add_edge(from, to, rel);
    }

    pub fn concept_count(&self) -> usize { self.graph.node_count() }
    pub fn relationship_count(&self) -> usize { self.graph.edge_count() }
}

impl FromIterator<Relationship> for ContainmentGraph {
    fn from_iter<I: IntoIterator<Item = Relationship>>(iter: I) -> Self {
        let mut graph = Self::new();
        for rel in iter {
            graph.add(rel);
        }
        graph
    }
}

impl RelationshipOracle for ContainmentGraph {
    fn relationships_from(&self, from: &ConceptId, arcrole: Arcrole, link_role: Option<&str>) -> Vec<&Relationship> {
        let Some(&idx) = self.nodes.get(from) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges(idx)
            .filter(|e| e.weight().arcrole == arcrole && link_role.map_or(true, |r| e.weight().link_role == r))
            .collect();
        // petgraph lists outgoing edges newest first.
        edges.sort_by_key(|e| e.id());
        edges.into_iter().map(|e| e.weight()).collect()
    }

    fn concepts_named(&self, local_name: &str) -> Vec<ConceptId> {
        let mut found: Vec<ConceptId> =
            self.nodes.keys().filter(|c| c.local_name == local_name).cloned().collect();
        found.sort();
        found
    }
}
