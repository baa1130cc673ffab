//! Resolution of named groups ("sub-type classes").
//!
//! A rule field such as `sub-types` may mix literal tokens with references of
//! the form `"@groupName"`. A referenced group may itself reference other
//! groups. The resolver expands references depth-first into an ordered,
//! duplicate-free token sequence, memoizing each group it finishes so a group
//! used by many rules is walked once per compilation pass.
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Prefix marking a token as a reference to a named group.
pub const GROUP_MARKER: char = '@';
/// A leaf that stands for "every token".
pub const WILDCARD: &str = "*";
/// Sentinel reported for a set collapsed by [`WILDCARD`].
pub const ALL: &str = "all";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("Missing declaration for @{name}")]
    Unknown { name: String },
    #[error("Circular reference to @{name} in {}", .cycle.join(" -> "))]
    Circular { name: String, cycle: Vec<String> },
    #[error("Group @{name} must be a list of tokens")]
    NotASequence { name: String },
    #[error("Token {value} is not a string or number")]
    NotALeaf { value: String },
}

/// An insertion-ordered token sequence without duplicates.
///
/// The first occurrence of a token fixes its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedTokens {
    items: Vec<String>,
    index: HashSet<String>,
}

impl OrderedTokens {
    pub fn new() -> Self { Self::default() }

    /// Appends `token` unless already present. Returns whether it was added.
    pub fn insert(&mut self, token: impl Into<String>) -> bool {
        let token = token.into();
        if self.index.contains(&token) {
            return false;
        }
        self.index.insert(token.clone());
        self.items.push(token);
        true
    }

    pub fn extend_from(&mut self, other: &OrderedTokens) {
        for token in &other.items {
            self.insert(token.as_str());
        }
    }

    pub fn contains(&self, token: &str) -> bool { self.index.contains(token) }
    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn as_slice(&self) -> &[String] { &self.items }
    pub fn iter(&self) -> impl Iterator<Item = &str> { self.items.iter().map(String::as_str) }
}

impl<S: Into<String>> FromIterator<S> for OrderedTokens {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tokens = Self::new();
        for token in iter {
            tokens.insert(token);
        }
        tokens
    }
}

/// The result of resolving a token field.
///
/// `All` replaces any set whose expansion contained [`WILDCARD`], so that a
/// membership test never has to scan a large resolved set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSet {
    All,
    Listed(Arc<OrderedTokens>),
}

impl Default for TokenSet {
    fn default() -> Self { TokenSet::Listed(Arc::new(OrderedTokens::new())) }
}

impl TokenSet {
    fn from_resolved(tokens: Arc<OrderedTokens>) -> Self {
        if tokens.contains(WILDCARD) {
            TokenSet::All
        } else {
            TokenSet::Listed(tokens)
        }
    }

    pub fn is_all(&self) -> bool { matches!(self, TokenSet::All) }

    /// Membership test; `All` matches every token.
    pub fn matches(&self, token: &str) -> bool {
        match self {
            TokenSet::All => true,
            TokenSet::Listed(tokens) => tokens.contains(token) || tokens.contains(ALL),
        }
    }

    pub fn tokens(&self) -> Option<&Arc<OrderedTokens>> {
        match self {
            TokenSet::All => None,
            TokenSet::Listed(tokens) => Some(tokens),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens().map_or(false, |t| t.is_empty())
    }

    /// The tokens as plain strings; `All` yields the single sentinel `"all"`.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            TokenSet::All => vec![ALL.to_string()],
            TokenSet::Listed(tokens) => tokens.as_slice().to_vec(),
        }
    }
}

/// Returns the referenced group name if `token` is a group reference.
pub fn group_reference(token: &str) -> Option<&str> {
    token.strip_prefix(GROUP_MARKER)
}

/// True if any string element of a list value is a group reference.
pub fn has_group_reference(value: &Value) -> bool {
    match value {
        Value::Array(items) => items
            .iter()
            .any(|e| e.as_str().map_or(false, |s| s.starts_with(GROUP_MARKER))),
        _ => false,
    }
}

/// Flattens a scalar or arbitrarily nested list into leaf tokens.
pub(crate) fn flatten_tokens(value: &Value, out: &mut Vec<String>) -> Result<(), GroupError> {
    match value {
        Value::Null => Ok(()),
        Value::String(s) => {
            out.push(s.clone());
            Ok(())
        }
        Value::Number(n) => {
            out.push(n.to_string());
            Ok(())
        }
        Value::Bool(b) => {
            out.push(b.to_string());
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(|item| flatten_tokens(item, out)),
        Value::Object(_) => Err(GroupError::NotALeaf { value: value.to_string() }),
    }
}

/// Expands group references against one group table.
///
/// Memoized groups live as long as the resolver, i.e. one compilation pass.
pub struct GroupResolver<'a> {
    table: &'a Map<String, Value>,
    memo: HashMap<String, Arc<OrderedTokens>>,
}

impl<'a> GroupResolver<'a> {
    pub fn new(table: &'a Map<String, Value>) -> Self {
        Self { table, memo: HashMap::new() }
    }

    pub fn table(&self) -> &'a Map<String, Value> { self.table }

    /// Resolves a scalar or list of tokens and references into a [`TokenSet`].
    pub fn resolve(&mut self, names: &Value) -> Result<TokenSet, GroupError> {
        self.expand_list(names).map(TokenSet::from_resolved)
    }

    /// Expands references in a scalar or list without the wildcard collapse.
    ///
    /// A field that is exactly one reference shares the memoized group.
    pub fn expand_list(&mut self, names: &Value) -> Result<Arc<OrderedTokens>, GroupError> {
        let mut tokens = Vec::new();
        flatten_tokens(names, &mut tokens)?;

        if let [only] = tokens.as_slice() {
            if let Some(name) = group_reference(only) {
                return self.group(name);
            }
        }

        let mut out = OrderedTokens::new();
        for token in tokens {
            match group_reference(&token) {
                Some(name) => out.extend_from(&*self.group(name)?),
                None => {
                    out.insert(token);
                }
            }
        }
        Ok(Arc::new(out))
    }

    /// Fully expanded leaves of one named group.
    pub fn group(&mut self, name: &str) -> Result<Arc<OrderedTokens>, GroupError> {
        let mut path = Vec::new();
        self.expand(name, &mut path)
    }

    fn expand(&mut self, name: &str, path: &mut Vec<String>) -> Result<Arc<OrderedTokens>, GroupError> {
        if let Some(done) = self.memo.get(name) {
            return Ok(Arc::clone(done));
        }
        if let Some(start) = path.iter().position(|p| p == name) {
            let mut cycle = path[start..].to_vec();
            cycle.push(name.to_string());
            return Err(GroupError::Circular { name: name.to_string(), cycle });
        }

        let table = self.table;
        let members = table
            .get(name)
            .ok_or_else(|| GroupError::Unknown { name: name.to_string() })?;
        if members.is_object() {
            return Err(GroupError::NotASequence { name: name.to_string() });
        }
        let mut tokens = Vec::new();
        flatten_tokens(members, &mut tokens)?;

        path.push(name.to_string());
        let mut out = OrderedTokens::new();
        for token in tokens {
            match group_reference(&token) {
                Some(inner) => {
                    let expanded = self.expand(inner, path)?;
                    out.extend_from(&expanded);
                }
                None => {
                    out.insert(token);
                }
            }
        }
        path.pop();

        let out = Arc::new(out);
        self.memo.insert(name.to_string(), Arc::clone(&out));
        Ok(out)
    }
}
