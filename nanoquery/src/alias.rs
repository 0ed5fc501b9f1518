//! Allocating collision-free table aliases within a query.

use core::fmt::Debug;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;


/// The process-wide disambiguation counter behind [`GlobalCounter`].
/// It is never reset.
static NEXT_SUFFIX: AtomicUsize = AtomicUsize::new(1);

/// A source of numeric suffixes for disambiguating colliding aliases.
///
/// Every call must return a value never returned before by the same
/// counter; the registry relies on this for termination.
pub trait AliasCounter: Debug + Send + Sync {
    /// Returns the current value and increments the counter.
    fn next(&self) -> usize;
}

/// The counter shared by every query in the process. This is the default,
/// and it guarantees that aliases are unique even across queries that are
/// later composed, e.g. by `UNION`s or subqueries.
#[derive(Clone, Copy, Default, Debug)]
pub struct GlobalCounter;

impl AliasCounter for GlobalCounter {
    fn next(&self) -> usize {
        NEXT_SUFFIX.fetch_add(1, Ordering::Relaxed)
    }
}

/// A counter private to whoever owns it. Mostly useful for producing
/// reproducible aliases in tests.
#[derive(Debug)]
pub struct LocalCounter(AtomicUsize);

impl LocalCounter {
    /// Creates a counter whose first value is `start`.
    pub const fn new(start: usize) -> Self {
        LocalCounter(AtomicUsize::new(start))
    }
}

impl Default for LocalCounter {
    fn default() -> Self {
        LocalCounter::new(1)
    }
}

impl AliasCounter for LocalCounter {
    fn next(&self) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Identifies one scope (the root query, or a join) within an [`AliasRegistry`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeId(usize);

#[derive(Clone, Debug)]
struct Scope {
    alias: String,
    children: Vec<ScopeId>,
}

/// The tree of scopes of a single query, rooted at the top-level `SELECT`.
/// Every scope owns one alias, and aliases are unique across the tree.
#[derive(Clone, Debug)]
pub struct AliasRegistry {
    counter: Arc<dyn AliasCounter>,
    scopes: Vec<Scope>,
}

impl AliasRegistry {
    /// The identifier of the root scope.
    pub const ROOT: ScopeId = ScopeId(0);

    /// Creates a registry whose root scope is aliased `root_alias`
    /// (lowercased), using the process-wide counter.
    pub fn new(root_alias: &str) -> Self {
        AliasRegistry::with_counter(root_alias, Arc::new(GlobalCounter))
    }

    /// Creates a registry with an explicitly provided counter.
    pub fn with_counter(root_alias: &str, counter: Arc<dyn AliasCounter>) -> Self {
        AliasRegistry {
            counter,
            scopes: vec![Scope {
                alias: root_alias.to_lowercase(),
                children: Vec::new(),
            }],
        }
    }

    /// Replaces the counter used for subsequent allocations.
    pub fn set_counter(&mut self, counter: Arc<dyn AliasCounter>) {
        self.counter = counter;
    }

    /// The alias of the given scope.
    pub fn alias(&self, scope: ScopeId) -> &str {
        &self.scopes[scope.0].alias
    }

    /// Adds a new scope nested in `parent`, aliased after `proposal`.
    ///
    /// The proposal is lowercased. As long as it collides with an alias
    /// anywhere in the tree, it is suffixed with the next value of the
    /// counter and checked again.
    pub fn allocate(&mut self, parent: ScopeId, proposal: &str) -> (ScopeId, String) {
        let base = proposal.to_lowercase();
        let mut alias = base.clone();

        while self.is_taken(AliasRegistry::ROOT, &alias) {
            let suffix = self.counter.next();
            tracing::debug!(proposal = %base, taken = %alias, suffix, "table alias collision");
            alias = format!("{base}{suffix}");
        }

        let id = ScopeId(self.scopes.len());

        self.scopes.push(Scope {
            alias: alias.clone(),
            children: Vec::new(),
        });
        self.scopes[parent.0].children.push(id);

        (id, alias)
    }

    /// Depth-first search for `alias` in the subtree rooted at `scope`.
    fn is_taken(&self, scope: ScopeId, alias: &str) -> bool {
        let node = &self.scopes[scope.0];

        node.alias == alias || node.children.iter().any(|&child| self.is_taken(child, alias))
    }
}

impl Default for AliasRegistry {
    fn default() -> Self {
        AliasRegistry::new("")
    }
}
