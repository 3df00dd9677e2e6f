//! Window tree search and class-hint matching.
//!
//! The display server exposes windows as a tree rooted at the screen's root
//! window.  Locating the target means walking that tree until a window's
//! class hint matches the user's query.
//!
//! The walk is iterative: an explicit stack holds the nodes still to visit,
//! so a deeply nested hierarchy cannot overflow the call stack.  Children are
//! pushed in reverse so they pop in enumeration order, which keeps the visit
//! order identical to a recursive pre-order traversal.  The first match in
//! that order wins.

/// Result of a [`depth_first_find`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeSearch<N> {
    /// The first matching node in pre-order, if any.
    pub found: Option<N>,
    /// How many nodes were tested before the search stopped.
    pub visited: usize,
}

/// Finds the first node in pre-order for which `is_match` returns `true`.
///
/// `children` returns a node's children in enumeration order.  A node whose
/// children cannot be listed should return an empty collection; that subtree
/// is then skipped and the walk continues with the node's siblings.
///
/// Each node is tested at most once, so a tree of `n` nodes is searched in
/// `O(n)` steps.
pub fn depth_first_find<N, C, I, M>(root: N, mut children: C, mut is_match: M) -> TreeSearch<N>
where
    N: Copy,
    C: FnMut(N) -> I,
    I: IntoIterator<Item = N>,
    M: FnMut(N) -> bool,
{
    let mut stack = vec![root];
    let mut visited = 0;

    while let Some(node) = stack.pop() {
        visited += 1;
        if is_match(node) {
            return TreeSearch { found: Some(node), visited };
        }
        let start = stack.len();
        stack.extend(children(node));
        stack[start..].reverse();
    }

    TreeSearch { found: None, visited }
}

/// Returns `true` if any class-hint string contains `query`, ignoring case.
///
/// An empty query matches nothing; otherwise every window on screen would
/// match and the root window would always win.
pub fn class_hint_matches<S: AsRef<str>>(class_hint: &[S], query: &str) -> bool {
    if query.is_empty() {
        return false;
    }
    let needle = query.to_lowercase();
    class_hint
        .iter()
        .any(|value| value.as_ref().to_lowercase().contains(&needle))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
