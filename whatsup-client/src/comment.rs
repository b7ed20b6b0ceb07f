use std::{
    collections::{hash_map, HashMap},
    fmt,
};

use crate::api::{Comment, CommentId};

pub struct CommentNode {
    pub comment: Comment,

    /// Replies, in the order the server returned them
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn id(&self) -> CommentId {
        self.comment.id
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Pre-order traversal of this node and its replies, this node being at
    /// depth 0
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self)],
        }
    }
}

// Reply chains can be arbitrarily deep, so everything below goes through
// `Walk` or an explicit stack instead of the recursive derived impls

impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

fn same_shape(a: Walk<'_>, b: Walk<'_>) -> bool {
    a.map(|(d, n)| (d, &n.comment))
        .eq(b.map(|(d, n)| (d, &n.comment)))
}

fn debug_walk(walk: Walk<'_>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list()
        .entries(walk.map(|(d, n)| (d, &n.comment)))
        .finish()
}

impl PartialEq for CommentNode {
    fn eq(&self, other: &CommentNode) -> bool {
        same_shape(self.walk(), other.walk())
    }
}

impl Eq for CommentNode {}

impl fmt::Debug for CommentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_walk(self.walk(), f)
    }
}

/// Top-level comments with their replies nested below them
#[derive(Default)]
pub struct Forest {
    roots: Vec<CommentNode>,
    len: usize,
}

impl Forest {
    pub fn roots(&self) -> &[CommentNode] {
        &self.roots
    }

    /// Total number of nodes, replies included
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pre-order traversal yielding each node along with its depth, roots
    /// being at depth 0
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.roots.iter().rev().map(|n| (0, n)).collect(),
        }
    }

    pub fn find(&self, id: CommentId) -> Option<&CommentNode> {
        self.walk().map(|(_, n)| n).find(|n| n.id() == id)
    }
}

impl PartialEq for Forest {
    fn eq(&self, other: &Forest) -> bool {
        self.len == other.len && same_shape(self.walk(), other.walk())
    }
}

impl Eq for Forest {}

impl fmt::Debug for Forest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_walk(self.walk(), f)
    }
}

pub struct Walk<'a> {
    stack: Vec<(usize, &'a CommentNode)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a CommentNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|c| (depth + 1, c)));
        Some((depth, node))
    }
}

/// Rebuilds the reply tree from the flat list returned by the server
///
/// Roots and siblings keep the order of `records`. Every record ends up in
/// exactly one place:
/// - a record whose parent is not in `records` becomes a root
/// - records that cannot be reached from a root because their parent links
///   loop are cut from their parent, first one in input order first, until
///   everything is reachable
/// - if two records share an id, replies attach to the first one
pub fn build_forest(records: &[Comment]) -> Forest {
    let n = records.len();

    let mut index = HashMap::with_capacity(n);
    for (i, c) in records.iter().enumerate() {
        match index.entry(c.id) {
            hash_map::Entry::Vacant(e) => {
                e.insert(i);
            }
            hash_map::Entry::Occupied(_) => {
                tracing::warn!(comment=?c.id, "duplicate comment id in server answer")
            }
        }
    }

    let mut parent = records
        .iter()
        .map(|c| {
            let p = c.parent_id?;
            match index.get(&p) {
                Some(&p) => Some(p),
                None => {
                    tracing::warn!(comment=?c.id, parent=?p, "parent not loaded, showing reply at top level");
                    None
                }
            }
        })
        .collect::<Vec<Option<usize>>>();

    let mut children = vec![Vec::new(); n];
    for (i, p) in parent.iter().enumerate() {
        if let Some(p) = p {
            children[*p].push(i);
        }
    }

    let mut reached = vec![false; n];
    let mut stack = (0..n).filter(|&i| parent[i].is_none()).collect::<Vec<_>>();
    mark_reachable(&mut stack, &children, &mut reached);
    for i in 0..n {
        if reached[i] {
            continue;
        }
        if let Some(p) = parent[i].take() {
            tracing::warn!(comment=?records[i].id, parent=?records[p].id, "cutting reply cycle");
            children[p].retain(|&c| c != i);
        }
        stack.push(i);
        mark_reachable(&mut stack, &children, &mut reached);
    }

    let roots = (0..n).filter(|&i| parent[i].is_none()).collect::<Vec<_>>();

    // Pre-order, so that walking it backwards builds children before parents
    let mut order = Vec::with_capacity(n);
    let mut stack = roots.clone();
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(children[i].iter().copied());
    }

    let mut built = (0..n).map(|_| None).collect::<Vec<Option<CommentNode>>>();
    for &i in order.iter().rev() {
        let kids = children[i]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[i] = Some(CommentNode {
            comment: records[i].clone(),
            children: kids,
        });
    }

    Forest {
        roots: roots.iter().filter_map(|&i| built[i].take()).collect(),
        len: n,
    }
}

fn mark_reachable(stack: &mut Vec<usize>, children: &[Vec<usize>], reached: &mut [bool]) {
    while let Some(i) = stack.pop() {
        reached[i] = true;
        stack.extend(children[i].iter().copied().filter(|&c| !reached[c]));
    }
}
