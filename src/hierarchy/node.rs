use derive_more::Display;

use crate::collections::Stack;

/// Index of a node inside the [`Hierarchy`] that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("#{_0}")]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<T> {
    value: T,
    child: Option<NodeId>,
    sibling: Option<NodeId>,
}

impl<T> Node<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            child: None,
            sibling: None,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// First child, if any.
    pub fn child(&self) -> Option<NodeId> {
        self.child
    }

    /// Next node sharing this node's parent, if any.
    pub fn sibling(&self) -> Option<NodeId> {
        self.sibling
    }
}

/// Read-only tree snapshot in left-child / right-sibling form.
///
/// The root always exists and is [`Hierarchy::root`]. Structure is only
/// extended while the snapshot is being built; afterwards the tree is never
/// mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Hierarchy<T> {
    pub fn with_root(value: T) -> Self {
        Self {
            nodes: vec![Node::new(value)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    pub fn value(&self, id: NodeId) -> &T {
        &self.node(id).value
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Appends `values` as children of `parent`, keeping their order.
    ///
    /// The first new node becomes `parent`'s child when it has none yet;
    /// every other node is linked as the sibling of the one before it.
    pub fn attach_children(
        &mut self,
        parent: NodeId,
        values: impl IntoIterator<Item = T>,
    ) -> Vec<NodeId> {
        let mut previous = self.children(parent).last();
        let mut attached = Vec::new();

        for value in values {
            let id = NodeId(self.nodes.len());
            self.nodes.push(Node::new(value));
            match previous {
                None => self.nodes[parent.0].child = Some(id),
                Some(prev) => self.nodes[prev.0].sibling = Some(id),
            }
            previous = Some(id);
            attached.push(id);
        }

        attached
    }

    /// Direct children of `id`, decoded from the sibling chain.
    pub fn children(&self, id: NodeId) -> Children<'_, T> {
        Children {
            hierarchy: self,
            next: self.node(id).child,
        }
    }

    /// Every node, parents before children, siblings in stored order.
    pub fn pre_order(&self) -> PreOrder<'_, T> {
        let pending = Stack::new();
        pending.push(self.root());
        PreOrder {
            hierarchy: self,
            pending,
        }
    }

    /// Every node, each one only after its whole subtree.
    pub fn post_order(&self) -> PostOrder<'_, T> {
        PostOrder {
            hierarchy: self,
            ancestors: Stack::new(),
            cursor: Some(self.root()),
        }
    }
}

pub struct Children<'a, T> {
    hierarchy: &'a Hierarchy<T>,
    next: Option<NodeId>,
}

impl<T> Iterator for Children<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.hierarchy.node(current).sibling;
        Some(current)
    }
}

pub struct PreOrder<'a, T> {
    hierarchy: &'a Hierarchy<T>,
    pending: Stack<NodeId>,
}

impl<T> Iterator for PreOrder<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.pending.pop()?;
        let children = self.hierarchy.children(current).collect::<Vec<_>>();
        for child in children.into_iter().rev() {
            self.pending.push(child);
        }
        Some(current)
    }
}

/// Iterative post-order walk over the left-child / right-sibling links.
///
/// Descends through `child` links pushing every node on the way down. When a
/// node has no unvisited child left it is popped and yielded, and the walk
/// continues into its `sibling`. A node therefore comes out after its entire
/// child chain, and the parent is popped once its last sibling is done.
pub struct PostOrder<'a, T> {
    hierarchy: &'a Hierarchy<T>,
    ancestors: Stack<NodeId>,
    cursor: Option<NodeId>,
}

impl<T> Iterator for PostOrder<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.cursor {
                Some(current) => {
                    self.ancestors.push(current);
                    self.cursor = self.hierarchy.node(current).child;
                }
                None => {
                    let done = self.ancestors.pop()?;
                    self.cursor = self.hierarchy.node(done).sibling;
                    return Some(done);
                }
            }
        }
    }
}
