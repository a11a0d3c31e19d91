//! Tree display utilities for query trees.

use std::fmt;

/// A node in a display tree.
///
/// Nodes are handed out by value so that arena-backed trees can expose
/// lightweight views instead of references into their storage.
pub trait TreeNode: Sized {
    /// Get the display name of this node.
    fn name(&self) -> String;

    /// Get child nodes, in display order.
    fn children(&self) -> Vec<Self>;

    /// Get additional details to display.
    fn details(&self) -> Option<String> {
        None
    }

    /// Label printed before the name, e.g. an argument position.
    fn label(&self) -> Option<String> {
        None
    }
}

/// Helper for displaying tree structures.
pub struct DisplayTree<N: TreeNode> {
    root: N,
}

impl<N: TreeNode> DisplayTree<N> {
    /// Create a new display tree.
    pub fn new(root: N) -> Self {
        Self { root }
    }

    fn fmt_line(f: &mut fmt::Formatter<'_>, node: &N) -> fmt::Result {
        if let Some(label) = node.label() {
            write!(f, "[{label}] ")?;
        }
        write!(f, "{}", node.name())?;
        if let Some(details) = node.details() {
            write!(f, " ({details})")?;
        }
        writeln!(f)
    }

    fn fmt_node(f: &mut fmt::Formatter<'_>, node: &N, prefix: &str, is_last: bool) -> fmt::Result {
        let connector = if is_last { "└─ " } else { "├─ " };
        write!(f, "{prefix}{connector}")?;
        Self::fmt_line(f, node)?;

        let children = node.children();
        let child_prefix = format!("{prefix}{}", if is_last { "   " } else { "│  " });

        for (i, child) in children.iter().enumerate() {
            Self::fmt_node(f, child, &child_prefix, i == children.len() - 1)?;
        }

        Ok(())
    }
}

impl<N: TreeNode> fmt::Display for DisplayTree<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::fmt_line(f, &self.root)?;

        let children = self.root.children();
        for (i, child) in children.iter().enumerate() {
            Self::fmt_node(f, child, "", i == children.len() - 1)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct TestNode {
        name: String,
        label: Option<&'static str>,
        children: Vec<TestNode>,
    }

    impl TestNode {
        fn leaf(name: &str, label: Option<&'static str>) -> Self {
            Self {
                name: name.to_string(),
                label,
                children: vec![],
            }
        }
    }

    impl TreeNode for TestNode {
        fn name(&self) -> String {
            self.name.clone()
        }

        fn children(&self) -> Vec<Self> {
            self.children.clone()
        }

        fn label(&self) -> Option<String> {
            self.label.map(str::to_string)
        }
    }

    #[test]
    fn test_display_tree() {
        let tree = TestNode {
            name: "LJ".to_string(),
            label: None,
            children: vec![
                TestNode::leaf("R(m,n,o1)", Some("LEFT")),
                TestNode::leaf("R(m,n1,o)", Some("RIGHT")),
            ],
        };

        let output = DisplayTree::new(tree).to_string();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "LJ");
        assert_eq!(lines[1], "├─ [LEFT] R(m,n,o1)");
        assert_eq!(lines[2], "└─ [RIGHT] R(m,n1,o)");
    }
}
