//! Diagnostic dump of an expression tree.
//!
//! Every expression renders itself into a nested named node with string
//! attributes; tooling gets structure, humans get the indented rendering.
//! This is independent of evaluation and has no semantic weight.

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainNode {
    pub name: &'static str,
    pub attributes: Vec<(&'static str, String)>,
    pub children: Vec<ExplainNode>,
}

impl ExplainNode {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn attr(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.attributes.push((key, value.to_string()));
        self
    }

    #[must_use]
    pub fn child(mut self, child: ExplainNode) -> Self {
        self.children.push(child);
        self
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            f.write_str("  ")?;
        }
        f.write_str(self.name)?;
        for (k, v) in &self.attributes {
            write!(f, " {k}={v:?}")?;
        }
        writeln!(f)?;
        for c in &self.children {
            c.render(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExplainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_with_attributes() {
        let tree = ExplainNode::new("slash")
            .child(ExplainNode::new("axis").attr("axis", "child"))
            .child(ExplainNode::new("literal").attr("value", "()"));
        let s = tree.to_string();
        assert!(s.starts_with("slash\n"));
        assert!(s.contains("  axis axis=\"child\"\n"));
        assert!(s.contains("  literal value=\"()\"\n"));
    }
}
