//! Parse tree
//!
//! The parser builds a homogeneous node tree: each node carries the token
//! that produced it, the token's source text, and its children. Operator
//! nodes hold their operands as children (unary: one child; binary: left
//! then right); statement nodes hold their parts in grammar order.

use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub token: Token,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(token: Token) -> Self {
        Node {
            token,
            children: Vec::new(),
        }
    }

    pub fn with_children(token: Token, children: Vec<Node>) -> Self {
        Node { token, children }
    }

    pub fn kind(&self) -> TokenKind {
        self.token.kind
    }

    pub fn line(&self) -> usize {
        self.token.line
    }

    /// Render the tree for debugging, one node per line, indented by depth.
    pub fn dump(&self, depth: usize) -> String {
        let mut out = String::new();
        self.dump_into(depth, &mut out);
        out
    }

    fn dump_into(&self, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(self.token.kind.name());
        if !self.token.text.is_empty() {
            out.push_str(": ");
            out.push_str(&self.token.text);
        }
        out.push('\n');
        for child in &self.children {
            child.dump_into(depth + 1, out);
        }
    }
}

/// A parsed program: top-level statements in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTree {
    pub statements: Vec<Node>,
}
