//! Recursive-descent parser
//!
//! Pulls tokens from the lexer and builds the node tree. Statements are
//! line-oriented; newlines between statements are skipped, newlines inside
//! an expression end it.
//!
//! Precedence, tightest first: unary, `* / % **`, `+ -`, `<< >>`,
//! `< <= > >=`, `== != $= $!`, `&`, `^`, `|`, `&&`, `||`.

use crate::ast::{Node, NodeTree};
use crate::error::CompileError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Lex the whole source up front and position at the first token.
    pub fn new(source: &str) -> Result<Self, CompileError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Parser { tokens, pos: 0 })
    }

    /// Parse a whole program: statements until end of input.
    pub fn parse(&mut self) -> Result<NodeTree, CompileError> {
        let mut tree = NodeTree::default();
        loop {
            self.skip_newlines();
            if self.current().kind == TokenKind::Eof {
                return Ok(tree);
            }
            tree.statements.push(self.parse_stat()?);
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while self.current().kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, CompileError> {
        if self.current().kind == kind {
            Ok(self.advance())
        } else {
            Err(CompileError::ExpectedToken {
                expected,
                line: self.current().line,
            })
        }
    }

    /// One of the many statement forms.
    pub fn parse_stat(&mut self) -> Result<Node, CompileError> {
        self.skip_newlines();
        match self.current().kind {
            TokenKind::If => self.parse_if_stat(),
            TokenKind::While => self.parse_while_stat(),
            TokenKind::Do => self.parse_do_while_stat(),
            TokenKind::For => self.parse_for_stat(),
            TokenKind::LeftBrace => self.parse_compound_stat(),
            TokenKind::Break | TokenKind::Continue => Ok(Node::new(self.advance())),
            TokenKind::Return => self.parse_return(),
            TokenKind::Var => self.parse_var_stat(),
            TokenKind::Identifier => self.parse_assign(),
            // Anything that can begin an expression is an expression
            // statement (the REPL lives on these).
            TokenKind::Int
            | TokenKind::Float
            | TokenKind::Char
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::LeftParen
            | TokenKind::Add
            | TokenKind::Sub
            | TokenKind::Not
            | TokenKind::Inc
            | TokenKind::Dec
            | TokenKind::BinNot => self.parse_expr(),
            _ => Err(CompileError::ExpectedStatement {
                line: self.current().line,
            }),
        }
    }

    /// if / -expr / -statement / -[else statement]
    fn parse_if_stat(&mut self) -> Result<Node, CompileError> {
        let mut node = Node::new(self.advance());
        node.children.push(self.parse_expr()?);
        node.children.push(self.parse_stat()?);
        self.skip_newlines();
        if self.current().kind == TokenKind::Else {
            self.advance();
            node.children.push(self.parse_stat()?);
        }
        Ok(node)
    }

    /// while / -expr / -statement
    fn parse_while_stat(&mut self) -> Result<Node, CompileError> {
        let mut node = Node::new(self.advance());
        node.children.push(self.parse_expr()?);
        node.children.push(self.parse_stat()?);
        Ok(node)
    }

    /// do / -statement / -expr (the trailing `while` condition)
    fn parse_do_while_stat(&mut self) -> Result<Node, CompileError> {
        let mut node = Node::new(self.advance());
        node.children.push(self.parse_stat()?);
        self.skip_newlines();
        self.expect(TokenKind::While, "'while' keyword")?;
        node.children.push(self.parse_expr()?);
        Ok(node)
    }

    /// for / -identifier / -expr / -statement
    fn parse_for_stat(&mut self) -> Result<Node, CompileError> {
        let mut node = Node::new(self.advance());
        let identifier = self.expect(TokenKind::Identifier, "an identifier")?;
        node.children.push(Node::new(identifier));
        self.expect(TokenKind::In, "the 'in' keyword")?;
        node.children.push(self.parse_expr()?);
        node.children.push(self.parse_stat()?);
        Ok(node)
    }

    /// { stat* }
    fn parse_compound_stat(&mut self) -> Result<Node, CompileError> {
        let mut node = Node::new(self.advance());
        loop {
            self.skip_newlines();
            if self.current().kind == TokenKind::RightBrace {
                self.advance();
                return Ok(node);
            }
            if self.current().kind == TokenKind::Eof {
                return Err(CompileError::ExpectedToken {
                    expected: "'}'",
                    line: self.current().line,
                });
            }
            node.children.push(self.parse_stat()?);
        }
    }

    /// return / -expr
    fn parse_return(&mut self) -> Result<Node, CompileError> {
        let mut node = Node::new(self.advance());
        node.children.push(self.parse_expr()?);
        Ok(node)
    }

    /// var declaration: `var x = expr` parses to the same assignment shape
    /// as a bare `x = expr`.
    fn parse_var_stat(&mut self) -> Result<Node, CompileError> {
        self.advance();
        if self.current().kind != TokenKind::Identifier {
            return Err(CompileError::ExpectedToken {
                expected: "an identifier",
                line: self.current().line,
            });
        }
        self.parse_assign()
    }

    /// Assignment: the assign operator is the root, the identifier and the
    /// expression are its children.
    fn parse_assign(&mut self) -> Result<Node, CompileError> {
        let identifier = Node::new(self.advance());
        let op = match self.current().kind {
            TokenKind::Assign
            | TokenKind::AddAssign
            | TokenKind::SubAssign
            | TokenKind::MulAssign
            | TokenKind::DivAssign
            | TokenKind::ModAssign
            | TokenKind::ExpAssign => self.advance(),
            _ => {
                return Err(CompileError::ExpectedAssignment {
                    line: self.current().line,
                });
            }
        };
        let expr = self.parse_expr()?;
        Ok(Node::with_children(op, vec![identifier, expr]))
    }

    pub fn parse_expr(&mut self) -> Result<Node, CompileError> {
        self.parse_or_expr()
    }

    fn parse_binary<F>(
        &mut self,
        operators: &[TokenKind],
        mut next: F,
    ) -> Result<Node, CompileError>
    where
        F: FnMut(&mut Self) -> Result<Node, CompileError>,
    {
        let mut node = next(self)?;
        while operators.contains(&self.current().kind) {
            let op = self.advance();
            let rhs = next(self)?;
            node = Node::with_children(op, vec![node, rhs]);
        }
        Ok(node)
    }

    fn parse_or_expr(&mut self) -> Result<Node, CompileError> {
        self.parse_binary(&[TokenKind::Or], Self::parse_and_expr)
    }

    fn parse_and_expr(&mut self) -> Result<Node, CompileError> {
        self.parse_binary(&[TokenKind::And], Self::parse_bit_or_expr)
    }

    fn parse_bit_or_expr(&mut self) -> Result<Node, CompileError> {
        self.parse_binary(&[TokenKind::BinOr], Self::parse_bit_xor_expr)
    }

    fn parse_bit_xor_expr(&mut self) -> Result<Node, CompileError> {
        self.parse_binary(&[TokenKind::BinXor], Self::parse_bit_and_expr)
    }

    fn parse_bit_and_expr(&mut self) -> Result<Node, CompileError> {
        self.parse_binary(&[TokenKind::BinAnd], Self::parse_equality_expr)
    }

    fn parse_equality_expr(&mut self) -> Result<Node, CompileError> {
        self.parse_binary(
            &[
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::StrlenEqual,
                TokenKind::StrlenNotEqual,
            ],
            Self::parse_relational_expr,
        )
    }

    fn parse_relational_expr(&mut self) -> Result<Node, CompileError> {
        self.parse_binary(
            &[
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
            ],
            Self::parse_shift_expr,
        )
    }

    fn parse_shift_expr(&mut self) -> Result<Node, CompileError> {
        self.parse_binary(&[TokenKind::Shl, TokenKind::Shr], Self::parse_additive_expr)
    }

    fn parse_additive_expr(&mut self) -> Result<Node, CompileError> {
        self.parse_binary(&[TokenKind::Add, TokenKind::Sub], Self::parse_mult_expr)
    }

    fn parse_mult_expr(&mut self) -> Result<Node, CompileError> {
        self.parse_binary(
            &[
                TokenKind::Mul,
                TokenKind::Div,
                TokenKind::Mod,
                TokenKind::Exp,
            ],
            Self::parse_unary_expr,
        )
    }

    fn parse_unary_expr(&mut self) -> Result<Node, CompileError> {
        match self.current().kind {
            TokenKind::Add
            | TokenKind::Sub
            | TokenKind::Not
            | TokenKind::Inc
            | TokenKind::Dec
            | TokenKind::BinNot => {
                let op = self.advance();
                let operand = self.parse_unary_expr()?;
                Ok(Node::with_children(op, vec![operand]))
            }
            _ => self.parse_primary_expr(),
        }
    }

    /// Member access chains: `a.b.c`.
    fn parse_primary_expr(&mut self) -> Result<Node, CompileError> {
        let mut node = self.parse_single_expr()?;
        while self.current().kind == TokenKind::Dot {
            let op = self.advance();
            let member = self.parse_single_expr()?;
            node = Node::with_children(op, vec![node, member]);
        }
        Ok(node)
    }

    /// A literal, identifier, or parenthesized expression.
    fn parse_single_expr(&mut self) -> Result<Node, CompileError> {
        match self.current().kind {
            TokenKind::Int
            | TokenKind::Float
            | TokenKind::Char
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::Identifier => Ok(Node::new(self.advance())),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(inner)
            }
            _ => Err(CompileError::ExpectedExpression {
                line: self.current().line,
            }),
        }
    }
}
