//! Syntax tree produced by the [`Parser`](crate::parser::Parser).
//!
//! Expressions and statements are closed sum types; every later pass
//! (resolver, interpreter, printer) is one exhaustive `match` per node kind.
//!
//! Nodes that name a binding (`Variable`, `Assign`, `This`, `Super`) carry an
//! [`ExprId`].  The resolver keys its hop‑distance table by that id, so two
//! structurally identical expressions at different places in the program
//! resolve independently.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

/// Stable identity of a binding expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub usize);

impl ExprId {
    /// Allocates an id unique for the lifetime of the process, so trees parsed
    /// from separate REPL lines never collide in one interpreter.
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// Every kind of *expression* in Lox.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    Literal(LiteralValue),

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr<'a>>),

    /// Prefix `!` or `-`.
    Unary {
        operator: Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Arithmetic, comparison and equality operators.
    Binary {
        left: Box<Expr<'a>>,
        operator: Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr<'a>>,
        operator: Token<'a>,
        right: Box<Expr<'a>>,
    },

    Variable {
        id: ExprId,
        name: Token<'a>,
    },

    Assign {
        id: ExprId,
        name: Token<'a>,
        value: Box<Expr<'a>>,
    },

    Call {
        callee: Box<Expr<'a>>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token<'a>,
        arguments: Vec<Expr<'a>>,
    },

    /// `object.name`
    Get {
        object: Box<Expr<'a>>,
        name: Token<'a>,
    },

    /// `object.name = value`
    Set {
        object: Box<Expr<'a>>,
        name: Token<'a>,
        value: Box<Expr<'a>>,
    },

    This {
        id: ExprId,
        keyword: Token<'a>,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token<'a>,
        method: Token<'a>,
    },
}

/// A function or method declaration.  Shared between the tree and every
/// runtime closure created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl<'a> {
    pub name: Token<'a>,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token<'a>>,

    pub body: Vec<Stmt<'a>>,
}

/// Complete executable constructs.  A program is a sequence of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt<'a> {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr<'a>),

    Print(Expr<'a>),

    /// `"var" IDENT ("=" initializer)? ";"`
    Var {
        name: Token<'a>,
        initializer: Option<Expr<'a>>,
    },

    Block(Vec<Stmt<'a>>),

    If {
        condition: Expr<'a>,
        then_branch: Box<Stmt<'a>>,
        else_branch: Option<Box<Stmt<'a>>>,
    },

    /// `while` loop; `for` loops are desugared into this by the parser.
    While {
        condition: Expr<'a>,
        body: Box<Stmt<'a>>,
    },

    Function(Rc<FunctionDecl<'a>>),

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token<'a>,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr<'a>>,
    },

    Class {
        name: Token<'a>,

        /// Always an [`Expr::Variable`] when present.
        superclass: Option<Expr<'a>>,

        methods: Vec<Rc<FunctionDecl<'a>>>,
    },
}
