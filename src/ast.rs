//! **Abstract‑Syntax‑Tree** for the Demon language.
//!
//! Two closed node families, [`Expr`] and [`Stmt`].  Nodes are immutable once
//! the parser has built them and own their children.  The nodes the resolver
//! annotates (`Variable`, `Assign`, `This`, `Super`) carry an [`ExprId`]; the
//! interpreter's side‑table is keyed by that id, never by structural equality.
//! Function and lambda declarations sit behind `Rc` so that closures can share
//! them with the tree without copying bodies.

use std::rc::Rc;

use serde::Serialize;

use crate::token::Token;

/// Identity of a resolvable expression node.  Unique within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(pub usize);

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    Number(f64),
    Str(String),
    True,
    False,
    Nil,
}

/// A parameter with its optional (unchecked) type annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: Token,
    pub annotation: Option<Token>,
}

/// Named function or method declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Param>,
    pub return_type: Option<Token>,
    pub body: Vec<Stmt>,
}

/// Anonymous `func (…) { … }` expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LambdaDecl {
    /// The `func` keyword, for error locations.
    pub keyword: Token,
    pub params: Vec<Param>,
    pub return_type: Option<Token>,
    pub body: Vec<Stmt>,
}

/// One `pattern => { … }` arm of a `match` expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchArm {
    pub pattern: Expr,
    pub body: Vec<Stmt>,
}

/// One `catch (Kind name) { … }` clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatchClause {
    /// The `catch` keyword.
    pub keyword: Token,
    /// Exception kind to match; `None` catches everything.
    pub kind: Option<Token>,
    /// Binding for the caught value; `None` binds `e`.
    pub name: Option<Token>,
    pub body: Vec<Stmt>,
}

/// Every kind of *expression* in Demon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// Infix arithmetic, comparison or equality: `a + b`, `x <= y`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    Literal(LiteralValue),

    /// Prefix `!` or `-`.
    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    Variable {
        id: ExprId,
        name: Token,
    },

    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        /// The closing `)` ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get {
        object: Box<Expr>,
        name: Token,
    },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    This {
        id: ExprId,
        keyword: Token,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    Lambda(Rc<LambdaDecl>),

    /// `[a, b, c]`
    ListLiteral {
        bracket: Token,
        elements: Vec<Expr>,
    },

    /// `{"key": value, …}`; keys are string tokens.
    MapLiteral {
        brace: Token,
        entries: Vec<(Token, Expr)>,
    },

    /// `start..end` (inclusive) or `start..<end` (exclusive).
    Range {
        start: Box<Expr>,
        operator: Token,
        end: Box<Expr>,
        inclusive: bool,
    },

    /// `match (value) { pattern => { … } default => { … } }`
    Match {
        keyword: Token,
        value: Box<Expr>,
        arms: Vec<MatchArm>,
        default: Option<Vec<Stmt>>,
    },

    /// `value |> callable`
    Pipeline {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// `do { … }` evaluating to its last expression statement.
    BlockExpr {
        keyword: Token,
        statements: Vec<Stmt>,
    },

    /// `object[index]`
    Subscript {
        object: Box<Expr>,
        bracket: Token,
        index: Box<Expr>,
    },

    /// `object[index] = value`
    SubscriptAssign {
        object: Box<Expr>,
        bracket: Token,
        index: Box<Expr>,
        value: Box<Expr>,
    },
}

/// Every kind of *statement*.  A program is a sequence of these nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print(a, b, …);`
    Print {
        keyword: Token,
        expressions: Vec<Expr>,
    },

    /// `let`/`var`/`const` declaration.
    Var {
        name: Token,
        annotation: Option<Token>,
        initializer: Option<Expr>,
        constant: bool,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    /// C‑style `for (init; cond; incr) body`.
    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },

    /// `for (let x in iterable) body`
    ForEach {
        variable: Token,
        iterable: Expr,
        body: Box<Stmt>,
    },

    Function(Rc<FunctionDecl>),

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    Break {
        keyword: Token,
    },

    Continue {
        keyword: Token,
    },

    Try {
        keyword: Token,
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },

    Throw {
        keyword: Token,
        value: Expr,
    },

    Class {
        name: Token,
        /// Always an `Expr::Variable` when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
        static_methods: Vec<Rc<FunctionDecl>>,
    },
}

impl Expr {
    /// Best‑effort source line of the expression, for diagnostics.
    pub fn line(&self) -> usize {
        match self {
            Expr::Binary { operator, .. }
            | Expr::Unary { operator, .. }
            | Expr::Logical { operator, .. }
            | Expr::Range { operator, .. }
            | Expr::Pipeline { operator, .. } => operator.line,

            Expr::Grouping(inner) => inner.line(),

            Expr::Literal(_) => 0,

            Expr::Variable { name, .. }
            | Expr::Assign { name, .. }
            | Expr::Get { name, .. }
            | Expr::Set { name, .. } => name.line,

            Expr::Call { paren, .. } => paren.line,

            Expr::This { keyword, .. }
            | Expr::Super { keyword, .. }
            | Expr::Match { keyword, .. }
            | Expr::BlockExpr { keyword, .. } => keyword.line,

            Expr::Lambda(decl) => decl.keyword.line,

            Expr::ListLiteral { bracket, .. }
            | Expr::Subscript { bracket, .. }
            | Expr::SubscriptAssign { bracket, .. } => bracket.line,

            Expr::MapLiteral { brace, .. } => brace.line,
        }
    }
}
