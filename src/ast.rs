//! Abstract syntax tree produced by [`crate::parser`].
//!
//! Nodes own their tokens and never change after construction.  Function
//! declarations sit behind `Rc` so runtime closures can share them with the
//! tree without copying bodies.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::token::{Token, TokenType};
use crate::value::format_number;

/// Identity of a variable‑referencing node (`Variable`, `Assign`, `This`,
/// `Super`).  The resolver records hop distances against it.
///
/// Ids come from a process‑wide counter so nodes parsed from different REPL
/// lines never collide in the interpreter's locals table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ExprId(usize);

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

impl ExprId {
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Lower bound of every id handed out from now on.
    pub fn watermark() -> Self {
        ExprId(NEXT_EXPR_ID.load(Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes, escapes decoded.
    Str(String),

    True,

    False,

    Nil,
}

/// One `key: value` entry of an object literal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectEntry {
    pub key: Token,
    pub value: Expr,
}

impl ObjectEntry {
    /// Field name the key denotes: identifiers by lexeme, strings decoded,
    /// numbers in canonical form.
    pub fn key_name(&self) -> String {
        match &self.key.token_type {
            TokenType::STRING(k) => k.clone(),
            TokenType::NUMBER(n) => format_number(*n),
            _ => self.key.lexeme.clone(),
        }
    }
}

/// **AST node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Prefix unary operator expression: `!isReady`, `-42`.
    Unary { operator: Token, right: Box<Expr> },

    /// Infix binary operator expression: `a + b`, `x <= y`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Variable access.
    Variable { id: ExprId, name: Token },

    /// `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Function‑, method‑ or constructor call.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token, retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// object[index]
    Index {
        object: Box<Expr>,
        bracket: Token,
        index: Box<Expr>,
    },

    /// object[index] = value
    IndexSet {
        object: Box<Expr>,
        bracket: Token,
        index: Box<Expr>,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: Token },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    /// Anonymous function literal: `fun (a, b) { ... }`.
    Function(Rc<FunctionDecl>),

    /// `[a, b, c]`
    Array { bracket: Token, elements: Vec<Expr> },

    /// `{ key: value, ... }`
    Object { brace: Token, entries: Vec<ObjectEntry> },
}

/// A named or anonymous function: parameters plus body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    /// `None` for anonymous functions.
    pub name: Option<Token>,

    /// The `fun` keyword or method name, for error locations.
    pub keyword: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

impl FunctionDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_ref().map_or("lambda", |n| n.lexeme.as_str())
    }
}

/// `class Name < Super1, Super2 { methods }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDecl {
    pub name: Token,

    /// Superclass references in declaration order; each is an `Expr::Variable`.
    pub superclasses: Vec<Expr>,

    pub methods: Vec<Rc<FunctionDecl>>,
}

/// One `name = initializer` clause of a `var` statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarDeclarator {
    pub name: Token,
    pub initializer: Option<Expr>,
}

/// **AST node** for *statements*.  A program is a sequence of these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// `var a = 1, b;`
    Var(Vec<VarDeclarator>),

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop; `for` loops are desugared into this.
    While { condition: Expr, body: Box<Stmt> },

    /// Function declaration ‑ becomes a first‑class callable value.
    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Class(ClassDecl),
}

// ── closure detection ──────────────────────────────────────────────────────

impl Expr {
    /// Whether evaluating this expression can create a function value that
    /// keeps its body's nodes alive past the current line.
    pub fn creates_closure(&self) -> bool {
        match self {
            Expr::Function(_) => true,

            Expr::Literal(_) | Expr::Variable { .. } | Expr::This { .. } | Expr::Super { .. } => {
                false
            }

            Expr::Grouping(inner) => inner.creates_closure(),

            Expr::Unary { right, .. } => right.creates_closure(),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                left.creates_closure() || right.creates_closure()
            }

            Expr::Assign { value, .. } => value.creates_closure(),

            Expr::Call {
                callee, arguments, ..
            } => callee.creates_closure() || arguments.iter().any(Expr::creates_closure),

            Expr::Get { object, .. } => object.creates_closure(),

            Expr::Set { object, value, .. } => object.creates_closure() || value.creates_closure(),

            Expr::Index { object, index, .. } => object.creates_closure() || index.creates_closure(),

            Expr::IndexSet {
                object,
                index,
                value,
                ..
            } => object.creates_closure() || index.creates_closure() || value.creates_closure(),

            Expr::Array { elements, .. } => elements.iter().any(Expr::creates_closure),

            Expr::Object { entries, .. } => entries.iter().any(|e| e.value.creates_closure()),
        }
    }
}

impl Stmt {
    /// Whether executing this statement can create a function or class.
    pub fn creates_closure(&self) -> bool {
        match self {
            Stmt::Function(_) | Stmt::Class(_) => true,

            Stmt::Expression(expr) | Stmt::Print(expr) => expr.creates_closure(),

            Stmt::Var(declarators) => declarators
                .iter()
                .filter_map(|d| d.initializer.as_ref())
                .any(Expr::creates_closure),

            Stmt::Block(statements) => statements.iter().any(Stmt::creates_closure),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.creates_closure()
                    || then_branch.creates_closure()
                    || else_branch.as_ref().is_some_and(|b| b.creates_closure())
            }

            Stmt::While { condition, body } => condition.creates_closure() || body.creates_closure(),

            Stmt::Return { value, .. } => value.as_ref().is_some_and(Expr::creates_closure),
        }
    }
}
