//! Static resolver pass.
//!
//! One walk over the AST that:
//! 1. Builds lexical scopes (stack of `HashMap<String, bool>` tracking
//!    declared/defined).
//! 2. Reports legality errors (`break` outside a loop, `return` at top level,
//!    `this`/`super` misuse, self‑inheritance, redeclaration, reading a local
//!    in its own initializer).
//! 3. Tells the interpreter, for each variable occurrence, whether it is a
//!    local (and at what depth) or a global.
//!
//! Errors do not stop the walk; every one found is handed to the reporter.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, LambdaDecl, Param, Stmt};
use crate::error::{DemonError, Reporter};
use crate::interpreter::Interpreter;
use crate::token::Token;

/// What kind of function body we are inside.  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
    Lambda,
}

/// What kind of class body we are inside.  Used to validate `this`/`super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'i> {
    interpreter: &'i mut Interpreter,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    in_loop: bool,
    errors: Vec<DemonError>,
}

impl<'i> Resolver<'i> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'i mut Interpreter) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            in_loop: false,
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements.  Returns `true` when no error was found.
    pub fn resolve(&mut self, statements: &[Stmt], reporter: &mut dyn Reporter) -> bool {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements);

        let ok = self.errors.is_empty();
        for error in self.errors.drain(..) {
            reporter.error(error);
        }

        info!("Resolve pass finished (ok={})", ok);

        ok
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Stmt::Var {
                name, initializer, ..
            } => {
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // The name is visible inside its own body.
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Expression(expr) => self.resolve_expr(expr),

            Stmt::Print { expressions, .. } => {
                for expr in expressions {
                    self.resolve_expr(expr);
                }
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_stmt) = else_branch.as_deref() {
                    self.resolve_stmt(else_stmt);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_loop_body(body);
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                // One scope around the whole loop; the body block adds its own.
                self.begin_scope();
                if let Some(init) = initializer.as_deref() {
                    self.resolve_stmt(init);
                }
                if let Some(cond) = condition {
                    self.resolve_expr(cond);
                }
                if let Some(incr) = increment {
                    self.resolve_expr(incr);
                }
                self.resolve_loop_body(body);
                self.end_scope();
            }

            Stmt::ForEach {
                variable,
                iterable,
                body,
            } => {
                self.resolve_expr(iterable);

                self.begin_scope();
                self.declare(variable);
                self.define(variable);
                self.resolve_loop_body(body);
                self.end_scope();
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(expr);
                }
            }

            Stmt::Break { keyword } => {
                if !self.in_loop {
                    self.error(keyword, "Can't use 'break' outside of a loop.");
                }
            }

            Stmt::Continue { keyword } => {
                if !self.in_loop {
                    self.error(keyword, "Can't use 'continue' outside of a loop.");
                }
            }

            Stmt::Try {
                body,
                catches,
                finally,
                ..
            } => {
                self.begin_scope();
                self.resolve_stmts(body);
                self.end_scope();

                for clause in catches {
                    self.begin_scope();
                    match &clause.name {
                        Some(name) => {
                            self.declare(name);
                            self.define(name);
                        }
                        None => self.define_name("e"),
                    }
                    self.resolve_stmts(&clause.body);
                    self.end_scope();
                }

                if let Some(statements) = finally {
                    self.begin_scope();
                    self.resolve_stmts(statements);
                    self.end_scope();
                }
            }

            Stmt::Throw { value, .. } => self.resolve_expr(value),

            Stmt::Class {
                name,
                superclass,
                methods,
                static_methods,
            } => self.resolve_class(name, superclass.as_ref(), methods, static_methods),
        }
    }

    fn resolve_loop_body(&mut self, body: &Stmt) {
        let enclosing = std::mem::replace(&mut self.in_loop, true);
        self.resolve_stmt(body);
        self.in_loop = enclosing;
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
        static_methods: &[Rc<FunctionDecl>],
    ) {
        debug!("Resolving class '{}'", name.lexeme);

        let enclosing_class = self.current_class;
        let enclosing_loop = std::mem::replace(&mut self.in_loop, false);
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(sup) = superclass {
            if let Expr::Variable { name: sup_name, .. } = sup {
                if sup_name.lexeme == name.lexeme {
                    self.error(sup_name, "A class can't inherit from itself.");
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(sup);

            self.begin_scope();
            self.define_name("super");
        }

        self.begin_scope();
        self.define_name("this");

        for method in methods {
            let kind = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind);
        }

        for method in static_methods {
            self.resolve_function(method, FunctionType::Method);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
        self.in_loop = enclosing_loop;
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) {
        debug!("Resolving function '{}' as {:?}", decl.name.lexeme, kind);

        self.resolve_callable(&decl.params, &decl.body, kind);
    }

    fn resolve_lambda(&mut self, decl: &LambdaDecl) {
        debug!("Resolving lambda at line {}", decl.keyword.line);

        self.resolve_callable(&decl.params, &decl.body, FunctionType::Lambda);
    }

    /// Parameters and body share one scope, matching the single environment
    /// a call creates.
    fn resolve_callable(&mut self, params: &[Param], body: &[Stmt], kind: FunctionType) {
        let enclosing_function = std::mem::replace(&mut self.current_function, kind);
        let enclosing_loop = std::mem::replace(&mut self.in_loop, false);

        self.begin_scope();
        for param in params {
            self.declare(&param.name);
            self.define(&param.name);
        }
        self.resolve_stmts(body);
        self.end_scope();

        self.current_function = enclosing_function;
        self.in_loop = enclosing_loop;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.error(name, "Can't read local variable in its own initializer.");
                    }
                }
                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Binary { left, right, .. }
            | Expr::Logical { left, right, .. }
            | Expr::Pipeline { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Range { start, end, .. } => {
                self.resolve_expr(start);
                self.resolve_expr(end);
            }

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Literal(_) => {}

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                        return;
                    }
                    ClassType::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                        return;
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(*id, keyword);
            }

            Expr::Lambda(decl) => self.resolve_lambda(decl),

            Expr::ListLiteral { elements, .. } => {
                for element in elements {
                    self.resolve_expr(element);
                }
            }

            Expr::MapLiteral { entries, .. } => {
                for (_, value) in entries {
                    self.resolve_expr(value);
                }
            }

            Expr::Match {
                value,
                arms,
                default,
                ..
            } => {
                self.resolve_expr(value);

                for arm in arms {
                    self.resolve_expr(&arm.pattern);
                    self.begin_scope();
                    self.resolve_stmts(&arm.body);
                    self.end_scope();
                }

                if let Some(body) = default {
                    self.begin_scope();
                    self.resolve_stmts(body);
                    self.end_scope();
                }
            }

            Expr::BlockExpr { statements, .. } => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Expr::Subscript { object, index, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
            }

            Expr::SubscriptAssign {
                object,
                index,
                value,
                ..
            } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
                self.resolve_expr(value);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Marks `name` declared in the innermost scope.  Globals are not tracked,
    /// so redeclaring one is allowed.
    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }

        scope.insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        self.define_name(&name.lexeme);
    }

    fn define_name(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    /// Records the distance to the innermost scope declaring `name`, or marks
    /// the reference global.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if scope.contains_key(&name.lexeme) {
                let depth = self.scopes.len() - 1 - i;
                debug!("'{}' resolved as local at depth {}", name.lexeme, depth);
                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("'{}' resolved as global", name.lexeme);
        self.interpreter.note_global(id);
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.errors.push(DemonError::resolve(token, message));
    }
}
