//! Tree‑walking evaluator.
//!
//! Statements produce a [`Flow`] describing how control leaves them; fatal
//! faults travel separately as `Err(RuntimeError)` and are never intercepted
//! by `try`.  Expressions produce a value or an [`Unwind`], which a statement
//! boundary turns back into a `Flow` or a fault.
//!
//! Variable references are looked up at the scope distance the resolver
//! recorded for their [`ExprId`]; a reference without an entry is global.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error;

use crate::ast::{Expr, ExprId, LiteralValue, Param, Stmt};
use crate::builtins;
use crate::environment::Environment;
use crate::error::Reporter;
use crate::token::{Literal, Token, TokenType};
use crate::value::{
    format_number, Callable, Class, Function, Instance, Lambda, Native, TraceEntry,
    UserException, Value,
};

const SCRIPT_FRAME: &str = "<script>";

/// Upper bound on the number of elements a range literal may produce.
const MAX_RANGE_LEN: i128 = 10_000_000;

fn render_traceback(traceback: &[TraceEntry]) -> String {
    traceback.iter().map(|entry| format!("\n{}", entry)).collect()
}

/// A fatal fault: halts the run and is never caught by script code.
#[derive(Debug, Clone, Error)]
#[error("{message}\n[line {line}]{}", render_traceback(.traceback))]
pub struct RuntimeError {
    pub message: String,
    pub line: usize,
    pub traceback: Vec<TraceEntry>,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(message: S, line: usize) -> Self {
        let message: String = message.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        Self {
            message,
            line,
            traceback: Vec::new(),
        }
    }

    /// Wraps an exception that reached the top level without a handler.
    pub fn uncaught(exception: UserException) -> Self {
        let message = format!("Uncaught {}: {}", exception.kind, exception.message);

        info!("Uncaught exception at line {}: {}", exception.line, message);

        Self {
            message,
            line: exception.line,
            traceback: exception.traceback,
        }
    }
}

/// How control leaves a statement.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
    Throw(UserException),
}

/// Why an expression did not produce a value.
#[derive(Debug)]
pub enum Unwind {
    Fault(RuntimeError),
    Throw(UserException),
    /// `return`, `break` or `continue` leaving a `do` block or match arm.
    Escape(Flow),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Fault(error)
    }
}

/// Evaluates an expression at a statement boundary, turning an unwind into
/// the statement's own completion.
macro_rules! eval_or_throw {
    ($self:ident, $expr:expr) => {
        match $self.evaluate($expr) {
            Ok(value) => value,
            Err(Unwind::Throw(exception)) => return Ok(Flow::Throw(exception)),
            Err(Unwind::Escape(flow)) => return Ok(flow),
            Err(Unwind::Fault(error)) => return Err(error),
        }
    };
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    /// Scope distance of every resolved local reference.
    locals: HashMap<ExprId, usize>,
    /// Names of the functions currently executing, innermost last.
    frames: Vec<String>,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter printing to stdout, with the native globals
    /// already defined.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates an interpreter whose `print` output goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        let mut interpreter = Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            frames: Vec::new(),
            out,
        };

        for native in builtins::natives() {
            debug!("Defining native function '{}'", native.name);
            interpreter.define_native(native);
        }

        interpreter
    }

    /// Defines a global binding.
    pub fn define(&mut self, name: &str, value: Value, is_constant: bool) {
        self.globals.borrow_mut().define(name, value, is_constant);
    }

    /// Defines a native function as a global.
    pub fn define_native(&mut self, native: Native) {
        let name = native.name.clone();
        self.define(&name, Value::Callable(Callable::Native(Rc::new(native))), false);
    }

    /// Reads a global binding, mainly for embedding and tests.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).ok()
    }

    /// Records that the reference `id` resolves `depth` scopes up.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Records that the reference `id` is global.
    pub fn note_global(&mut self, id: ExprId) {
        self.locals.remove(&id);
    }

    /// The recorded scope distance for `id`, if it is a local.
    pub fn resolved_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Runs a program.  Returns `false` if it halted on a fault or an uncaught
    /// exception, both of which go to `reporter.runtime_error`.
    pub fn interpret(&mut self, statements: &[Stmt], reporter: &mut dyn Reporter) -> bool {
        debug!("Interpreting {} statements", statements.len());

        let mut ok = true;

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Throw(exception)) => {
                    reporter.runtime_error(RuntimeError::uncaught(exception));
                    ok = false;
                    break;
                }
                Ok(_) => {}
                Err(error) => {
                    reporter.runtime_error(error);
                    ok = false;
                    break;
                }
            }
        }

        // A fault deep inside a block must not leave a REPL in a nested scope.
        self.environment = Rc::clone(&self.globals);
        self.frames.clear();

        if let Err(e) = self.out.flush() {
            debug!("Failed to flush output: {}", e);
        }

        if ok {
            info!("Interpretation completed successfully");
        }

        ok
    }

    // ───────────────────────────── statements ─────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expression(expr) => {
                eval_or_throw!(self, expr);
                Ok(Flow::Normal)
            }

            Stmt::Print {
                keyword,
                expressions,
            } => {
                let mut parts: Vec<String> = Vec::with_capacity(expressions.len());
                for expr in expressions {
                    let value = eval_or_throw!(self, expr);
                    parts.push(value.to_string());
                }

                let line = parts.join(" ");
                debug!("Printing: {}", line);

                writeln!(self.out, "{}", line).map_err(|e| {
                    RuntimeError::new(format!("Failed to write output: {}", e), keyword.line)
                })?;

                Ok(Flow::Normal)
            }

            Stmt::Var {
                name,
                initializer,
                constant,
                ..
            } => {
                let value = match initializer {
                    Some(expr) => eval_or_throw!(self, expr),
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, value, *constant);

                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::nested(&self.environment);
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if eval_or_throw!(self, condition).is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                debug!("Entering while loop");

                while eval_or_throw!(self, condition).is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        other => return Ok(other),
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                debug!("Entering for loop");

                let env = Environment::nested(&self.environment);
                let previous = mem::replace(&mut self.environment, env);
                let result = self.run_for(initializer.as_deref(), condition, increment, body);
                self.environment = previous;

                result
            }

            Stmt::ForEach {
                variable,
                iterable,
                body,
            } => {
                let iterable = eval_or_throw!(self, iterable);
                let items: Vec<Value> = match &iterable {
                    Value::List(items) => items.borrow().clone(),
                    Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                    Value::Map(entries) => entries
                        .borrow()
                        .keys()
                        .map(|k| Value::String(k.clone()))
                        .collect(),
                    other => {
                        return Err(self.error_at(
                            format!("Cannot iterate over a {}.", other.type_name()),
                            variable.line,
                        ))
                    }
                };

                debug!("Entering for-each over {} item(s)", items.len());

                for item in items {
                    let env = Environment::nested(&self.environment);
                    env.borrow_mut().define(&variable.lexeme, item, false);

                    match self.execute_block(std::slice::from_ref(&**body), env)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        other => return Ok(other),
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = Function::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                    false,
                );

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => eval_or_throw!(self, expr),
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            }

            Stmt::Break { .. } => Ok(Flow::Break),

            Stmt::Continue { .. } => Ok(Flow::Continue),

            Stmt::Try {
                body,
                catches,
                finally,
                ..
            } => {
                let env = Environment::nested(&self.environment);
                let mut flow = self.execute_block(body, env)?;

                if let Flow::Throw(exception) = flow {
                    let handler = catches.iter().find(|clause| {
                        clause
                            .kind
                            .as_ref()
                            .map_or(true, |kind| exception.matches(&kind.lexeme))
                    });

                    flow = match handler {
                        Some(clause) => {
                            debug!("Exception {} caught", exception.kind);

                            let name = clause.name.as_ref().map_or("e", |t| t.lexeme.as_str());
                            let env = Environment::nested(&self.environment);
                            env.borrow_mut().define(name, exception.value, false);

                            self.execute_block(&clause.body, env)?
                        }
                        None => Flow::Throw(exception),
                    };
                }

                if let Some(finally) = finally {
                    let env = Environment::nested(&self.environment);
                    let completion = self.execute_block(finally, env)?;

                    if !matches!(completion, Flow::Normal) {
                        flow = completion;
                    }
                }

                Ok(flow)
            }

            Stmt::Throw { keyword, value } => {
                let value = eval_or_throw!(self, value);
                let exception = UserException::from_value(value, keyword.line);

                debug!("Throwing {}: {}", exception.kind, exception.message);

                Ok(Flow::Throw(self.raise(exception)))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
                static_methods,
            } => {
                debug!("Defining class '{}'", name.lexeme);

                let superclass: Option<Rc<Class>> = match superclass {
                    Some(expr) => match eval_or_throw!(self, expr) {
                        Value::Class(class) => Some(class),
                        _ => {
                            return Err(
                                self.error_at("Superclass must be a class.", expr.line())
                            )
                        }
                    },
                    None => None,
                };

                let closure = match &superclass {
                    Some(class) => {
                        let env = Environment::nested(&self.environment);
                        env.borrow_mut()
                            .define("super", Value::Class(Rc::clone(class)), false);
                        env
                    }
                    None => Rc::clone(&self.environment),
                };

                let methods = methods
                    .iter()
                    .map(|decl| {
                        let is_init = decl.name.lexeme == "init";
                        let function = Function::new(Rc::clone(decl), Rc::clone(&closure), is_init);
                        (decl.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let static_methods = static_methods
                    .iter()
                    .map(|decl| {
                        let function = Function::new(Rc::clone(decl), Rc::clone(&closure), false);
                        (decl.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let class = Class {
                    name: name.lexeme.clone(),
                    superclass,
                    methods,
                    static_methods,
                };

                self.environment.borrow_mut().define(
                    &name.lexeme,
                    Value::Class(Rc::new(class)),
                    false,
                );

                Ok(Flow::Normal)
            }
        }
    }

    /// Runs `statements` inside `env`, restoring the current scope afterwards
    /// on every path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: Rc<RefCell<Environment>>,
    ) -> Result<Flow, RuntimeError> {
        let previous = mem::replace(&mut self.environment, env);
        let result = self.run_statements(statements);
        self.environment = previous;

        result
    }

    fn run_statements(&mut self, statements: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in statements {
            let flow = self.execute(stmt)?;

            if !matches!(flow, Flow::Normal) {
                return Ok(flow);
            }
        }

        Ok(Flow::Normal)
    }

    fn run_for(
        &mut self,
        initializer: Option<&Stmt>,
        condition: &Option<Expr>,
        increment: &Option<Expr>,
        body: &Stmt,
    ) -> Result<Flow, RuntimeError> {
        if let Some(init) = initializer {
            let flow = self.execute(init)?;
            if !matches!(flow, Flow::Normal) {
                return Ok(flow);
            }
        }

        loop {
            if let Some(cond) = condition {
                if !eval_or_throw!(self, cond).is_truthy() {
                    break;
                }
            }

            match self.execute(body)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => break,
                other => return Ok(other),
            }

            if let Some(incr) = increment {
                eval_or_throw!(self, incr);
            }
        }

        Ok(Flow::Normal)
    }

    /// Runs the statements of a `do` block or match arm in a fresh scope and
    /// yields the value of the final expression statement, else nil.
    fn evaluate_block(&mut self, statements: &[Stmt]) -> Result<Value, Unwind> {
        let env = Environment::nested(&self.environment);
        let previous = mem::replace(&mut self.environment, env);
        let result = self.run_block_value(statements);
        self.environment = previous;

        result
    }

    fn run_block_value(&mut self, statements: &[Stmt]) -> Result<Value, Unwind> {
        let Some((last, init)) = statements.split_last() else {
            return Ok(Value::Nil);
        };

        match self.run_statements(init)? {
            Flow::Normal => {}
            Flow::Throw(exception) => return Err(Unwind::Throw(exception)),
            other => return Err(Unwind::Escape(other)),
        }

        if let Stmt::Expression(expr) = last {
            return self.evaluate(expr);
        }

        match self.execute(last)? {
            Flow::Normal => Ok(Value::Nil),
            Flow::Throw(exception) => Err(Unwind::Throw(exception)),
            other => Err(Unwind::Escape(other)),
        }
    }

    // ───────────────────────────── expressions ────────────────────────────

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, Unwind> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(self.fault("Operand must be a number.", operator.line)),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(self.fault("Invalid unary operator.", operator.line)),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;

                self.binary(left, operator, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let short_circuit = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                let result = match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                    ),
                    None => self.globals.borrow_mut().assign(&name.lexeme, value.clone()),
                };

                result.map_err(|message| self.fault(message, name.line))?;

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call_value(callee, args, paren.line)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;
                self.get_member(&object, name)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;
                let value = self.evaluate(value)?;

                match &object {
                    Value::Instance(instance) => {
                        instance
                            .fields
                            .borrow_mut()
                            .insert(name.lexeme.clone(), value.clone());
                    }
                    Value::Map(entries) => {
                        entries
                            .borrow_mut()
                            .insert(name.lexeme.clone(), value.clone());
                    }
                    _ => return Err(self.fault("Only instances have fields.", name.line)),
                }

                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.super_method(*id, keyword, method),

            Expr::Lambda(declaration) => Ok(Value::Callable(Callable::Lambda(Rc::new(Lambda {
                declaration: Rc::clone(declaration),
                closure: Rc::clone(&self.environment),
            })))),

            Expr::ListLiteral { elements, .. } => {
                let mut items: Vec<Value> = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element)?);
                }

                Ok(Value::list(items))
            }

            Expr::MapLiteral { entries, .. } => {
                let mut map: BTreeMap<String, Value> = BTreeMap::new();
                for (key, value) in entries {
                    let key = match &key.literal {
                        Some(Literal::Str(s)) => s.clone(),
                        _ => key.lexeme.clone(),
                    };
                    let value = self.evaluate(value)?;
                    map.insert(key, value);
                }

                Ok(Value::map(map))
            }

            Expr::Range {
                start,
                operator,
                end,
                inclusive,
            } => {
                let start = self.evaluate(start)?;
                let end = self.evaluate(end)?;

                let (Some(from), Some(to)) = (builtins::as_integer(&start), builtins::as_integer(&end))
                else {
                    return Err(self.fault("Range bounds must be integers.", operator.line));
                };

                let len = i128::from(to) - i128::from(from) + i128::from(*inclusive);
                if len > MAX_RANGE_LEN {
                    return Err(self.fault("Range too large.", operator.line));
                }

                let items: Vec<Value> = if *inclusive {
                    (from..=to).map(|i| Value::Number(i as f64)).collect()
                } else {
                    (from..to).map(|i| Value::Number(i as f64)).collect()
                };

                Ok(Value::list(items))
            }

            Expr::Match {
                value,
                arms,
                default,
                ..
            } => {
                let subject = self.evaluate(value)?;

                for arm in arms {
                    let pattern = self.evaluate(&arm.pattern)?;

                    if pattern == subject {
                        return self.evaluate_block(&arm.body);
                    }
                }

                match default {
                    Some(body) => self.evaluate_block(body),
                    None => Ok(Value::Nil),
                }
            }

            Expr::Pipeline {
                left,
                operator,
                right,
            } => {
                let argument = self.evaluate(left)?;
                let callee = self.evaluate(right)?;

                self.call_value(callee, vec![argument], operator.line)
            }

            Expr::BlockExpr { statements, .. } => self.evaluate_block(statements),

            Expr::Subscript {
                object,
                bracket,
                index,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;

                self.subscript(&object, &index, bracket.line)
            }

            Expr::SubscriptAssign {
                object,
                bracket,
                index,
                value,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;

                match &object {
                    Value::List(items) => {
                        let len = items.borrow().len();
                        let i = self.list_index(&index, len, bracket.line)?;
                        items.borrow_mut()[i] = value.clone();
                    }
                    Value::Map(entries) => {
                        let Value::String(key) = &index else {
                            return Err(self.fault("Map keys must be strings.", bracket.line));
                        };
                        entries.borrow_mut().insert(key.clone(), value.clone());
                    }
                    _ => {
                        return Err(self.fault(
                            "Only lists and maps support index assignment.",
                            bracket.line,
                        ))
                    }
                }

                Ok(value)
            }
        }
    }

    fn binary(&self, left: Value, operator: &Token, right: Value) -> Result<Value, Unwind> {
        let line = operator.line;

        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                (Value::String(a), Value::Number(b)) => {
                    Ok(Value::String(a + &format_number(b)))
                }
                (Value::Number(a), Value::String(b)) => {
                    Ok(Value::String(format_number(a) + &b))
                }
                _ => Err(self.fault("Operands must be two numbers or two strings.", line)),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => {
                let (Value::Number(a), Value::Number(b)) = (left, right) else {
                    return Err(self.fault("Operands must be numbers.", line));
                };

                match operator.token_type {
                    TokenType::MINUS => Ok(Value::Number(a - b)),
                    TokenType::STAR => Ok(Value::Number(a * b)),
                    TokenType::SLASH => {
                        if b == 0.0 {
                            return Err(self.throw_runtime("Division by zero.", line));
                        }
                        Ok(Value::Number(a / b))
                    }
                    TokenType::PERCENT => {
                        if b == 0.0 {
                            return Err(self.throw_runtime("Modulo by zero.", line));
                        }
                        // Floored: the result takes the sign of the divisor.
                        let mut r = a % b;
                        if r != 0.0 && (r < 0.0) != (b < 0.0) {
                            r += b;
                        }
                        Ok(Value::Number(r))
                    }
                    TokenType::GREATER => Ok(Value::Bool(a > b)),
                    TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
                    TokenType::LESS => Ok(Value::Bool(a < b)),
                    TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
                    _ => Err(self.fault("Invalid binary operator.", line)),
                }
            }
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value, Unwind> {
        let result = match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme),
            None => self.globals.borrow().get(&name.lexeme),
        };

        result.map_err(|message| self.fault(message, name.line))
    }

    fn get_member(&self, object: &Value, name: &Token) -> Result<Value, Unwind> {
        match object {
            Value::Instance(instance) => {
                if let Some(value) = instance.fields.borrow().get(&name.lexeme) {
                    return Ok(value.clone());
                }

                match instance.class.find_method(&name.lexeme) {
                    Some(method) => Ok(Value::Callable(Callable::Function(Rc::new(
                        method.bind(object.clone()),
                    )))),
                    None => Err(self.fault(
                        format!("Undefined property '{}'.", name.lexeme),
                        name.line,
                    )),
                }
            }

            Value::Class(class) => match class.find_static(&name.lexeme) {
                Some(method) => Ok(Value::Callable(Callable::Function(Rc::new(
                    method.bind(object.clone()),
                )))),
                None => Err(self.fault(
                    format!(
                        "Undefined static method '{}' on class {}.",
                        name.lexeme, class.name
                    ),
                    name.line,
                )),
            },

            Value::Map(entries) => {
                let value = entries.borrow().get(&name.lexeme).cloned();
                Ok(value.unwrap_or(Value::Nil))
            }

            Value::List(_) | Value::String(_) => builtins::property(object, &name.lexeme)
                .ok_or_else(|| {
                    self.fault(
                        format!(
                            "Undefined property '{}' on {}.",
                            name.lexeme,
                            object.type_name()
                        ),
                        name.line,
                    )
                }),

            _ => Err(self.fault("Only instances have properties.", name.line)),
        }
    }

    fn super_method(&self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value, Unwind> {
        let Some(&distance) = self.locals.get(&id) else {
            return Err(self.fault("Cannot use 'super' here.", keyword.line));
        };

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Ok(Value::Class(class)) => class,
            _ => return Err(self.fault("Superclass must be a class.", keyword.line)),
        };

        // `this` lives in the scope just inside the one holding `super`.
        let receiver = Environment::get_at(&self.environment, distance.saturating_sub(1), "this")
            .map_err(|message| self.fault(message, keyword.line))?;

        let found = match &receiver {
            Value::Class(_) => superclass.find_static(&method.lexeme),
            _ => superclass.find_method(&method.lexeme),
        };

        match found {
            Some(function) => Ok(Value::Callable(Callable::Function(Rc::new(
                function.bind(receiver),
            )))),
            None => Err(self.fault(
                format!("Undefined property '{}'.", method.lexeme),
                method.line,
            )),
        }
    }

    fn subscript(&self, object: &Value, index: &Value, line: usize) -> Result<Value, Unwind> {
        match object {
            Value::List(items) => {
                let items = items.borrow();
                let i = self.list_index(index, items.len(), line)?;
                Ok(items[i].clone())
            }

            Value::String(s) => {
                let len = s.chars().count();
                let i = self.list_index(index, len, line)?;
                Ok(s.chars()
                    .nth(i)
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Nil))
            }

            Value::Map(entries) => match index {
                Value::String(key) => Ok(entries.borrow().get(key).cloned().unwrap_or(Value::Nil)),
                _ => Err(self.fault("Map keys must be strings.", line)),
            },

            _ => Err(self.fault("Only lists, strings and maps can be indexed.", line)),
        }
    }

    fn list_index(&self, index: &Value, len: usize, line: usize) -> Result<usize, Unwind> {
        let Some(i) = builtins::as_integer(index) else {
            return Err(self.fault("Index must be an integer.", line));
        };

        if i < 0 || i as usize >= len {
            return Err(self.fault(
                format!("Index {} out of range for length {}.", i, len),
                line,
            ));
        }

        Ok(i as usize)
    }

    // ─────────────────────────────── calls ────────────────────────────────

    fn call_value(&mut self, callee: Value, args: Vec<Value>, line: usize) -> Result<Value, Unwind> {
        match callee {
            Value::Callable(Callable::Function(function)) => {
                self.check_arity(function.arity(), args.len(), line)?;

                let result = self.invoke(
                    function.name(),
                    &function.declaration.params,
                    &function.declaration.body,
                    &function.closure,
                    args,
                    line,
                )?;

                if function.is_initializer {
                    return Environment::get_at(&function.closure, 0, "this")
                        .map_err(|message| self.fault(message, line));
                }

                Ok(result)
            }

            Value::Callable(Callable::Lambda(lambda)) => {
                self.check_arity(lambda.declaration.params.len(), args.len(), line)?;

                self.invoke(
                    "<lambda>",
                    &lambda.declaration.params,
                    &lambda.declaration.body,
                    &lambda.closure,
                    args,
                    line,
                )
            }

            Value::Callable(Callable::Native(native)) => {
                if !native.arity.accepts(args.len()) {
                    return Err(self.arity_fault(&native.arity.to_string(), args.len(), line));
                }

                debug!("Calling native function '{}'", native.name);

                (native.func)(&args).map_err(|message| self.fault(message, line))
            }

            Value::Callable(Callable::Builtin(builtin)) => {
                let arity = builtin.method.arity();
                if !arity.accepts(args.len()) {
                    return Err(self.arity_fault(&arity.to_string(), args.len(), line));
                }

                builtins::call_method(&builtin, &args).map_err(|message| self.fault(message, line))
            }

            Value::Class(class) => {
                debug!("Instantiating class '{}'", class.name);

                let instance = Value::Instance(Rc::new(Instance::new(Rc::clone(&class))));

                match class.find_method("init") {
                    Some(init) => {
                        let bound = Value::Callable(Callable::Function(Rc::new(
                            init.bind(instance.clone()),
                        )));
                        self.call_value(bound, args, line)?;
                    }
                    None => self.check_arity(0, args.len(), line)?,
                }

                Ok(instance)
            }

            _ => Err(self.fault("Can only call functions and classes.", line)),
        }
    }

    fn check_arity(&self, expected: usize, got: usize, line: usize) -> Result<(), Unwind> {
        if expected != got {
            return Err(self.arity_fault(&expected.to_string(), got, line));
        }

        Ok(())
    }

    fn arity_fault(&self, expected: &str, got: usize, line: usize) -> Unwind {
        self.fault(
            format!("Expected {} arguments but got {}.", expected, got),
            line,
        )
    }

    /// Runs a function body in a fresh scope over `closure` with the
    /// parameters bound, absorbing `return`.  Anything unwinding out of the
    /// frame gets a `(caller, call line)` traceback entry.
    fn invoke(
        &mut self,
        name: &str,
        params: &[Param],
        body: &[Stmt],
        closure: &Rc<RefCell<Environment>>,
        args: Vec<Value>,
        call_line: usize,
    ) -> Result<Value, Unwind> {
        debug!("Calling '{}' with {} argument(s)", name, args.len());

        let env = Environment::nested(closure);
        for (param, arg) in params.iter().zip(args) {
            env.borrow_mut().define(&param.name.lexeme, arg, false);
        }

        self.frames.push(name.to_string());
        let result = self.execute_block(body, env);
        self.frames.pop();

        let caller = TraceEntry {
            function: self.current_frame(),
            line: call_line,
        };

        match result {
            Ok(Flow::Return(value)) => Ok(value),
            Ok(Flow::Throw(mut exception)) => {
                exception.traceback.push(caller);
                Err(Unwind::Throw(exception))
            }
            Ok(_) => Ok(Value::Nil),
            Err(mut error) => {
                error.traceback.push(caller);
                Err(Unwind::Fault(error))
            }
        }
    }

    // ────────────────────────────── helpers ───────────────────────────────

    fn current_frame(&self) -> String {
        self.frames
            .last()
            .cloned()
            .unwrap_or_else(|| SCRIPT_FRAME.to_string())
    }

    /// A fault at `line`, stamped with the current frame.
    fn error_at<S: Into<String>>(&self, message: S, line: usize) -> RuntimeError {
        let mut error = RuntimeError::new(message, line);
        error.traceback.push(TraceEntry {
            function: self.current_frame(),
            line,
        });
        error
    }

    fn fault<S: Into<String>>(&self, message: S, line: usize) -> Unwind {
        Unwind::Fault(self.error_at(message, line))
    }

    /// Stamps a freshly thrown exception with the throw site.
    fn raise(&self, mut exception: UserException) -> UserException {
        exception.traceback.push(TraceEntry {
            function: self.current_frame(),
            line: exception.line,
        });
        exception
    }

    /// A catchable exception raised by the runtime itself.
    fn throw_runtime(&self, message: &str, line: usize) -> Unwind {
        Unwind::Throw(self.raise(UserException::runtime(
            "DivisionByZeroError",
            message,
            line,
        )))
    }
}
