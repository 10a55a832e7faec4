use crate::ast::{Expr, LiteralValue, Param, Stmt};

/// Converts the AST to a parenthesised prefix form, one line per top‑level
/// statement.  Used by the `parse` subcommand and by parser tests.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            }
            | Expr::Range {
                start: left,
                operator,
                end: right,
                ..
            }
            | Expr::Pipeline {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => Self::parenthesize(&format!("call {}", Self::print(callee)), arguments),

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            Expr::Lambda(decl) => format!(
                "(lambda ({}) {})",
                Self::params(&decl.params),
                Self::body(&decl.body)
            ),

            Expr::ListLiteral { elements, .. } => Self::parenthesize("list", elements),

            Expr::MapLiteral { entries, .. } => {
                let mut s = String::from("(map");
                for (key, value) in entries {
                    s.push_str(&format!(" ({} {})", key.lexeme, Self::print(value)));
                }
                s.push(')');
                s
            }

            Expr::Match {
                value,
                arms,
                default,
                ..
            } => {
                let mut s = format!("(match {}", Self::print(value));
                for arm in arms {
                    s.push_str(&format!(
                        " (=> {} {})",
                        Self::print(&arm.pattern),
                        Self::body(&arm.body)
                    ));
                }
                if let Some(body) = default {
                    s.push_str(&format!(" (default {})", Self::body(body)));
                }
                s.push(')');
                s
            }

            Expr::BlockExpr { statements, .. } => format!("(do {})", Self::body(statements)),

            Expr::Subscript { object, index, .. } => {
                format!("(index {} {})", Self::print(object), Self::print(index))
            }

            Expr::SubscriptAssign {
                object,
                index,
                value,
                ..
            } => format!(
                "(= (index {} {}) {})",
                Self::print(object),
                Self::print(index),
                Self::print(value)
            ),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print { expressions, .. } => Self::parenthesize("print", expressions),

            Stmt::Var {
                name,
                initializer,
                constant,
                ..
            } => {
                let keyword = if *constant { "const" } else { "let" };
                match initializer {
                    Some(init) => format!("({} {} {})", keyword, name.lexeme, Self::print(init)),
                    None => format!("({} {})", keyword, name.lexeme),
                }
            }

            Stmt::Block(statements) => Self::body(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(other) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(other)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => format!(
                "(for {} {} {} {})",
                initializer
                    .as_deref()
                    .map_or_else(|| "_".to_string(), Self::print_stmt),
                condition
                    .as_ref()
                    .map_or_else(|| "_".to_string(), Self::print),
                increment
                    .as_ref()
                    .map_or_else(|| "_".to_string(), Self::print),
                Self::print_stmt(body)
            ),

            Stmt::ForEach {
                variable,
                iterable,
                body,
            } => format!(
                "(for-in {} {} {})",
                variable.lexeme,
                Self::print(iterable),
                Self::print_stmt(body)
            ),

            Stmt::Function(decl) => format!(
                "(func {} ({}) {})",
                decl.name.lexeme,
                Self::params(&decl.params),
                Self::body(&decl.body)
            ),

            Stmt::Return { value, .. } => match value {
                Some(v) => format!("(return {})", Self::print(v)),
                None => "(return)".into(),
            },

            Stmt::Break { .. } => "(break)".into(),

            Stmt::Continue { .. } => "(continue)".into(),

            Stmt::Try {
                body,
                catches,
                finally,
                ..
            } => {
                let mut s = format!("(try {}", Self::body(body));
                for clause in catches {
                    let kind = clause.kind.as_ref().map_or("_", |t| t.lexeme.as_str());
                    let name = clause.name.as_ref().map_or("e", |t| t.lexeme.as_str());
                    s.push_str(&format!(
                        " (catch {} {} {})",
                        kind,
                        name,
                        Self::body(&clause.body)
                    ));
                }
                if let Some(body) = finally {
                    s.push_str(&format!(" (finally {})", Self::body(body)));
                }
                s.push(')');
                s
            }

            Stmt::Throw { value, .. } => format!("(throw {})", Self::print(value)),

            Stmt::Class {
                name,
                superclass,
                methods,
                static_methods,
            } => {
                let mut s = format!("(class {}", name.lexeme);
                if let Some(sup) = superclass {
                    s.push_str(&format!(" < {}", Self::print(sup)));
                }
                for method in methods {
                    s.push_str(&format!(" {}", method.name.lexeme));
                }
                for method in static_methods {
                    s.push_str(&format!(" (static {})", method.name.lexeme));
                }
                s.push(')');
                s
            }
        }
    }

    fn parenthesize(head: &str, exprs: &[Expr]) -> String {
        let mut s = format!("({}", head);
        for expr in exprs {
            s.push(' ');
            s.push_str(&Self::print(expr));
        }
        s.push(')');
        s
    }

    fn body(statements: &[Stmt]) -> String {
        let mut s = String::from("{");
        for (i, stmt) in statements.iter().enumerate() {
            if i > 0 {
                s.push(' ');
            }
            s.push_str(&Self::print_stmt(stmt));
        }
        s.push('}');
        s
    }

    fn params(params: &[Param]) -> String {
        params
            .iter()
            .map(|p| p.name.lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
