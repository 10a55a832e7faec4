/*!
Recursive‑descent parser for Demon.

Time & Space
------------
* **n** = number of tokens (including the sole EOF).

| Phase / function               | Cost | Rationale                                              |
|--------------------------------|-----:|--------------------------------------------------------|
| `Parser::parse` main loop      | Θ(n) | Each token is consumed once via `advance()`.           |
| Error recovery `synchronize()` | O(k) | Discards tokens up to the next statement boundary.     |

The AST owns clones of the tokens it keeps, so it outlives the token buffer.

### Logging Policy

| Location                      | Level   | Purpose                                   |
|-------------------------------|---------|-------------------------------------------|
| `Parser::new`, `parse`        | `info`  | Lifecycle milestones.                     |
| `declaration`, `statement`    | `debug` | High‑level descent into grammar branches. |
| Error paths (`consume`, etc.) | `info`  | Logged by `DemonError::parse`.            |

Grammar (EBNF, lowest precedence first)
---------------------------------------

```text
program      → declaration* EOF ;
declaration  → classDecl | funcDecl | varDecl | statement ;
classDecl    → "class" IDENT ( ( "extends" | "<" ) IDENT )?
               "{" ( "static"? function )* "}" ;
funcDecl     → "func" function ;
function     → IDENT "(" params? ")" ( ":" IDENT )? block ;
params       → param ( "," param )* ;
param        → IDENT ( ":" IDENT )? ;
varDecl      → ( "let" | "var" | "const" ) IDENT ( ":" IDENT )? ( "=" expression )? ";" ;
statement    → forStmt | ifStmt | printStmt | returnStmt | whileStmt
             | breakStmt | continueStmt | tryStmt | throwStmt | block | exprStmt ;
tryStmt      → "try" block ( "catch" "(" ( IDENT IDENT? )? ")" block )*
               ( "finally" block )? ;
expression   → assignment ;
assignment   → pipeline ( "=" assignment )? ;
pipeline     → logic_or ( "|>" logic_or )* ;
logic_or     → logic_and ( ( "or" | "||" ) logic_and )* ;
logic_and    → equality ( ( "and" | "&&" ) equality )* ;
equality     → comparison ( ( "!=" | "==" ) comparison )* ;
comparison   → range ( ( ">" | ">=" | "<" | "<=" ) range )* ;
range        → term ( ( ".." | "..<" ) term )? ;
term         → factor ( ( "-" | "+" ) factor )* ;
factor       → unary ( ( "/" | "*" | "%" ) unary )* ;
unary        → ( "!" | "-" ) unary | call ;
call         → primary ( "(" arguments? ")" | "." IDENT | "[" expression "]" )* ;
primary      → NUMBER | STRING | "true" | "false" | "nil" | IDENT | "this"
             | "super" "." IDENT | "(" expression ")" | "[" list? "]" | "{" map? "}"
             | "func" lambda | "match" matchBody | "do" block ;
```
*/

use std::rc::Rc;

use crate::ast::{
    CatchClause, Expr, ExprId, FunctionDecl, LambdaDecl, LiteralValue, MatchArm, Param, Stmt,
};
use crate::error::{DemonError, Reporter, Result};
use crate::token::{Literal, Token, TokenType};

use log::{debug, info};

const MAX_ARITY: usize = 255;

/// Top‑level parser over a scanned token buffer.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// Next [`ExprId`] to hand out.
    next_id: usize,
    /// Errors that do not abort the current declaration.
    pending: Vec<DemonError>,
}

impl Parser {
    /// Construct a new parser whose node ids start at zero.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_first_id(tokens, 0)
    }

    /// Construct a parser whose node ids start at `first_id`.  A session that
    /// parses several units against one interpreter threads [`Parser::next_id`]
    /// through so ids never collide.
    pub fn with_first_id(mut tokens: Vec<Token>, first_id: usize) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        if tokens.last().map(|t| t.token_type) != Some(TokenType::EOF) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenType::EOF, "", None, line));
        }

        Self {
            tokens,
            current: 0,
            next_id: first_id,
            pending: Vec::new(),
        }
    }

    /// The first id not yet used by this parser.
    pub fn next_id(&self) -> usize {
        self.next_id
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.  Every syntax error goes to `reporter`; a
    /// declaration that fails is dropped and parsing resumes after it.
    pub fn parse(&mut self, reporter: &mut dyn Reporter) -> Vec<Stmt> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            let result = self.declaration();
            self.flush(reporter);

            match result {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    reporter.error(e);
                    self.synchronize();
                }
            }
        }

        info!("Parsed {} top-level statement(s)", statements.len());

        statements
    }

    fn flush(&mut self, reporter: &mut dyn Reporter) {
        for e in self.pending.drain(..) {
            reporter.error(e);
        }
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        debug!("Entering declaration");

        if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.check(TokenType::FUNC) && self.check_next(TokenType::IDENTIFIER) {
            self.advance();
            Ok(Stmt::Function(self.function("function")?))
        } else if self.matches(TokenType::LET) || self.matches(TokenType::VAR) {
            self.var_declaration(false)
        } else if self.matches(TokenType::CONST) {
            self.var_declaration(true)
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect class name.")?;

        let superclass: Option<Expr> =
            if self.matches(TokenType::EXTENDS) || self.matches(TokenType::LESS) {
                let super_name = self.consume(TokenType::IDENTIFIER, "Expect superclass name.")?;

                Some(Expr::Variable {
                    id: self.fresh_id(),
                    name: super_name,
                })
            } else {
                None
            };

        self.consume(TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();
        let mut static_methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if self.matches(TokenType::STATIC) {
                static_methods.push(self.function("method")?);
            } else {
                methods.push(self.function("method")?);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        debug!(
            "Parsed class '{}' with {} method(s), {} static",
            name.lexeme,
            methods.len(),
            static_methods.len()
        );

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
            static_methods,
        })
    }

    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name: Token = self.consume(TokenType::IDENTIFIER, &format!("Expect {kind} name."))?;

        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expect '(' after {kind} name."),
        )?;

        let params: Vec<Param> = self.parameters()?;
        let return_type: Option<Token> = self.return_type()?;

        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expect '{{' before {kind} body."),
        )?;
        let body: Vec<Stmt> = self.block()?;

        Ok(Rc::new(FunctionDecl {
            name,
            params,
            return_type,
            body,
        }))
    }

    /// Parameter list up to and including the closing `)`.
    fn parameters(&mut self) -> Result<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARITY {
                    let err = DemonError::parse(self.peek(), "Can't have more than 255 parameters.");
                    self.pending.push(err);
                }

                let name: Token = self.consume(TokenType::IDENTIFIER, "Expect parameter name.")?;
                let annotation: Option<Token> = if self.matches(TokenType::COLON) {
                    Some(self.consume(TokenType::IDENTIFIER, "Expect parameter type.")?)
                } else {
                    None
                };

                params.push(Param { name, annotation });

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;

        Ok(params)
    }

    fn return_type(&mut self) -> Result<Option<Token>> {
        if self.matches(TokenType::COLON) {
            Ok(Some(
                self.consume(TokenType::IDENTIFIER, "Expect return type.")?,
            ))
        } else {
            Ok(None)
        }
    }

    fn var_declaration(&mut self, constant: bool) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?;
        self.var_declaration_rest(name, constant)
    }

    /// Everything after the declared name: `( ":" IDENT )? ( "=" expression )? ";"`.
    fn var_declaration_rest(&mut self, name: Token, constant: bool) -> Result<Stmt> {
        let annotation: Option<Token> = if self.matches(TokenType::COLON) {
            Some(self.consume(TokenType::IDENTIFIER, "Expect type annotation.")?)
        } else {
            None
        };

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var {
            name,
            annotation,
            initializer,
            constant,
        })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        debug!("Entering statement at {:?}", self.peek().token_type);

        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::BREAK) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenType::SEMICOLON, "Expect ';' after 'break'.")?;
            Ok(Stmt::Break { keyword })
        } else if self.matches(TokenType::CONTINUE) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenType::SEMICOLON, "Expect ';' after 'continue'.")?;
            Ok(Stmt::Continue { keyword })
        } else if self.matches(TokenType::TRY) {
            self.try_statement()
        } else if self.matches(TokenType::THROW) {
            self.throw_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'for'.")?;

        let initializer: Option<Box<Stmt>> =
            if self.matches(TokenType::LET) || self.matches(TokenType::VAR) {
                let name: Token = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?;

                if self.matches(TokenType::IN) {
                    let iterable: Expr = self.expression()?;
                    self.consume(
                        TokenType::RIGHT_PAREN,
                        "Expect ')' after for-each clauses.",
                    )?;
                    let body: Box<Stmt> = Box::new(self.statement()?);

                    return Ok(Stmt::ForEach {
                        variable: name,
                        iterable,
                        body,
                    });
                }

                Some(Box::new(self.var_declaration_rest(name, false)?))
            } else if self.matches(TokenType::SEMICOLON) {
                None
            } else {
                Some(Box::new(self.expression_statement()?))
            };

        let condition: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment: Option<Expr> = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::For {
            initializer,
            condition,
            increment,
            body,
        })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after if condition.")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'print'.")?;

        let mut expressions: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                expressions.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?;
        self.consume(TokenType::SEMICOLON, "Expect ';' after print statement.")?;

        Ok(Stmt::Print {
            keyword,
            expressions,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn try_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        self.consume(TokenType::LEFT_BRACE, "Expect '{' after 'try'.")?;
        let body: Vec<Stmt> = self.block()?;

        let mut catches: Vec<CatchClause> = Vec::new();

        while self.matches(TokenType::CATCH) {
            let catch_keyword: Token = self.previous().clone();

            self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'catch'.")?;

            // `catch (Kind name)` or `catch (name)`; a lone identifier is the name.
            let kind: Option<Token> =
                if self.check(TokenType::IDENTIFIER) && self.check_next(TokenType::IDENTIFIER) {
                    Some(self.advance().clone())
                } else {
                    None
                };

            let name: Option<Token> = if self.matches(TokenType::IDENTIFIER) {
                Some(self.previous().clone())
            } else {
                None
            };

            self.consume(TokenType::RIGHT_PAREN, "Expect ')' after catch parameters.")?;
            self.consume(TokenType::LEFT_BRACE, "Expect '{' after catch parameters.")?;

            let catch_body: Vec<Stmt> = self.block()?;

            catches.push(CatchClause {
                keyword: catch_keyword,
                kind,
                name,
                body: catch_body,
            });
        }

        let finally: Option<Vec<Stmt>> = if self.matches(TokenType::FINALLY) {
            self.consume(TokenType::LEFT_BRACE, "Expect '{' after 'finally'.")?;
            Some(self.block()?)
        } else {
            None
        };

        if catches.is_empty() && finally.is_none() {
            return Err(DemonError::parse(
                self.peek(),
                "Expect 'catch' or 'finally' after try block.",
            ));
        }

        Ok(Stmt::Try {
            keyword,
            body,
            catches,
            finally,
        })
    }

    fn throw_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expect ';' after throw expression.")?;

        Ok(Stmt::Throw { keyword, value })
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expect ';' after expression.")?;

        Ok(Stmt::Expression(expr))
    }

    /// Statements up to and including the closing `}`.  The opening `{` has
    /// already been consumed.
    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after block.")?;

        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.pipeline()?;

        if self.matches(TokenType::EQUAL) {
            let equals: Token = self.previous().clone();
            let value: Box<Expr> = Box::new(self.assignment()?);

            return Ok(match expr {
                Expr::Variable { name, .. } => Expr::Assign {
                    id: self.fresh_id(),
                    name,
                    value,
                },

                Expr::Get { object, name } => Expr::Set {
                    object,
                    name,
                    value,
                },

                Expr::Subscript {
                    object,
                    bracket,
                    index,
                } => Expr::SubscriptAssign {
                    object,
                    bracket,
                    index,
                    value,
                },

                other => {
                    self.pending
                        .push(DemonError::parse(&equals, "Invalid assignment target."));
                    other
                }
            });
        }

        Ok(expr)
    }

    fn pipeline(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_or()?;

        while self.matches(TokenType::PIPE_GREATER) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_or()?;

            expr = Expr::Pipeline {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.matches(TokenType::BANG_EQUAL) || self.matches(TokenType::EQUAL_EQUAL) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.range()?;

        while self.matches(TokenType::GREATER)
            || self.matches(TokenType::GREATER_EQUAL)
            || self.matches(TokenType::LESS)
            || self.matches(TokenType::LESS_EQUAL)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.range()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Ranges do not chain: `1..2..3` is a syntax error at the second `..`.
    fn range(&mut self) -> Result<Expr> {
        let start: Expr = self.term()?;

        if self.matches(TokenType::DOT_DOT) || self.matches(TokenType::DOT_DOT_LESS) {
            let operator: Token = self.previous().clone();
            let inclusive = operator.token_type == TokenType::DOT_DOT;
            let end: Expr = self.term()?;

            return Ok(Expr::Range {
                start: Box::new(start),
                operator,
                end: Box::new(end),
                inclusive,
            });
        }

        Ok(start)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.matches(TokenType::MINUS) || self.matches(TokenType::PLUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.matches(TokenType::STAR)
            || self.matches(TokenType::SLASH)
            || self.matches(TokenType::PERCENT)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::BANG) || self.matches(TokenType::MINUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token =
                    self.consume(TokenType::IDENTIFIER, "Expect property name after '.'.")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else if self.matches(TokenType::LEFT_BRACKET) {
                let bracket: Token = self.previous().clone();
                let index: Expr = self.expression()?;
                self.consume(TokenType::RIGHT_BRACKET, "Expect ']' after index.")?;

                expr = Expr::Subscript {
                    object: Box::new(expr),
                    bracket,
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    let err = DemonError::parse(self.peek(), "Can't have more than 255 arguments.");
                    self.pending.push(err);
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.matches(TokenType::NIL) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if self.matches(TokenType::NUMBER) || self.matches(TokenType::STRING) {
            let value = match &self.previous().literal {
                Some(Literal::Number(n)) => LiteralValue::Number(*n),
                Some(Literal::Str(s)) => LiteralValue::Str(s.clone()),
                None => LiteralValue::Nil,
            };

            return Ok(Expr::Literal(value));
        }

        if self.matches(TokenType::SUPER) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenType::DOT, "Expect '.' after 'super'.")?;
            let method: Token =
                self.consume(TokenType::IDENTIFIER, "Expect superclass method name.")?;

            return Ok(Expr::Super {
                id: self.fresh_id(),
                keyword,
                method,
            });
        }

        if self.matches(TokenType::THIS) {
            return Ok(Expr::This {
                id: self.fresh_id(),
                keyword: self.previous().clone(),
            });
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::Variable {
                id: self.fresh_id(),
                name: self.previous().clone(),
            });
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;
            self.consume(TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        if self.matches(TokenType::LEFT_BRACKET) {
            return self.list_literal();
        }

        if self.matches(TokenType::LEFT_BRACE) {
            return self.map_literal();
        }

        if self.matches(TokenType::FUNC) {
            return self.lambda();
        }

        if self.matches(TokenType::MATCH) {
            return self.match_expression();
        }

        if self.matches(TokenType::DO) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenType::LEFT_BRACE, "Expect '{' after 'do'.")?;
            let statements: Vec<Stmt> = self.block()?;

            return Ok(Expr::BlockExpr {
                keyword,
                statements,
            });
        }

        Err(DemonError::parse(self.peek(), "Expect expression."))
    }

    fn list_literal(&mut self) -> Result<Expr> {
        let bracket: Token = self.previous().clone();
        let mut elements: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_BRACKET) {
            loop {
                elements.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_BRACKET, "Expect ']' after list elements.")?;

        Ok(Expr::ListLiteral { bracket, elements })
    }

    fn map_literal(&mut self) -> Result<Expr> {
        let brace: Token = self.previous().clone();
        let mut entries: Vec<(Token, Expr)> = Vec::new();

        if !self.check(TokenType::RIGHT_BRACE) {
            loop {
                let key: Token =
                    self.consume(TokenType::STRING, "Expect string key in map literal.")?;
                self.consume(TokenType::COLON, "Expect ':' after map key.")?;
                let value: Expr = self.expression()?;

                entries.push((key, value));

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after map entries.")?;

        Ok(Expr::MapLiteral { brace, entries })
    }

    fn lambda(&mut self) -> Result<Expr> {
        let keyword: Token = self.previous().clone();

        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'func'.")?;
        let params: Vec<Param> = self.parameters()?;
        let return_type: Option<Token> = self.return_type()?;

        self.consume(TokenType::LEFT_BRACE, "Expect '{' before lambda body.")?;
        let body: Vec<Stmt> = self.block()?;

        Ok(Expr::Lambda(Rc::new(LambdaDecl {
            keyword,
            params,
            return_type,
            body,
        })))
    }

    fn match_expression(&mut self) -> Result<Expr> {
        let keyword: Token = self.previous().clone();

        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'match'.")?;
        let value: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after match value.")?;
        self.consume(TokenType::LEFT_BRACE, "Expect '{' before match arms.")?;

        let mut arms: Vec<MatchArm> = Vec::new();
        let mut default: Option<Vec<Stmt>> = None;

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if self.matches(TokenType::DEFAULT) {
                self.consume(TokenType::FAT_ARROW, "Expect '=>' after 'default'.")?;
                self.consume(TokenType::LEFT_BRACE, "Expect '{' before match arm body.")?;
                default = Some(self.block()?);
                self.matches(TokenType::COMMA);
                break;
            }

            let pattern: Expr = self.expression()?;
            self.consume(TokenType::FAT_ARROW, "Expect '=>' after match pattern.")?;
            self.consume(TokenType::LEFT_BRACE, "Expect '{' before match arm body.")?;
            let body: Vec<Stmt> = self.block()?;
            self.matches(TokenType::COMMA);

            arms.push(MatchArm { pattern, body });
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after match arms.")?;

        Ok(Expr::Match {
            keyword,
            value: Box::new(value),
            arms,
            default,
        })
    }

    // ────────────────────── utility helpers ───────────────────────

    fn fresh_id(&mut self) -> ExprId {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        id
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<Token> {
        if self.check(ttype) {
            return Ok(self.advance().clone());
        }

        Err(DemonError::parse(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn check_next(&self, ttype: TokenType) -> bool {
        self.tokens
            .get(self.current + 1)
            .is_some_and(|t| t.token_type == ttype)
    }

    #[inline(always)]
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUNC
                | TokenType::LET
                | TokenType::CONST
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN
                | TokenType::TRY
                | TokenType::CATCH
                | TokenType::FINALLY
                | TokenType::THROW => return,
                _ => {}
            }

            self.advance();
        }
    }
}
