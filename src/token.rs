use log::trace;
use serde::Serialize;
use std::fmt;

/// The different kinds of tokens recognized by the Demon scanner.
///
/// Literal payloads are not stored here; a [`Token`] carries its decoded
/// value separately in [`Token::literal`].
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// '['
    LEFT_BRACKET,

    /// ']'
    RIGHT_BRACKET,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// '-'
    MINUS,

    /// '+'
    PLUS,

    /// ';'
    SEMICOLON,

    /// ':'
    COLON,

    /// '/'
    SLASH,

    /// '*'
    STAR,

    /// '%'
    PERCENT,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// '|>'
    PIPE_GREATER,

    /// '..'
    DOT_DOT,

    /// '..<'
    DOT_DOT_LESS,

    /// '=>'
    FAT_ARROW,

    /// A user‑defined identifier
    IDENTIFIER,

    /// A string literal; contents live in [`Token::literal`]
    STRING,

    /// A numeric literal; value lives in [`Token::literal`]
    NUMBER,

    /// 'and' or '&&'
    AND,

    /// 'break'
    BREAK,

    /// 'catch'
    CATCH,

    /// 'class'
    CLASS,

    /// 'const'
    CONST,

    /// 'continue'
    CONTINUE,

    /// 'default'
    DEFAULT,

    /// 'do'
    DO,

    /// 'else'
    ELSE,

    /// 'extends'
    EXTENDS,

    /// 'false'
    FALSE,

    /// 'finally'
    FINALLY,

    /// 'for'
    FOR,

    /// 'func'
    FUNC,

    /// 'if'
    IF,

    /// 'in'
    IN,

    /// 'let'
    LET,

    /// 'match'
    MATCH,

    /// 'nil'
    NIL,

    /// 'or' or '||'
    OR,

    /// 'print'
    PRINT,

    /// 'return'
    RETURN,

    /// 'static'
    STATIC,

    /// 'super'
    SUPER,

    /// 'this'
    THIS,

    /// 'throw'
    THROW,

    /// 'true'
    TRUE,

    /// 'try'
    TRY,

    /// 'var'
    VAR,

    /// 'while'
    WHILE,

    /// End‑of‑file marker
    EOF,
}

impl TokenType {
    /// Upper‑case name used by the `tokenize` output.
    pub fn name(self) -> &'static str {
        match self {
            TokenType::LEFT_PAREN => "LEFT_PAREN",
            TokenType::RIGHT_PAREN => "RIGHT_PAREN",
            TokenType::LEFT_BRACE => "LEFT_BRACE",
            TokenType::RIGHT_BRACE => "RIGHT_BRACE",
            TokenType::LEFT_BRACKET => "LEFT_BRACKET",
            TokenType::RIGHT_BRACKET => "RIGHT_BRACKET",
            TokenType::COMMA => "COMMA",
            TokenType::DOT => "DOT",
            TokenType::MINUS => "MINUS",
            TokenType::PLUS => "PLUS",
            TokenType::SEMICOLON => "SEMICOLON",
            TokenType::COLON => "COLON",
            TokenType::SLASH => "SLASH",
            TokenType::STAR => "STAR",
            TokenType::PERCENT => "PERCENT",
            TokenType::BANG => "BANG",
            TokenType::BANG_EQUAL => "BANG_EQUAL",
            TokenType::EQUAL => "EQUAL",
            TokenType::EQUAL_EQUAL => "EQUAL_EQUAL",
            TokenType::GREATER => "GREATER",
            TokenType::GREATER_EQUAL => "GREATER_EQUAL",
            TokenType::LESS => "LESS",
            TokenType::LESS_EQUAL => "LESS_EQUAL",
            TokenType::PIPE_GREATER => "PIPE_GREATER",
            TokenType::DOT_DOT => "DOT_DOT",
            TokenType::DOT_DOT_LESS => "DOT_DOT_LESS",
            TokenType::FAT_ARROW => "FAT_ARROW",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::STRING => "STRING",
            TokenType::NUMBER => "NUMBER",
            TokenType::AND => "AND",
            TokenType::BREAK => "BREAK",
            TokenType::CATCH => "CATCH",
            TokenType::CLASS => "CLASS",
            TokenType::CONST => "CONST",
            TokenType::CONTINUE => "CONTINUE",
            TokenType::DEFAULT => "DEFAULT",
            TokenType::DO => "DO",
            TokenType::ELSE => "ELSE",
            TokenType::EXTENDS => "EXTENDS",
            TokenType::FALSE => "FALSE",
            TokenType::FINALLY => "FINALLY",
            TokenType::FOR => "FOR",
            TokenType::FUNC => "FUNC",
            TokenType::IF => "IF",
            TokenType::IN => "IN",
            TokenType::LET => "LET",
            TokenType::MATCH => "MATCH",
            TokenType::NIL => "NIL",
            TokenType::OR => "OR",
            TokenType::PRINT => "PRINT",
            TokenType::RETURN => "RETURN",
            TokenType::STATIC => "STATIC",
            TokenType::SUPER => "SUPER",
            TokenType::THIS => "THIS",
            TokenType::THROW => "THROW",
            TokenType::TRUE => "TRUE",
            TokenType::TRY => "TRY",
            TokenType::VAR => "VAR",
            TokenType::WHILE => "WHILE",
            TokenType::EOF => "EOF",
        }
    }
}

/// Decoded value of a literal token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Number(f64),
    Str(String),
}

/// A scanned token: its type, the original lexeme, the decoded literal (for
/// strings and numbers) and the line number where it was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: String,

    /// Decoded literal value for `STRING` and `NUMBER` tokens.
    pub literal: Option<Literal>,

    /// 1‑based line number in the source.
    pub line: usize,
}

impl Token {
    /// Create a new Token with the given type, lexeme, literal and line.
    pub fn new(
        token_type: TokenType,
        lexeme: impl Into<String>,
        literal: Option<Literal>,
        line: usize,
    ) -> Self {
        let lexeme = lexeme.into();

        trace!(
            "Creating new token: type={:?}, lexeme={}, line={}",
            token_type,
            lexeme,
            line
        );

        Self {
            token_type,
            lexeme,
            literal,
            line,
        }
    }
}

/// Renders a number the way `tokenize` prints literals: `3` → `3.0`, `3.14` → `3.14`.
fn literal_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        let mut buf: itoa::Buffer = itoa::Buffer::new();
        format!("{}.0", buf.format(n as i64))
    } else {
        n.to_string()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literal: String = match &self.literal {
            Some(Literal::Str(s)) => s.clone(),
            Some(Literal::Number(n)) => literal_number(*n),
            None => "null".to_string(),
        };

        write!(f, "{} {} {}", self.token_type.name(), self.lexeme, literal)
    }
}
