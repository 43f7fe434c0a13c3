use std::collections::HashMap;
use std::fmt;

/// Position of a token in cell source.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

/// All token kinds in the SolvraPad cell dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,

    Identifier(String),

    // Keywords
    Let,
    Mut,
    Fn,
    If,
    Else,
    While,
    For,
    In,
    Return,
    Break,
    Continue,
    Import,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    EqualEqual,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    And,
    Or,
    Not,
    Arrow,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,

    // Special
    Comment(String),
    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Integer(n) => write!(f, "{}", n),
            TokenKind::Float(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "\"{}\"", s),
            TokenKind::Boolean(b) => write!(f, "{}", b),
            TokenKind::Null => write!(f, "null"),
            TokenKind::Identifier(s) => write!(f, "{}", s),
            TokenKind::Comment(s) => write!(f, "// {}", s),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// A token with its kind, start position, and lexeme length in chars.
///
/// The length makes tokens usable as highlight spans without a second scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
    pub length: usize,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position, length: usize) -> Self {
        Self {
            kind,
            position,
            length,
        }
    }
}

/// Tokenizer for cell source.
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    keywords: HashMap<&'static str, TokenKind>,
    tokens: Vec<Token>,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("let", TokenKind::Let);
        keywords.insert("mut", TokenKind::Mut);
        keywords.insert("fn", TokenKind::Fn);
        keywords.insert("if", TokenKind::If);
        keywords.insert("else", TokenKind::Else);
        keywords.insert("while", TokenKind::While);
        keywords.insert("for", TokenKind::For);
        keywords.insert("in", TokenKind::In);
        keywords.insert("return", TokenKind::Return);
        keywords.insert("break", TokenKind::Break);
        keywords.insert("continue", TokenKind::Continue);
        keywords.insert("import", TokenKind::Import);
        keywords.insert("null", TokenKind::Null);
        keywords.insert("true", TokenKind::Boolean(true));
        keywords.insert("false", TokenKind::Boolean(false));

        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            keywords,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        while !self.is_at_end() {
            self.skip_blanks();
            if self.is_at_end() {
                break;
            }

            let start = self.mark();

            if self.current_char() == '\n' {
                self.advance();
                self.push_token(TokenKind::Newline, start);
                continue;
            }

            if self.current_char() == '/' && self.peek_char() == Some('/') {
                self.scan_comment(start);
                continue;
            }

            if self.current_char() == '"' {
                self.scan_string(start)?;
                continue;
            }

            if self.current_char().is_ascii_digit() {
                self.scan_number(start)?;
                continue;
            }

            if self.current_char().is_alphabetic() || self.current_char() == '_' {
                self.scan_identifier(start);
                continue;
            }

            self.scan_operator_or_delimiter(start)?;
        }

        let eof = self.mark();
        self.push_token(TokenKind::Eof, eof);
        Ok(self.tokens.clone())
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.input[self.position]
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.current_char();
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn mark(&self) -> Position {
        Position::new(self.line, self.column, self.position)
    }

    fn push_token(&mut self, kind: TokenKind, start: Position) {
        let length = self.position - start.offset;
        self.tokens.push(Token::new(kind, start, length));
    }

    fn skip_blanks(&mut self) {
        while !self.is_at_end()
            && self.current_char().is_whitespace()
            && self.current_char() != '\n'
        {
            self.advance();
        }
    }

    fn scan_comment(&mut self, start: Position) {
        self.advance();
        self.advance();
        let mut text = String::new();
        while !self.is_at_end() && self.current_char() != '\n' {
            text.push(self.advance());
        }
        self.push_token(TokenKind::Comment(text.trim().to_string()), start);
    }

    fn scan_string(&mut self, start: Position) -> Result<(), String> {
        self.advance(); // opening quote
        let mut value = String::new();
        while !self.is_at_end() && self.current_char() != '"' {
            if self.current_char() == '\\' {
                self.advance();
                if self.is_at_end() {
                    return Err("Unterminated string literal".to_string());
                }
                match self.current_char() {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
                self.advance();
            } else {
                value.push(self.advance());
            }
        }
        if self.is_at_end() {
            return Err("Unterminated string literal".to_string());
        }
        self.advance(); // closing quote
        self.push_token(TokenKind::String(value), start);
        Ok(())
    }

    fn scan_number(&mut self, start: Position) -> Result<(), String> {
        let mut number = String::new();
        let mut is_float = false;
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_ascii_digit() {
                number.push(self.advance());
            } else if ch == '.' && !is_float && matches!(self.peek_char(), Some(c) if c.is_ascii_digit())
            {
                // A dot not followed by a digit is member access, not a float.
                is_float = true;
                number.push(self.advance());
            } else {
                break;
            }
        }

        if is_float {
            match number.parse::<f64>() {
                Ok(f) => self.push_token(TokenKind::Float(f), start),
                Err(_) => return Err(format!("Invalid float literal: {}", number)),
            }
        } else {
            match number.parse::<i64>() {
                Ok(i) => self.push_token(TokenKind::Integer(i), start),
                Err(_) => return Err(format!("Invalid integer literal: {}", number)),
            }
        }
        Ok(())
    }

    fn scan_identifier(&mut self, start: Position) {
        let mut identifier = String::new();
        while !self.is_at_end()
            && (self.current_char().is_alphanumeric() || self.current_char() == '_')
        {
            identifier.push(self.advance());
        }
        let kind = self
            .keywords
            .get(identifier.as_str())
            .cloned()
            .unwrap_or(TokenKind::Identifier(identifier));
        self.push_token(kind, start);
    }

    fn scan_operator_or_delimiter(&mut self, start: Position) -> Result<(), String> {
        let ch = self.advance();

        let kind = match ch {
            '+' => self.with_equal(TokenKind::PlusEqual, TokenKind::Plus),
            '-' => {
                if self.current_char() == '>' {
                    self.advance();
                    TokenKind::Arrow
                } else {
                    self.with_equal(TokenKind::MinusEqual, TokenKind::Minus)
                }
            }
            '*' => self.with_equal(TokenKind::StarEqual, TokenKind::Star),
            '/' => self.with_equal(TokenKind::SlashEqual, TokenKind::Slash),
            '%' => TokenKind::Percent,
            '=' => self.with_equal(TokenKind::EqualEqual, TokenKind::Equal),
            '!' => self.with_equal(TokenKind::NotEqual, TokenKind::Not),
            '<' => self.with_equal(TokenKind::LessEqual, TokenKind::Less),
            '>' => self.with_equal(TokenKind::GreaterEqual, TokenKind::Greater),
            '&' => {
                if self.current_char() == '&' {
                    self.advance();
                    TokenKind::And
                } else {
                    return Err(format!("Unexpected character: {}", ch));
                }
            }
            '|' => {
                if self.current_char() == '|' {
                    self.advance();
                    TokenKind::Or
                } else {
                    return Err(format!("Unexpected character: {}", ch));
                }
            }
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            _ => return Err(format!("Unexpected character: {}", ch)),
        };

        self.push_token(kind, start);
        Ok(())
    }

    fn with_equal(&mut self, compound: TokenKind, plain: TokenKind) -> TokenKind {
        if self.current_char() == '=' {
            self.advance();
            compound
        } else {
            plain
        }
    }
}
