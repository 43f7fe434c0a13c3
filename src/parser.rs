use crate::ast::{AssignTarget, BinaryOp, Expr, Literal, Program, Stmt, UnaryOp};
use crate::tokenizer::{Position, Token, TokenKind};

/// Parser error types.
#[derive(Debug, Clone)]
pub enum ParseError {
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        position: Position,
    },
    UnexpectedEndOfInput {
        expected: String,
        position: Position,
    },
    InvalidSyntax {
        message: String,
        position: Position,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnexpectedToken {
                expected,
                found,
                position,
            } => {
                write!(
                    f,
                    "Expected {} but found {:?} at line {}, column {}",
                    expected, found, position.line, position.column
                )
            }
            ParseError::UnexpectedEndOfInput { expected, position } => {
                write!(
                    f,
                    "Unexpected end of input, expected {} at line {}, column {}",
                    expected, position.line, position.column
                )
            }
            ParseError::InvalidSyntax { message, position } => {
                write!(
                    f,
                    "Invalid syntax: {} at line {}, column {}",
                    message, position.line, position.column
                )
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Recursive descent parser for the cell dialect.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        // The tokenizer always ends the stream with Eof; guard against
        // callers handing over a bare vector anyway.
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, Position::new(1, 1, 0), 0));
        }
        Self { tokens, current: 0 }
    }

    /// Parse a complete cell or script fragment.
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let position = self.current_position();
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.skip_trivia() {
                continue;
            }
            statements.push(self.parse_statement()?);
        }

        Ok(Program::new(statements, position))
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let stmt = match &self.peek().kind {
            TokenKind::Let => self.parse_variable_declaration()?,
            TokenKind::Fn => self.parse_function_declaration()?,
            TokenKind::Import => self.parse_import_declaration()?,
            TokenKind::If => return self.parse_if_statement(),
            TokenKind::While => return self.parse_while_statement(),
            TokenKind::For => return self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement()?,
            TokenKind::Break => {
                let position = self.current_position();
                self.advance();
                Stmt::Break { position }
            }
            TokenKind::Continue => {
                let position = self.current_position();
                self.advance();
                Stmt::Continue { position }
            }
            _ => {
                let expr = self.parse_expression()?;
                Stmt::Expression { expr }
            }
        };
        self.consume_terminator()?;
        Ok(stmt)
    }

    fn parse_variable_declaration(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // let
        let mutable = if self.check(&TokenKind::Mut) {
            self.advance();
            true
        } else {
            false
        };
        let name = self.expect_identifier("variable name")?;
        let initializer = if self.check(&TokenKind::Equal) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Stmt::VariableDecl {
            name,
            mutable,
            initializer,
            position,
        })
    }

    fn parse_function_declaration(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // fn
        let name = self.expect_identifier("function name")?;
        self.expect(&TokenKind::LeftParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_identifier("parameter name")?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::FunctionDecl {
            name,
            params,
            body,
            position,
        })
    }

    fn parse_import_declaration(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // import
        let mut path = vec![self.expect_identifier("module name")?];
        while self.check(&TokenKind::Dot) {
            self.advance();
            path.push(self.expect_identifier("module segment")?);
        }
        Ok(Stmt::Import { path, position })
    }

    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // if
        let condition = self.parse_expression()?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.check(&TokenKind::Else) {
            self.advance();
            if self.check(&TokenKind::If) {
                Some(vec![self.parse_if_statement()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            position,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // while
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::While {
            condition,
            body,
            position,
        })
    }

    fn parse_for_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // for
        let variable = self.expect_identifier("loop variable")?;
        self.expect(&TokenKind::In, "'in'")?;
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            variable,
            iterable,
            body,
            position,
        })
    }

    fn parse_return_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // return
        let value = if self.is_terminator() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        Ok(Stmt::Return { value, position })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.skip_newlines();
        self.expect(&TokenKind::LeftBrace, "'{'")?;
        let mut statements = Vec::new();
        loop {
            if self.skip_trivia() {
                continue;
            }
            if self.check(&TokenKind::RightBrace) {
                break;
            }
            if self.is_at_end() {
                return Err(ParseError::UnexpectedEndOfInput {
                    expected: "'}'".to_string(),
                    position: self.current_position(),
                });
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RightBrace, "'}'")?;
        Ok(statements)
    }

    //=============================================
    // Expressions
    //=============================================

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_logical_or()?;

        if let Some(op) = self.match_compound_assignment() {
            let position = expr.position().clone();
            let value = self.parse_assignment()?;
            let combined = Expr::Binary {
                left: Box::new(expr.clone()),
                operator: op,
                right: Box::new(value),
                position: position.clone(),
            };
            let target = self.assignment_target_from_expr(expr)?;
            return Ok(Expr::Assignment {
                target,
                value: Box::new(combined),
                position,
            });
        }

        if self.check(&TokenKind::Equal) {
            let position = expr.position().clone();
            self.advance();
            let value = self.parse_assignment()?;
            let target = self.assignment_target_from_expr(expr)?;
            return Ok(Expr::Assignment {
                target,
                value: Box::new(value),
                position,
            });
        }

        Ok(expr)
    }

    fn match_compound_assignment(&mut self) -> Option<BinaryOp> {
        let op = match self.peek().kind {
            TokenKind::PlusEqual => Some(BinaryOp::Add),
            TokenKind::MinusEqual => Some(BinaryOp::Subtract),
            TokenKind::StarEqual => Some(BinaryOp::Multiply),
            TokenKind::SlashEqual => Some(BinaryOp::Divide),
            _ => None,
        }?;
        self.advance();
        Some(op)
    }

    fn assignment_target_from_expr(&self, expr: Expr) -> Result<AssignTarget, ParseError> {
        match expr {
            Expr::Identifier { name, .. } => Ok(AssignTarget::Variable(name)),
            Expr::Index { object, index, .. } => Ok(AssignTarget::Index { object, index }),
            Expr::Member {
                object, property, ..
            } => Ok(AssignTarget::Member { object, property }),
            other => Err(ParseError::InvalidSyntax {
                message: "unsupported assignment target".to_string(),
                position: other.position().clone(),
            }),
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_logical_and()?;
        while self.check(&TokenKind::Or) {
            let position = self.current_position();
            self.advance();
            let right = self.parse_logical_and()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator: BinaryOp::Or,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_equality()?;
        while self.check(&TokenKind::And) {
            let position = self.current_position();
            self.advance();
            let right = self.parse_equality()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator: BinaryOp::And,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_comparison()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::EqualEqual => BinaryOp::Equal,
                TokenKind::NotEqual => BinaryOp::NotEqual,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_term()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_factor()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Modulo,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let operator = match self.peek().kind {
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Minus),
            _ => None,
        };
        if let Some(operator) = operator {
            let position = self.current_position();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                operator,
                operand: Box::new(operand),
                position,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::LeftParen => {
                    let position = self.current_position();
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RightParen) {
                        loop {
                            args.push(self.parse_expression()?);
                            if self.check(&TokenKind::Comma) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RightParen, "')'")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        position,
                    };
                }
                TokenKind::LeftBracket => {
                    let position = self.current_position();
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&TokenKind::RightBracket, "']'")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        position,
                    };
                }
                TokenKind::Dot => {
                    let position = self.current_position();
                    self.advance();
                    let property = self.expect_identifier("member name")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        position,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Integer(n),
                    position,
                })
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Float(f),
                    position,
                })
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::String(s),
                    position,
                })
            }
            TokenKind::Boolean(b) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Boolean(b),
                    position,
                })
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Null,
                    position,
                })
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Identifier { name, position })
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                self.skip_newlines();
                if !self.check(&TokenKind::RightBracket) {
                    loop {
                        self.skip_newlines();
                        elements.push(self.parse_expression()?);
                        self.skip_newlines();
                        if self.check(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.skip_newlines();
                self.expect(&TokenKind::RightBracket, "']'")?;
                Ok(Expr::Literal {
                    value: Literal::Array(elements),
                    position,
                })
            }
            TokenKind::LeftBrace => {
                self.advance();
                let mut fields = Vec::new();
                self.skip_newlines();
                if !self.check(&TokenKind::RightBrace) {
                    loop {
                        self.skip_newlines();
                        let key = self.expect_identifier("field name")?;
                        self.expect(&TokenKind::Colon, "':'")?;
                        let value = self.parse_expression()?;
                        fields.push((key, value));
                        self.skip_newlines();
                        if self.check(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.skip_newlines();
                self.expect(&TokenKind::RightBrace, "'}'")?;
                Ok(Expr::Literal {
                    value: Literal::Object(fields),
                    position,
                })
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEndOfInput {
                expected: "expression".to_string(),
                position,
            }),
            other => Err(ParseError::UnexpectedToken {
                expected: "expression".to_string(),
                found: other,
                position,
            }),
        }
    }

    //=============================================
    // Token stream helpers
    //=============================================

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn current_position(&self) -> Position {
        self.peek().position.clone()
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else if self.is_at_end() {
            Err(ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: self.current_position(),
            })
        } else {
            Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.peek().kind.clone(),
                position: self.current_position(),
            })
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: self.current_position(),
            }),
            other => Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: other.clone(),
                position: self.current_position(),
            }),
        }
    }

    /// Skip one newline, comment, or empty-statement token at statement
    /// level; returns true when one was consumed.
    fn skip_trivia(&mut self) -> bool {
        match self.peek().kind {
            TokenKind::Newline | TokenKind::Comment(_) | TokenKind::Semicolon => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline | TokenKind::Comment(_)) {
            self.advance();
        }
    }

    fn is_terminator(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Semicolon
                | TokenKind::Newline
                | TokenKind::RightBrace
                | TokenKind::Eof
                | TokenKind::Comment(_)
        )
    }

    fn consume_terminator(&mut self) -> Result<(), ParseError> {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            return Ok(());
        }
        if self.is_terminator() {
            return Ok(());
        }
        Err(ParseError::UnexpectedToken {
            expected: "';' or end of line".to_string(),
            found: self.peek().kind.clone(),
            position: self.current_position(),
        })
    }
}
