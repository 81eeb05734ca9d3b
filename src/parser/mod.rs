use crate::ast::*;
use crate::error::CompileError;
use crate::scanner::token::{Span, Token, TokenKind};

/// Deepest nesting of groupings, unary operators, operator chains and blocks
/// one statement may have. Bounds the recursion of both the parser and the
/// evaluator.
pub const MAX_NESTING: usize = 128;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    errors: Vec<CompileError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            depth: 0,
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Result<Program, Vec<CompileError>> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.is_at_end() {
            // An error can leave the counter raised; each statement starts flat.
            self.depth = 0;
            match self.terminated_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
            self.skip_separators();
        }
        if self.errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(self.errors)
        }
    }

    /// A statement followed by a separator, a closing brace or the end of input.
    fn terminated_statement(&mut self) -> Result<Stmt, CompileError> {
        let stmt = self.statement()?;
        if self.peek().kind.is_separator() {
            self.advance();
        } else if !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            let token = self.peek();
            return Err(CompileError::parse(
                format!("expected newline or ';' after statement, found '{}'", token.lexeme),
                token.span.offset,
                token.span.len.max(1),
            ));
        }
        Ok(stmt)
    }

    fn statement(&mut self) -> Result<Stmt, CompileError> {
        match self.peek().kind {
            TokenKind::Print => self.print_statement(),
            TokenKind::Exit => self.exit_statement(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            _ => self.assignment_or_expression(),
        }
    }

    fn print_statement(&mut self) -> Result<Stmt, CompileError> {
        let start = self.current_span();
        self.advance(); // consume 'print'
        let expression = self.expression()?;
        let span = self.span_from(start);
        Ok(Stmt::Print(PrintStmt { expression, span }))
    }

    fn exit_statement(&mut self) -> Result<Stmt, CompileError> {
        let start = self.current_span();
        self.advance(); // consume 'exit'
        let value = if self.at_statement_end() {
            None
        } else {
            Some(self.expression()?)
        };
        let span = self.span_from(start);
        Ok(Stmt::Exit(ExitStmt { value, span }))
    }

    fn if_statement(&mut self) -> Result<Stmt, CompileError> {
        let start = self.current_span();
        self.advance(); // consume 'if'
        let condition = self.expression()?;
        let then_branch = self.block("if condition")?;

        // `else` may sit on the line after the closing brace.
        let before_else = self.current;
        while self.check(TokenKind::Newline) {
            self.advance();
        }
        let else_branch = if self.match_token(TokenKind::Else) {
            if self.check(TokenKind::If) {
                self.descend()?;
                let nested = self.if_statement()?;
                self.ascend(1);
                Some(vec![nested])
            } else {
                Some(self.block("'else'")?)
            }
        } else {
            self.current = before_else;
            None
        };

        let span = self.span_from(start);
        Ok(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
            span,
        }))
    }

    fn while_statement(&mut self) -> Result<Stmt, CompileError> {
        let start = self.current_span();
        self.advance(); // consume 'while'
        let condition = self.expression()?;
        let body = self.block("while condition")?;
        let span = self.span_from(start);
        Ok(Stmt::While(WhileStmt {
            condition,
            body,
            span,
        }))
    }

    fn block(&mut self, after: &str) -> Result<Vec<Stmt>, CompileError> {
        self.consume(TokenKind::LeftBrace, &format!("'{{' after {after}"))?;
        self.descend()?;
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.terminated_statement()?);
            self.skip_separators();
        }
        self.consume(TokenKind::RightBrace, "'}' after block")?;
        self.ascend(1);
        Ok(statements)
    }

    fn assignment_or_expression(&mut self) -> Result<Stmt, CompileError> {
        let start = self.current_span();

        let compound = self
            .peek_next()
            .and_then(|t| compound_to_binary_op(t.kind))
            .filter(|_| self.check(TokenKind::Identifier));
        if let Some(operator) = compound {
            let name = self.advance().lexeme.clone();
            self.advance(); // consume operator
            let value = self.expression()?;
            let span = self.span_from(start);
            return Ok(Stmt::CompoundAssign(CompoundAssignStmt {
                name,
                operator,
                value,
                span,
            }));
        }

        let mut lists = vec![self.expression_list()?];
        while self.match_token(TokenKind::Equal) {
            lists.push(self.expression_list()?);
        }
        let span = self.span_from(start);

        let values = lists.pop().unwrap_or_default();
        if lists.is_empty() {
            return match <[Expr; 1]>::try_from(values) {
                Ok([expression]) => Ok(Stmt::Expression(ExprStmt { expression, span })),
                Err(_) => Err(CompileError::parse(
                    "a list of values needs an assignment target",
                    span.offset,
                    span.len.max(1),
                )),
            };
        }

        let mut targets = Vec::with_capacity(lists.len());
        for list in lists {
            if list.len() != values.len() {
                return Err(CompileError::parse(
                    format!(
                        "cannot assign {} value(s) to {} target(s)",
                        values.len(),
                        list.len()
                    ),
                    span.offset,
                    span.len.max(1),
                ));
            }
            let mut names = Vec::with_capacity(list.len());
            for expr in list {
                match expr {
                    Expr::Variable(v) => names.push(v.name),
                    other => {
                        let target = other.span();
                        return Err(CompileError::parse(
                            "invalid assignment target",
                            target.offset,
                            target.len.max(1),
                        ));
                    }
                }
            }
            targets.push(names);
        }

        Ok(Stmt::Assign(AssignStmt {
            targets,
            values,
            span,
        }))
    }

    fn expression_list(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut exprs = vec![self.expression()?];
        while self.match_token(TokenKind::Comma) {
            exprs.push(self.expression()?);
        }
        Ok(exprs)
    }

    fn expression(&mut self) -> Result<Expr, CompileError> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.and()?;
        let mut folds = 0;
        while self.match_token(TokenKind::Or) {
            self.descend()?;
            folds += 1;
            let right = self.and()?;
            let span = expr.span().to(right.span());
            expr = Expr::Logical(LogicalExpr {
                left: Box::new(expr),
                operator: LogicalOp::Or,
                right: Box::new(right),
                span,
            });
        }
        self.ascend(folds);
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.equality()?;
        let mut folds = 0;
        while self.match_token(TokenKind::And) {
            self.descend()?;
            folds += 1;
            let right = self.equality()?;
            let span = expr.span().to(right.span());
            expr = Expr::Logical(LogicalExpr {
                left: Box::new(expr),
                operator: LogicalOp::And,
                right: Box::new(right),
                span,
            });
        }
        self.ascend(folds);
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            &[TokenKind::EqualEqual, TokenKind::BangEqual],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            &[
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(&[TokenKind::Plus, TokenKind::Minus], Self::factor)
    }

    fn factor(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
            Self::unary,
        )
    }

    /// One left-associative precedence level.
    fn binary_level(
        &mut self,
        kinds: &[TokenKind],
        operand: fn(&mut Self) -> Result<Expr, CompileError>,
    ) -> Result<Expr, CompileError> {
        let mut expr = operand(self)?;
        let mut folds = 0;
        while let Some(op) = self.match_binary_op(kinds) {
            self.descend()?;
            folds += 1;
            let right = operand(self)?;
            let span = expr.span().to(right.span());
            expr = Expr::Binary(BinaryExpr {
                left: Box::new(expr),
                operator: op,
                right: Box::new(right),
                span,
            });
        }
        self.ascend(folds);
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        if self.check(TokenKind::Bang) || self.check(TokenKind::Minus) {
            let start = self.current_span();
            let op = if self.match_token(TokenKind::Bang) {
                UnaryOp::Not
            } else {
                self.advance();
                UnaryOp::Negate
            };
            self.descend()?;
            let operand = self.unary()?;
            self.ascend(1);
            let span = start.to(operand.span());
            return Ok(Expr::Unary(UnaryExpr {
                operator: op,
                operand: Box::new(operand),
                span,
            }));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let token = self.peek().clone();
        let literal = |value| {
            Expr::Literal(LiteralExpr {
                value,
                span: token.span,
            })
        };
        match token.kind {
            TokenKind::Integer => {
                self.advance();
                let value = token.lexeme.parse().map_err(|_| {
                    CompileError::parse(
                        format!("invalid integer literal '{}'", token.lexeme),
                        token.span.offset,
                        token.span.len,
                    )
                })?;
                Ok(literal(LiteralValue::Integer(value)))
            }
            TokenKind::Float => {
                self.advance();
                let value = token.lexeme.parse().map_err(|_| {
                    CompileError::parse(
                        format!("invalid float literal '{}'", token.lexeme),
                        token.span.offset,
                        token.span.len,
                    )
                })?;
                Ok(literal(LiteralValue::Float(value)))
            }
            TokenKind::String => {
                self.advance();
                Ok(literal(LiteralValue::String(token.lexeme.clone())))
            }
            TokenKind::True => {
                self.advance();
                Ok(literal(LiteralValue::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(literal(LiteralValue::Bool(false)))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(literal(LiteralValue::Nil))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr::Variable(VariableExpr {
                    name: token.lexeme.clone(),
                    span: token.span,
                }))
            }
            TokenKind::LeftParen => {
                self.advance();
                self.descend()?;
                let expr = self.expression()?;
                self.consume(TokenKind::RightParen, "')' after expression")?;
                self.ascend(1);
                let span = self.span_from(token.span);
                Ok(Expr::Grouping(GroupingExpr {
                    expression: Box::new(expr),
                    span,
                }))
            }
            _ => Err(CompileError::parse(
                format!("expected expression, found '{}'", describe(&token)),
                token.span.offset,
                token.span.len.max(1),
            )),
        }
    }

    // --- Helper methods ---

    fn descend(&mut self) -> Result<(), CompileError> {
        if self.depth >= MAX_NESTING {
            let token = self.peek();
            return Err(CompileError::parse(
                "expression nested too deeply",
                token.span.offset,
                token.span.len.max(1),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.current + 1)
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn at_statement_end(&self) -> bool {
        let kind = self.peek().kind;
        kind.is_separator() || kind == TokenKind::RightBrace || kind == TokenKind::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_binary_op(&mut self, kinds: &[TokenKind]) -> Option<BinaryOp> {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return Some(token_to_binary_op(kind));
            }
        }
        None
    }

    fn skip_separators(&mut self) {
        while self.peek().kind.is_separator() {
            self.advance();
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token, CompileError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(CompileError::parse(
                format!("expected {message}, found '{}'", describe(token)),
                token.span.offset,
                token.span.len.max(1),
            ))
        }
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.current.saturating_sub(1)].span
    }

    fn span_from(&self, start: Span) -> Span {
        start.to(self.previous_span())
    }

    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.tokens[self.current - 1].kind.is_separator() {
                return;
            }
            match self.peek().kind {
                TokenKind::Print | TokenKind::Exit | TokenKind::If | TokenKind::While => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

/// Lexeme for error messages; layout tokens have no useful lexeme.
fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Newline | TokenKind::Eof => token.kind.to_string(),
        _ => token.lexeme.clone(),
    }
}

fn token_to_binary_op(kind: TokenKind) -> BinaryOp {
    match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Subtract,
        TokenKind::Star => BinaryOp::Multiply,
        TokenKind::Slash => BinaryOp::Divide,
        TokenKind::Percent => BinaryOp::Remainder,
        TokenKind::EqualEqual => BinaryOp::Equal,
        TokenKind::BangEqual => BinaryOp::NotEqual,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::LessEqual => BinaryOp::LessEqual,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
        _ => unreachable!("only called with matched operator tokens"),
    }
}

fn compound_to_binary_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::PlusEqual => Some(BinaryOp::Add),
        TokenKind::MinusEqual => Some(BinaryOp::Subtract),
        TokenKind::StarEqual => Some(BinaryOp::Multiply),
        TokenKind::SlashEqual => Some(BinaryOp::Divide),
        TokenKind::PercentEqual => Some(BinaryOp::Remainder),
        _ => None,
    }
}
