//! Recursive descent parser for candidate programs

use std::sync::Arc;

use fnforge_core::ast::{
    Argument, ArrayElement, AssignOp, BinaryOp, CatchClause, DeclKind, Declarator, Expr,
    Function, FunctionBody, Item, Literal, LogicalOp, MemberProperty, Param, Pattern,
    PatternElement, Program, Property, PropertyPattern, Stmt, SwitchCase, UnaryOp, UpdateOp,
};
use tracing::trace;

use crate::error::ParseError;
use crate::lexer::{process_string_escapes, tokenize, SpannedToken, Token};

/// Default nesting limit for statements and expressions
pub const DEFAULT_MAX_DEPTH: usize = 128;

type ParseResult<T> = Result<T, ParseError>;

/// Binary operator classes, ordered by binding power
#[derive(Debug, Clone, Copy)]
enum BinaryKind {
    Logical(LogicalOp),
    Binary(BinaryOp),
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<SpannedToken<'a>>,
    position: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> ParseResult<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            position: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn parse_program(mut self) -> ParseResult<Program> {
        let mut items = Vec::new();

        while !self.at_end() {
            let start = self.current_span_start();
            let stmt = self.parse_statement()?;
            let end = self.last_end().max(start);
            items.push(Item {
                stmt,
                span: start..end,
            });
        }

        trace!(statements = items.len(), "parsed program");
        Ok(Program::new(items))
    }

    pub fn parse_standalone_expression(mut self) -> ParseResult<Expr> {
        let expr = self.parse_expression()?;
        if !self.at_end() {
            return Err(self.error_here("end of input"));
        }
        Ok(expr)
    }

    // ----- statements -----

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        self.descend()?;
        let result = self.parse_statement_inner();
        self.ascend();
        result
    }

    fn parse_statement_inner(&mut self) -> ParseResult<Stmt> {
        match self.current() {
            Some(Token::LBrace) => Ok(Stmt::Block(self.parse_block()?)),
            Some(Token::Var) | Some(Token::Let) | Some(Token::Const) => {
                let decl = self.parse_var_declaration()?;
                self.consume_semicolon()?;
                Ok(decl)
            }
            Some(Token::Function) => {
                let function = self.parse_function(true)?;
                Ok(Stmt::FunctionDecl(function))
            }
            Some(Token::Return) => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                Ok(Stmt::Return(value))
            }
            Some(Token::If) => self.parse_if_statement(),
            Some(Token::For) => self.parse_for_statement(),
            Some(Token::While) => {
                self.advance();
                self.consume(Token::LParen, "'('")?;
                let test = self.parse_expression()?;
                self.consume(Token::RParen, "')'")?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While { test, body })
            }
            Some(Token::Do) => {
                self.advance();
                let body = Box::new(self.parse_statement()?);
                self.consume(Token::While, "'while'")?;
                self.consume(Token::LParen, "'('")?;
                let test = self.parse_expression()?;
                self.consume(Token::RParen, "')'")?;
                if self.check(&Token::Semicolon) {
                    self.advance();
                }
                Ok(Stmt::DoWhile { body, test })
            }
            Some(Token::Break) => {
                self.advance();
                let label = self.parse_jump_label();
                self.consume_semicolon()?;
                Ok(Stmt::Break(label))
            }
            Some(Token::Continue) => {
                self.advance();
                let label = self.parse_jump_label();
                self.consume_semicolon()?;
                Ok(Stmt::Continue(label))
            }
            Some(Token::Ident(name)) if self.peek(1) == Some(&Token::Colon) => {
                let label = name.to_string();
                self.advance();
                self.advance();
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::Labeled { label, body })
            }
            Some(Token::Throw) => {
                self.advance();
                let value = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Throw(value))
            }
            Some(Token::Try) => self.parse_try_statement(),
            Some(Token::Switch) => self.parse_switch_statement(),
            Some(Token::Semicolon) => {
                self.advance();
                Ok(Stmt::Empty)
            }
            Some(_) => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Expr(expr))
            }
            None => Err(self.error_here("statement")),
        }
    }

    /// Label after `break`/`continue` on the same line
    fn parse_jump_label(&mut self) -> Option<String> {
        match self.current() {
            Some(Token::Ident(name)) if !self.newline_before() => {
                let label = name.to_string();
                self.advance();
                Some(label)
            }
            _ => None,
        }
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.consume(Token::LBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.at_end() {
                return Err(self.error_here("'}'"));
            }
            body.push(self.parse_statement()?);
        }
        self.consume(Token::RBrace, "'}'")?;
        Ok(body)
    }

    fn parse_decl_kind(&mut self) -> ParseResult<DeclKind> {
        let kind = match self.current() {
            Some(Token::Var) => DeclKind::Var,
            Some(Token::Let) => DeclKind::Let,
            Some(Token::Const) => DeclKind::Const,
            _ => return Err(self.error_here("'var', 'let' or 'const'")),
        };
        self.advance();
        Ok(kind)
    }

    fn parse_var_declaration(&mut self) -> ParseResult<Stmt> {
        let kind = self.parse_decl_kind()?;
        let first = self.parse_binding_pattern()?;
        self.parse_declarators(kind, first)
    }

    /// Remaining declarators once the first pattern has been read
    fn parse_declarators(&mut self, kind: DeclKind, first: Pattern) -> ParseResult<Stmt> {
        let mut declarations = Vec::new();
        let mut pattern = first;

        loop {
            let init = if self.check(&Token::Eq) {
                self.advance();
                Some(self.parse_assignment()?)
            } else {
                None
            };

            if kind == DeclKind::Const && init.is_none() {
                return Err(self.syntax_error("missing initializer in const declaration"));
            }
            declarations.push(Declarator { pattern, init });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
            pattern = self.parse_binding_pattern()?;
        }

        Ok(Stmt::VarDecl { kind, declarations })
    }

    fn parse_if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Token::If, "'if'")?;
        self.consume(Token::LParen, "'('")?;
        let test = self.parse_expression()?;
        self.consume(Token::RParen, "')'")?;
        let consequent = Box::new(self.parse_statement()?);

        let alternate = if self.check(&Token::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Token::For, "'for'")?;
        self.consume(Token::LParen, "'('")?;

        let init = match self.current() {
            Some(Token::Semicolon) => None,
            Some(Token::Var) | Some(Token::Let) | Some(Token::Const) => {
                let kind = self.parse_decl_kind()?;
                let pattern = self.parse_binding_pattern()?;

                if self.check_contextual("of") {
                    self.advance();
                    let iterable = self.parse_assignment()?;
                    self.consume(Token::RParen, "')'")?;
                    let body = Box::new(self.parse_statement()?);
                    return Ok(Stmt::ForOf {
                        kind,
                        pattern,
                        iterable,
                        body,
                    });
                }
                if self.check(&Token::In) {
                    self.advance();
                    let object = self.parse_expression()?;
                    self.consume(Token::RParen, "')'")?;
                    let body = Box::new(self.parse_statement()?);
                    return Ok(Stmt::ForIn {
                        kind,
                        pattern,
                        object,
                        body,
                    });
                }

                Some(Box::new(self.parse_declarators(kind, pattern)?))
            }
            Some(_) => {
                let expr = self.parse_expression()?;

                if let Expr::Ident(name) = &expr {
                    if self.check_contextual("of") {
                        let pattern = Pattern::Ident(name.clone());
                        self.advance();
                        let iterable = self.parse_assignment()?;
                        self.consume(Token::RParen, "')'")?;
                        let body = Box::new(self.parse_statement()?);
                        return Ok(Stmt::ForOf {
                            kind: DeclKind::Var,
                            pattern,
                            iterable,
                            body,
                        });
                    }
                }
                if let Expr::Binary {
                    op: BinaryOp::In,
                    left,
                    right,
                } = &expr
                {
                    if let Expr::Ident(name) = left.as_ref() {
                        if self.check(&Token::RParen) {
                            let pattern = Pattern::Ident(name.clone());
                            let object = right.as_ref().clone();
                            self.advance();
                            let body = Box::new(self.parse_statement()?);
                            return Ok(Stmt::ForIn {
                                kind: DeclKind::Var,
                                pattern,
                                object,
                                body,
                            });
                        }
                    }
                }

                Some(Box::new(Stmt::Expr(expr)))
            }
            None => return Err(self.error_here("for loop header")),
        };

        self.consume(Token::Semicolon, "';'")?;
        let test = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(Token::Semicolon, "';'")?;
        let update = if self.check(&Token::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(Token::RParen, "')'")?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn parse_try_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Token::Try, "'try'")?;
        let block = self.parse_block()?;

        let handler = if self.check(&Token::Catch) {
            self.advance();
            let param = if self.check(&Token::LParen) {
                self.advance();
                let pattern = self.parse_binding_pattern()?;
                self.consume(Token::RParen, "')'")?;
                Some(pattern)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.check(&Token::Finally) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_here("'catch' or 'finally'"));
        }

        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_switch_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Token::Switch, "'switch'")?;
        self.consume(Token::LParen, "'('")?;
        let discriminant = self.parse_expression()?;
        self.consume(Token::RParen, "')'")?;
        self.consume(Token::LBrace, "'{'")?;

        let mut cases = Vec::new();
        let mut seen_default = false;

        while !self.check(&Token::RBrace) {
            let test = match self.current() {
                Some(Token::Case) => {
                    self.advance();
                    Some(self.parse_expression()?)
                }
                Some(Token::Default) => {
                    if seen_default {
                        return Err(self.syntax_error("more than one default clause in switch"));
                    }
                    seen_default = true;
                    self.advance();
                    None
                }
                _ => return Err(self.error_here("'case' or 'default'")),
            };
            self.consume(Token::Colon, "':'")?;

            let mut body = Vec::new();
            while !matches!(
                self.current(),
                Some(Token::Case) | Some(Token::Default) | Some(Token::RBrace)
            ) {
                if self.at_end() {
                    return Err(self.error_here("'}'"));
                }
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body });
        }

        self.consume(Token::RBrace, "'}'")?;
        Ok(Stmt::Switch {
            discriminant,
            cases,
        })
    }

    // ----- patterns and functions -----

    fn parse_binding_pattern(&mut self) -> ParseResult<Pattern> {
        match self.current() {
            Some(Token::Ident(name)) => {
                let name = name.to_string();
                self.advance();
                Ok(Pattern::Ident(name))
            }
            Some(Token::LBracket) => self.parse_array_pattern(),
            Some(Token::LBrace) => self.parse_object_pattern(),
            _ => Err(self.error_here("binding name or pattern")),
        }
    }

    fn parse_array_pattern(&mut self) -> ParseResult<Pattern> {
        self.consume(Token::LBracket, "'['")?;
        let mut elements = Vec::new();
        let mut rest = None;

        while !self.check(&Token::RBracket) {
            if self.check(&Token::Comma) {
                self.advance();
                elements.push(None);
                continue;
            }
            if self.check(&Token::DotDotDot) {
                self.advance();
                rest = Some(Box::new(self.parse_binding_pattern()?));
                break;
            }

            let pattern = self.parse_binding_pattern()?;
            let default = self.parse_optional_default()?;
            elements.push(Some(PatternElement { pattern, default }));

            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.consume(Token::RBracket, "']'")?;
        Ok(Pattern::Array { elements, rest })
    }

    fn parse_object_pattern(&mut self) -> ParseResult<Pattern> {
        self.consume(Token::LBrace, "'{'")?;
        let mut properties = Vec::new();
        let mut rest = None;

        while !self.check(&Token::RBrace) {
            if self.check(&Token::DotDotDot) {
                self.advance();
                match self.current() {
                    Some(Token::Ident(name)) => {
                        rest = Some(name.to_string());
                        self.advance();
                    }
                    _ => return Err(self.error_here("rest binding name")),
                }
                break;
            }

            let shorthand = matches!(self.current(), Some(Token::Ident(_)));
            let key = self.parse_property_name()?;
            let value = if self.check(&Token::Colon) {
                self.advance();
                self.parse_binding_pattern()?
            } else if shorthand {
                Pattern::Ident(key.clone())
            } else {
                return Err(self.error_here("':'"));
            };
            let default = self.parse_optional_default()?;
            properties.push(PropertyPattern {
                key,
                value,
                default,
            });

            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.consume(Token::RBrace, "'}'")?;
        Ok(Pattern::Object { properties, rest })
    }

    fn parse_optional_default(&mut self) -> ParseResult<Option<Expr>> {
        if self.check(&Token::Eq) {
            self.advance();
            Ok(Some(self.parse_assignment()?))
        } else {
            Ok(None)
        }
    }

    fn parse_function(&mut self, require_name: bool) -> ParseResult<Arc<Function>> {
        self.consume(Token::Function, "'function'")?;

        let name = match self.current() {
            Some(Token::Ident(name)) => {
                let name = name.to_string();
                self.advance();
                Some(name)
            }
            _ if require_name => return Err(self.error_here("function name")),
            _ => None,
        };

        let params = self.parse_params()?;
        let body = FunctionBody::Block(self.parse_block()?);

        Ok(Arc::new(Function {
            name,
            params,
            body,
            is_arrow: false,
        }))
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        self.consume(Token::LParen, "'('")?;
        let mut params = Vec::new();

        while !self.check(&Token::RParen) {
            if self.check(&Token::DotDotDot) {
                self.advance();
                let pattern = self.parse_binding_pattern()?;
                params.push(Param {
                    pattern,
                    default: None,
                    rest: true,
                });
                break;
            }

            let pattern = self.parse_binding_pattern()?;
            let default = self.parse_optional_default()?;
            params.push(Param {
                pattern,
                default,
                rest: false,
            });

            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.consume(Token::RParen, "')'")?;
        Ok(params)
    }

    fn parse_arrow_function(&mut self) -> ParseResult<Expr> {
        let params = match self.current() {
            Some(Token::Ident(name)) => {
                let name = name.to_string();
                self.advance();
                vec![Param {
                    pattern: Pattern::Ident(name),
                    default: None,
                    rest: false,
                }]
            }
            _ => self.parse_params()?,
        };

        self.consume(Token::FatArrow, "'=>'")?;

        let body = if self.check(&Token::LBrace) {
            FunctionBody::Block(self.parse_block()?)
        } else {
            FunctionBody::Expr(Box::new(self.parse_assignment()?))
        };

        Ok(Expr::Function(Arc::new(Function {
            name: None,
            params,
            body,
            is_arrow: true,
        })))
    }

    /// Whether the parenthesised group at the cursor is an arrow parameter list
    fn is_arrow_params(&self) -> bool {
        let mut depth = 0usize;
        for (offset, spanned) in self.tokens[self.position..].iter().enumerate() {
            match spanned.token {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(self.position + offset + 1).map(|t| &t.token),
                            Some(Token::FatArrow)
                        );
                    }
                }
                _ => {}
            }
        }
        false
    }

    // ----- expressions -----

    pub(crate) fn parse_expression(&mut self) -> ParseResult<Expr> {
        let first = self.parse_assignment()?;
        if !self.check(&Token::Comma) {
            return Ok(first);
        }

        let mut exprs = vec![first];
        while self.check(&Token::Comma) {
            self.advance();
            exprs.push(self.parse_assignment()?);
        }
        Ok(Expr::Sequence(exprs))
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        self.descend()?;
        let result = self.parse_assignment_inner();
        self.ascend();
        result
    }

    fn parse_assignment_inner(&mut self) -> ParseResult<Expr> {
        match self.current() {
            Some(Token::Ident(_)) if matches!(self.peek(1), Some(Token::FatArrow)) => {
                return self.parse_arrow_function();
            }
            Some(Token::LParen) if self.is_arrow_params() => {
                return self.parse_arrow_function();
            }
            _ => {}
        }

        let target = self.parse_conditional()?;

        let op = match self.current() {
            Some(Token::Eq) => AssignOp::Assign,
            Some(Token::PlusEq) => AssignOp::Add,
            Some(Token::MinusEq) => AssignOp::Sub,
            Some(Token::StarEq) => AssignOp::Mul,
            Some(Token::SlashEq) => AssignOp::Div,
            Some(Token::PercentEq) => AssignOp::Rem,
            Some(Token::StarStarEq) => AssignOp::Pow,
            Some(Token::AndAndEq) => AssignOp::And,
            Some(Token::OrOrEq) => AssignOp::Or,
            Some(Token::QuestionQuestionEq) => AssignOp::Nullish,
            _ => return Ok(target),
        };

        let valid_target = match &target {
            Expr::Ident(_) | Expr::Member { optional: false, .. } => true,
            Expr::Array(_) | Expr::Object(_) => op == AssignOp::Assign,
            _ => false,
        };
        if !valid_target {
            return Err(self.syntax_error("invalid assignment target"));
        }

        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let test = self.parse_binary(0)?;
        if !self.check(&Token::Question) {
            return Ok(test);
        }

        self.advance();
        let consequent = self.parse_assignment()?;
        self.consume(Token::Colon, "':'")?;
        let alternate = self.parse_assignment()?;

        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn binary_operator(&self) -> Option<(u8, BinaryKind)> {
        let entry = match self.current()? {
            Token::QuestionQuestion => (1, BinaryKind::Logical(LogicalOp::Nullish)),
            Token::OrOr => (2, BinaryKind::Logical(LogicalOp::Or)),
            Token::AndAnd => (3, BinaryKind::Logical(LogicalOp::And)),
            Token::Pipe => (4, BinaryKind::Binary(BinaryOp::BitOr)),
            Token::Caret => (5, BinaryKind::Binary(BinaryOp::BitXor)),
            Token::Amp => (6, BinaryKind::Binary(BinaryOp::BitAnd)),
            Token::EqEq => (7, BinaryKind::Binary(BinaryOp::Eq)),
            Token::NotEq => (7, BinaryKind::Binary(BinaryOp::NotEq)),
            Token::EqEqEq => (7, BinaryKind::Binary(BinaryOp::StrictEq)),
            Token::NotEqEq => (7, BinaryKind::Binary(BinaryOp::StrictNotEq)),
            Token::Less => (8, BinaryKind::Binary(BinaryOp::Lt)),
            Token::LessEq => (8, BinaryKind::Binary(BinaryOp::LtEq)),
            Token::Greater => (8, BinaryKind::Binary(BinaryOp::Gt)),
            Token::GreaterEq => (8, BinaryKind::Binary(BinaryOp::GtEq)),
            Token::In => (8, BinaryKind::Binary(BinaryOp::In)),
            Token::InstanceOf => (8, BinaryKind::Binary(BinaryOp::InstanceOf)),
            Token::Shl => (9, BinaryKind::Binary(BinaryOp::Shl)),
            Token::Shr => (9, BinaryKind::Binary(BinaryOp::Shr)),
            Token::UShr => (9, BinaryKind::Binary(BinaryOp::UShr)),
            Token::Plus => (10, BinaryKind::Binary(BinaryOp::Add)),
            Token::Minus => (10, BinaryKind::Binary(BinaryOp::Sub)),
            Token::Star => (11, BinaryKind::Binary(BinaryOp::Mul)),
            Token::Slash => (11, BinaryKind::Binary(BinaryOp::Div)),
            Token::Percent => (11, BinaryKind::Binary(BinaryOp::Rem)),
            _ => return None,
        };
        Some(entry)
    }

    /// Precedence climbing over the left-associative binary operators
    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        while let Some((precedence, kind)) = self.binary_operator() {
            if precedence <= min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence)?;
            left = match kind {
                BinaryKind::Logical(op) => Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                BinaryKind::Binary(op) => Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        self.descend()?;
        let result = self.parse_unary_inner();
        self.ascend();
        result
    }

    fn parse_unary_inner(&mut self) -> ParseResult<Expr> {
        let op = match self.current() {
            Some(Token::Bang) => Some(UnaryOp::Not),
            Some(Token::Minus) => Some(UnaryOp::Minus),
            Some(Token::Plus) => Some(UnaryOp::Plus),
            Some(Token::Tilde) => Some(UnaryOp::BitNot),
            Some(Token::TypeOf) => Some(UnaryOp::TypeOf),
            Some(Token::Void) => Some(UnaryOp::Void),
            Some(Token::Delete) => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let arg = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                arg: Box::new(arg),
            });
        }

        let update = match self.current() {
            Some(Token::PlusPlus) => Some(UpdateOp::Increment),
            Some(Token::MinusMinus) => Some(UpdateOp::Decrement),
            _ => None,
        };
        if let Some(op) = update {
            self.advance();
            let target = self.parse_unary()?;
            self.check_update_target(&target)?;
            return Ok(Expr::Update {
                op,
                prefix: true,
                target: Box::new(target),
            });
        }

        let base = self.parse_postfix()?;
        if self.check(&Token::StarStar) {
            self.advance();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn check_update_target(&self, target: &Expr) -> ParseResult<()> {
        match target {
            Expr::Ident(_) | Expr::Member { optional: false, .. } => Ok(()),
            _ => Err(self.syntax_error("invalid increment/decrement operand")),
        }
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_call_member()?;

        let op = match self.current() {
            Some(Token::PlusPlus) if !self.newline_before() => UpdateOp::Increment,
            Some(Token::MinusMinus) if !self.newline_before() => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        self.check_update_target(&expr)?;
        self.advance();
        Ok(Expr::Update {
            op,
            prefix: false,
            target: Box::new(expr),
        })
    }

    fn parse_call_member(&mut self) -> ParseResult<Expr> {
        let mut expr = if self.check(&Token::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary()?
        };

        loop {
            match self.current() {
                Some(Token::Dot) => {
                    self.advance();
                    let name = self.parse_property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: MemberProperty::Named(name),
                        optional: false,
                    };
                }
                Some(Token::OptionalChain) => {
                    self.advance();
                    expr = match self.current() {
                        Some(Token::LParen) => Expr::Call {
                            callee: Box::new(expr),
                            args: self.parse_arguments()?,
                            optional: true,
                        },
                        Some(Token::LBracket) => {
                            self.advance();
                            let index = self.parse_expression()?;
                            self.consume(Token::RBracket, "']'")?;
                            Expr::Member {
                                object: Box::new(expr),
                                property: MemberProperty::Computed(Box::new(index)),
                                optional: true,
                            }
                        }
                        _ => Expr::Member {
                            object: Box::new(expr),
                            property: MemberProperty::Named(self.parse_property_name()?),
                            optional: true,
                        },
                    };
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.consume(Token::RBracket, "']'")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: MemberProperty::Computed(Box::new(index)),
                        optional: false,
                    };
                }
                Some(Token::LParen) => {
                    let args = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: false,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_new_expression(&mut self) -> ParseResult<Expr> {
        self.consume(Token::New, "'new'")?;

        let mut callee = self.parse_primary()?;
        while self.check(&Token::Dot) {
            self.advance();
            let name = self.parse_property_name()?;
            callee = Expr::Member {
                object: Box::new(callee),
                property: MemberProperty::Named(name),
                optional: false,
            };
        }

        let args = if self.check(&Token::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(Expr::New {
            callee: Box::new(callee),
            args,
        })
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Argument>> {
        self.consume(Token::LParen, "'('")?;
        let mut args = Vec::new();

        while !self.check(&Token::RParen) {
            if self.check(&Token::DotDotDot) {
                self.advance();
                args.push(Argument::Spread(self.parse_assignment()?));
            } else {
                args.push(Argument::Expr(self.parse_assignment()?));
            }

            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.consume(Token::RParen, "')'")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let Some(spanned) = self.tokens.get(self.position).cloned() else {
            return Err(self.error_here("expression"));
        };

        match spanned.token {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(n)))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            Token::Template(raw) => {
                self.advance();
                self.parse_template(raw, spanned.span.start + 1)
            }
            Token::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            Token::Null => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Expr::Ident(name.to_string()))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::LBracket => self.parse_array_literal(),
            Token::LBrace => self.parse_object_literal(),
            Token::Function => Ok(Expr::Function(self.parse_function(false)?)),
            Token::Slash | Token::SlashEq => {
                Err(self.syntax_error("regular expression literals are not supported"))
            }
            _ => Err(self.error_here("expression")),
        }
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        self.consume(Token::LBracket, "'['")?;
        let mut elements = Vec::new();

        while !self.check(&Token::RBracket) {
            if self.check(&Token::Comma) {
                self.advance();
                elements.push(ArrayElement::Hole);
                continue;
            }

            if self.check(&Token::DotDotDot) {
                self.advance();
                elements.push(ArrayElement::Spread(self.parse_assignment()?));
            } else {
                elements.push(ArrayElement::Expr(self.parse_assignment()?));
            }

            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.consume(Token::RBracket, "']'")?;
        Ok(Expr::Array(elements))
    }

    fn parse_object_literal(&mut self) -> ParseResult<Expr> {
        self.consume(Token::LBrace, "'{'")?;
        let mut properties = Vec::new();

        while !self.check(&Token::RBrace) {
            if self.check(&Token::DotDotDot) {
                self.advance();
                properties.push(Property::Spread(self.parse_assignment()?));
            } else if self.check(&Token::LBracket) {
                self.advance();
                let key = self.parse_assignment()?;
                self.consume(Token::RBracket, "']'")?;
                self.consume(Token::Colon, "':'")?;
                let value = self.parse_assignment()?;
                properties.push(Property::Computed(key, value));
            } else {
                let shorthand = matches!(self.current(), Some(Token::Ident(_)));
                let key = self.parse_property_name()?;

                let value = match self.current() {
                    Some(Token::Colon) => {
                        self.advance();
                        self.parse_assignment()?
                    }
                    Some(Token::LParen) => {
                        let params = self.parse_params()?;
                        let body = FunctionBody::Block(self.parse_block()?);
                        Expr::Function(Arc::new(Function {
                            name: Some(key.clone()),
                            params,
                            body,
                            is_arrow: false,
                        }))
                    }
                    _ if shorthand => Expr::Ident(key.clone()),
                    _ => return Err(self.error_here("':'")),
                };
                properties.push(Property::KeyValue(key, value));
            }

            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.consume(Token::RBrace, "'}'")?;
        Ok(Expr::Object(properties))
    }

    /// Property names may be identifiers, keywords, strings or numbers
    fn parse_property_name(&mut self) -> ParseResult<String> {
        let name = match self.current() {
            Some(Token::Ident(name)) => name.to_string(),
            Some(Token::String(s)) => s.clone(),
            Some(Token::Number(n)) => number_key(*n),
            Some(token) => match keyword_text(token) {
                Some(text) => text.to_string(),
                None => return Err(self.error_here("property name")),
            },
            None => return Err(self.error_here("property name")),
        };
        self.advance();
        Ok(name)
    }

    /// Split a template body into literal chunks and parsed interpolations
    fn parse_template(&self, raw: &str, base: usize) -> ParseResult<Expr> {
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut chunk_start = 0;
        let bytes = raw.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    quasis.push(self.template_chunk(&raw[chunk_start..i], base + chunk_start)?);

                    let inner_start = i + 2;
                    let inner_end = find_interpolation_end(raw, inner_start).ok_or_else(|| {
                        ParseError::InvalidSyntax {
                            position: base + i,
                            message: "unterminated template interpolation".to_string(),
                        }
                    })?;

                    let remaining = self.max_depth.saturating_sub(self.depth);
                    let expr = Parser::new(&raw[inner_start..inner_end])
                        .and_then(|p| p.with_max_depth(remaining).parse_standalone_expression())
                        .map_err(|e| offset_error(e, base + inner_start))?;
                    exprs.push(expr);

                    i = inner_end + 1;
                    chunk_start = i;
                }
                _ => i += 1,
            }
        }

        quasis.push(self.template_chunk(&raw[chunk_start.min(raw.len())..], base + chunk_start)?);
        Ok(Expr::Template { quasis, exprs })
    }

    fn template_chunk(&self, text: &str, position: usize) -> ParseResult<String> {
        process_string_escapes(text).ok_or_else(|| ParseError::InvalidSyntax {
            position,
            message: "invalid escape sequence in template literal".to_string(),
        })
    }

    // ----- token helpers -----

    fn current(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position).map(|t| &t.token)
    }

    fn peek(&self, offset: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.position + offset).map(|t| &t.token)
    }

    fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn check(&self, expected: &Token) -> bool {
        self.current() == Some(expected)
    }

    fn check_contextual(&self, word: &str) -> bool {
        matches!(self.current(), Some(Token::Ident(name)) if *name == word)
    }

    fn newline_before(&self) -> bool {
        self.tokens
            .get(self.position)
            .map(|t| t.newline_before)
            .unwrap_or(false)
    }

    fn consume(&mut self, expected: Token, description: &str) -> ParseResult<()> {
        if self.check(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(description))
        }
    }

    /// Statement terminator with automatic semicolon insertion
    fn consume_semicolon(&mut self) -> ParseResult<()> {
        if self.check(&Token::Semicolon) {
            self.advance();
            return Ok(());
        }
        if self.at_statement_end() {
            return Ok(());
        }
        Err(self.error_here("';'"))
    }

    fn at_statement_end(&self) -> bool {
        self.at_end()
            || self.check(&Token::Semicolon)
            || self.check(&Token::RBrace)
            || self.newline_before()
    }

    fn current_span_start(&self) -> usize {
        self.tokens
            .get(self.position)
            .map(|t| t.span.start)
            .unwrap_or(self.source.len())
    }

    fn last_end(&self) -> usize {
        self.position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span.end)
            .unwrap_or(0)
    }

    fn descend(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::MaxDepthExceeded {
                depth: self.depth,
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.position) {
            Some(spanned) => ParseError::UnexpectedToken {
                position: spanned.span.start,
                expected: expected.to_string(),
                found: describe_token(&spanned.token),
            },
            None => ParseError::UnexpectedEof {
                expected: expected.to_string(),
            },
        }
    }

    fn syntax_error(&self, message: &str) -> ParseError {
        ParseError::InvalidSyntax {
            position: self.current_span_start(),
            message: message.to_string(),
        }
    }
}

/// Index of the `}` closing an interpolation that starts at `start`
fn find_interpolation_end(raw: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '{' => depth += 1,
            '}' if depth == 0 => return Some(start + offset),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn offset_error(error: ParseError, base: usize) -> ParseError {
    match error {
        ParseError::UnexpectedToken {
            position,
            expected,
            found,
        } => ParseError::UnexpectedToken {
            position: position + base,
            expected,
            found,
        },
        ParseError::InvalidToken { position, text } => ParseError::InvalidToken {
            position: position + base,
            text,
        },
        ParseError::InvalidSyntax { position, message } => ParseError::InvalidSyntax {
            position: position + base,
            message,
        },
        other => other,
    }
}

/// Property key text for a numeric literal
fn number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn keyword_text(token: &Token) -> Option<&'static str> {
    let text = match token {
        Token::Function => "function",
        Token::Return => "return",
        Token::If => "if",
        Token::Else => "else",
        Token::For => "for",
        Token::While => "while",
        Token::Do => "do",
        Token::Break => "break",
        Token::Continue => "continue",
        Token::Var => "var",
        Token::Let => "let",
        Token::Const => "const",
        Token::True => "true",
        Token::False => "false",
        Token::Null => "null",
        Token::New => "new",
        Token::TypeOf => "typeof",
        Token::Void => "void",
        Token::Delete => "delete",
        Token::In => "in",
        Token::InstanceOf => "instanceof",
        Token::Throw => "throw",
        Token::Try => "try",
        Token::Catch => "catch",
        Token::Finally => "finally",
        Token::Switch => "switch",
        Token::Case => "case",
        Token::Default => "default",
        _ => return None,
    };
    Some(text)
}

/// Format a token for error messages
fn describe_token(token: &Token) -> String {
    if let Some(keyword) = keyword_text(token) {
        return format!("keyword '{}'", keyword);
    }
    match token {
        Token::Ident(name) => format!("identifier '{}'", name),
        Token::Number(n) => format!("number {}", n),
        Token::String(s) => format!("string \"{}\"", s),
        Token::Template(_) => "template literal".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::LBrace => "'{'".to_string(),
        Token::RBrace => "'}'".to_string(),
        Token::LBracket => "'['".to_string(),
        Token::RBracket => "']'".to_string(),
        Token::Semicolon => "';'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::FatArrow => "'=>'".to_string(),
        Token::Eq => "'='".to_string(),
        Token::Question => "'?'".to_string(),
        other => format!("operator {:?}", other),
    }
}
