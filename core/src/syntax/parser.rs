//! Recursive-descent parser producing [`Body`] trees from tokens.

use crate::body::{Attribute, Block, Body, Expression, Step};
use crate::diagnostics::SourceRange;
use crate::value::Value;

use super::SyntaxError;
use super::lexer::{Token, TokenKind};

pub(crate) struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with an `Eof` token.
    pub(crate) fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub(crate) fn parse_file(&mut self) -> Result<Body, SyntaxError> {
        let start = self.peek().range.start_range();
        let mut body = self.parse_items(false)?;
        body.range = start.to(&self.peek().range);
        Ok(body)
    }

    fn peek(&self) -> &'a Token {
        let tokens = self.tokens;
        &tokens[self.pos.min(tokens.len() - 1)]
    }

    fn advance(&mut self) -> &'a Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn previous_range(&self) -> SourceRange {
        let tokens = self.tokens;
        tokens[self.pos.saturating_sub(1)].range.clone()
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let token = self.peek();
        SyntaxError::Unexpected {
            expected: expected.to_string(),
            found: token.kind.describe(),
            range: token.range.clone(),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<&'a Token, SyntaxError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Statements end at a newline, at the end of the file or right before
    /// the closing brace of the enclosing block.
    fn expect_end(&mut self) -> Result<(), SyntaxError> {
        match self.peek().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof | TokenKind::RBrace => Ok(()),
            _ => Err(self.unexpected("newline")),
        }
    }

    fn parse_items(&mut self, nested: bool) -> Result<Body, SyntaxError> {
        let mut body = Body::default();
        loop {
            self.skip_newlines();
            let token = self.peek();
            match &token.kind {
                TokenKind::Eof if nested => return Err(self.unexpected("`}`")),
                TokenKind::Eof => return Ok(body),
                TokenKind::RBrace if nested => return Ok(body),
                TokenKind::Ident(name) => {
                    self.advance();
                    match &self.peek().kind {
                        TokenKind::Equals => {
                            self.advance();
                            let expr = self.parse_expr()?;
                            let range = token.range.to(expr.range());
                            body.attributes.push(Attribute {
                                name: name.clone(),
                                name_range: token.range.clone(),
                                expr,
                                range,
                            });
                        }
                        TokenKind::Ident(_) | TokenKind::Str(_) | TokenKind::LBrace => {
                            body.blocks.push(self.parse_block(name, &token.range)?);
                        }
                        _ => return Err(self.unexpected("`=` or a block header")),
                    }
                    self.expect_end()?;
                }
                _ => return Err(self.unexpected("an attribute or block definition")),
            }
        }
    }

    fn parse_block(&mut self, type_name: &str, type_range: &SourceRange) -> Result<Block, SyntaxError> {
        let mut labels = Vec::new();
        let mut labels_range = Vec::new();
        loop {
            let token = self.peek();
            match &token.kind {
                TokenKind::Ident(label) | TokenKind::Str(label) => {
                    self.advance();
                    labels.push(label.clone());
                    labels_range.push(token.range.clone());
                }
                TokenKind::LBrace => break,
                _ => return Err(self.unexpected("a block label or `{`")),
            }
        }
        let open = self.expect(TokenKind::LBrace, "`{`")?;
        let mut body = self.parse_items(true)?;
        let close = self.expect(TokenKind::RBrace, "`}`")?;
        body.range = SourceRange::new(
            open.range.filename.clone(),
            open.range.end,
            close.range.start,
        );
        Ok(Block {
            type_name: type_name.to_string(),
            labels,
            type_range: type_range.clone(),
            labels_range,
            body,
            range: type_range.to(&close.range),
        })
    }

    fn parse_expr(&mut self) -> Result<Expression, SyntaxError> {
        let token = self.peek();
        match &token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(literal(Value::Number(*n), token.range.clone()))
            }
            TokenKind::Minus => {
                self.advance();
                let number = self.peek();
                match number.kind {
                    TokenKind::Number(n) => {
                        self.advance();
                        Ok(literal(Value::Number(-n), token.range.to(&number.range)))
                    }
                    _ => Err(self.unexpected("a number after `-`")),
                }
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(literal(Value::String(s.clone()), token.range.clone()))
            }
            TokenKind::Ident(name) => {
                self.advance();
                match name.as_str() {
                    "true" => Ok(literal(Value::Bool(true), token.range.clone())),
                    "false" => Ok(literal(Value::Bool(false), token.range.clone())),
                    "null" => Ok(literal(Value::Null, token.range.clone())),
                    _ if self.peek().kind == TokenKind::LParen => self.parse_call(name, &token.range),
                    _ => self.parse_traversal(name, &token.range),
                }
            }
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_object(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_list(&mut self) -> Result<Expression, SyntaxError> {
        let open = self.advance();
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if self.peek().kind == TokenKind::RBracket {
                break;
            }
            items.push(self.parse_expr()?);
            self.skip_newlines();
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBracket => break,
                _ => return Err(self.unexpected("`,` or `]`")),
            }
        }
        let close = self.advance();
        Ok(Expression::List {
            items,
            range: open.range.to(&close.range),
        })
    }

    fn parse_object(&mut self) -> Result<Expression, SyntaxError> {
        let open = self.advance();
        let mut entries = Vec::new();
        loop {
            self.skip_newlines();
            let token = self.peek();
            let key = match &token.kind {
                TokenKind::RBrace => break,
                TokenKind::Ident(key) | TokenKind::Str(key) => key.clone(),
                _ => return Err(self.unexpected("an object key or `}`")),
            };
            self.advance();
            match self.peek().kind {
                TokenKind::Equals | TokenKind::Colon => {
                    self.advance();
                }
                _ => return Err(self.unexpected("`=` or `:`")),
            }
            entries.push((key, self.parse_expr()?));
            match self.peek().kind {
                TokenKind::Comma | TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::RBrace => {}
                _ => return Err(self.unexpected("`,`, newline or `}`")),
            }
        }
        let close = self.advance();
        Ok(Expression::Object {
            entries,
            range: open.range.to(&close.range),
        })
    }

    fn parse_call(&mut self, name: &str, name_range: &SourceRange) -> Result<Expression, SyntaxError> {
        self.advance();
        let mut args = Vec::new();
        loop {
            self.skip_newlines();
            if self.peek().kind == TokenKind::RParen {
                break;
            }
            args.push(self.parse_expr()?);
            self.skip_newlines();
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => break,
                _ => return Err(self.unexpected("`,` or `)`")),
            }
        }
        let close = self.advance();
        Ok(Expression::Call {
            name: name.to_string(),
            args,
            range: name_range.to(&close.range),
        })
    }

    fn parse_traversal(&mut self, root: &str, root_range: &SourceRange) -> Result<Expression, SyntaxError> {
        let mut steps = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let token = self.peek();
                    match &token.kind {
                        TokenKind::Ident(name) => {
                            self.advance();
                            steps.push(Step::Attr(name.clone()));
                        }
                        _ => return Err(self.unexpected("an attribute name after `.`")),
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = match self.parse_expr()? {
                        Expression::Literal { value, .. } => value,
                        other => {
                            return Err(SyntaxError::Unexpected {
                                expected: "a literal index".to_string(),
                                found: "expression".to_string(),
                                range: other.range().clone(),
                            });
                        }
                    };
                    self.expect(TokenKind::RBracket, "`]`")?;
                    steps.push(Step::Index(index));
                }
                _ => break,
            }
        }
        Ok(Expression::Traversal {
            root: root.to_string(),
            steps,
            range: root_range.to(&self.previous_range()),
        })
    }
}

fn literal(value: Value, range: SourceRange) -> Expression {
    Expression::Literal { value, range }
}
