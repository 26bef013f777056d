//! Statement and block parsing: blocks, assignments, calls, control flow
//! and function definitions.

use std::sync::Arc;

use yu_lexer::TokenKind;
use yu_types::ast::*;
use yu_types::{ErrorCode, Span};

use crate::parser::{describe, ParseResult, Parser};

/// Where a block sits, which decides how it may end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockMode {
    /// The program itself: ends at end of input; `}` is an error.
    TopLevel,
    /// `{ ... }`: ends at `}`; end of input is an error.
    Braced,
    /// A function body: ends before `end`; `}` is an error.
    FunctionBody,
}

/// A `fn` item is either a definition or a module-qualified call.
enum FnItem {
    Def(FunctionDef),
    Call(ModuleFunctionCall),
}

impl<'src> Parser<'src> {
    pub(crate) fn parse_top_level(&mut self) -> ParseResult<CodeBlock> {
        self.parse_block(BlockMode::TopLevel, Span::point(1, 1))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Blocks
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse statements until the end condition for `mode`. `open` is the
    /// span of whatever opened the block.
    pub(crate) fn parse_block(&mut self, mode: BlockMode, open: Span) -> ParseResult<CodeBlock> {
        let mut stmts = Vec::new();
        let mut functions = Vec::new();

        loop {
            let token = self.advance()?;
            match token.kind {
                TokenKind::LBrace => {
                    let inner = self.parse_block(BlockMode::Braced, token.span)?;
                    stmts.push(Stmt::Block(Arc::new(inner)));
                }
                TokenKind::RBrace => {
                    if mode == BlockMode::Braced {
                        break;
                    }
                    return Err(self
                        .error_at(
                            token.span,
                            ErrorCode::UNEXPECTED_CLOSE_BRACE,
                            "unexpected '}' with no open block",
                        )
                        .with_suggestion("remove the extra '}'"));
                }
                TokenKind::VariablePrefix(_) => {
                    self.unread(&token);
                    stmts.push(Stmt::Assign(self.parse_assignment()?));
                }
                TokenKind::Identifier => {
                    self.unread(&token);
                    stmts.push(self.parse_call_stmt()?);
                }
                TokenKind::If => {
                    self.unread(&token);
                    stmts.push(Stmt::If(self.parse_if()?));
                }
                TokenKind::While => {
                    self.unread(&token);
                    stmts.push(Stmt::While(self.parse_while()?));
                }
                TokenKind::For => {
                    self.unread(&token);
                    stmts.push(Stmt::For(self.parse_for()?));
                }
                TokenKind::EndCode => stmts.push(Stmt::EndCode(token.span)),
                TokenKind::Break => stmts.push(Stmt::Break(token.span)),
                TokenKind::Fn => match self.parse_fn(token.span)? {
                    FnItem::Def(def) => functions.push(Arc::new(def)),
                    FnItem::Call(call) => stmts.push(Stmt::ModuleCall(call)),
                },
                TokenKind::Semi => {}
                TokenKind::Eof => {
                    if mode == BlockMode::Braced {
                        return Err(self
                            .error_at(open, ErrorCode::UNCLOSED_BRACE, "'{' is never closed")
                            .with_suggestion("add a matching '}'"));
                    }
                    self.unread(&token);
                    break;
                }
                TokenKind::End => {
                    if mode == BlockMode::FunctionBody {
                        self.unread(&token);
                        break;
                    }
                    return Err(self.error_at(
                        token.span,
                        ErrorCode::UNEXPECTED_END,
                        "'end' outside of a function definition",
                    ));
                }
                _ => return Err(self.unexpected(&token, "a statement")),
            }
        }

        Ok(CodeBlock {
            stmts,
            functions: FunctionTable::new(functions),
            span: open.merge(self.previous_span()),
        })
    }

    /// `{ ... }` after a control-flow header.
    fn parse_braced_body(&mut self) -> ParseResult<CodeBlock> {
        let open = self.expect(TokenKind::LBrace)?;
        self.parse_block(BlockMode::Braced, open.span)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Assignment & calls
    // ══════════════════════════════════════════════════════════════════════════

    /// `tier name = expr` or `tier.name = expr`
    fn parse_assignment(&mut self) -> ParseResult<Assignment> {
        let prefix = self.advance()?;
        let TokenKind::VariablePrefix(tier) = prefix.kind else {
            return Err(self.unexpected(&prefix, "a scope tier"));
        };
        self.eat(TokenKind::Dot)?;
        let name = self.expect_identifier()?;
        self.reject_second_dot(&format!("{tier}.{}", name.lexeme))?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expression()?;
        Ok(Assignment {
            target: VarRef::new(tier, name.lexeme),
            span: prefix.span.merge(value.span),
            value,
        })
    }

    /// `name(args)` or `module.name(args)`
    fn parse_call_stmt(&mut self) -> ParseResult<Stmt> {
        let name = self.expect_identifier()?;
        let next = self.advance()?;
        match next.kind {
            TokenKind::LParen => {
                let args = self.parse_args()?;
                Ok(Stmt::Call(FunctionCall::new(
                    name.lexeme,
                    args,
                    name.span.merge(self.previous_span()),
                )))
            }
            TokenKind::Dot => {
                let call = self.parse_module_call_tail(name.lexeme, name.span)?;
                Ok(Stmt::ModuleCall(call))
            }
            _ => Err(self.unexpected(&next, &format!("'(' after '{}'", name.lexeme))),
        }
    }

    /// The part of a module call after `module.`.
    fn parse_module_call_tail(
        &mut self,
        module: &str,
        start: Span,
    ) -> ParseResult<ModuleFunctionCall> {
        let function = self.expect_identifier()?;
        self.reject_second_dot(&format!("{module}.{}", function.lexeme))?;
        self.expect(TokenKind::LParen)?;
        let args = self.parse_args()?;
        Ok(ModuleFunctionCall {
            module: module.to_string(),
            call: FunctionCall::new(function.lexeme, args, start.merge(self.previous_span())),
            module_cache: ModuleCache::default(),
        })
    }

    /// Arguments after the opening `(`, through the closing `)`.
    fn parse_args(&mut self) -> ParseResult<Vec<Expression>> {
        let mut args = Vec::new();
        if self.eat(TokenKind::RParen)? {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            let token = self.advance()?;
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RParen => return Ok(args),
                _ => return Err(self.unexpected(&token, "',' or ')'")),
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Control flow
    // ══════════════════════════════════════════════════════════════════════════

    /// `if(cond) { ... } [else if(...) ... | else { ... }]`
    fn parse_if(&mut self) -> ParseResult<IfTree> {
        let keyword = self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_conditional()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_braced_body()?;

        let mut else_body = None;
        if self.eat(TokenKind::Else)? {
            let next = self.peek()?;
            match next.kind {
                TokenKind::If => {
                    let nested = self.parse_if()?;
                    else_body = Some(CodeBlock {
                        span: nested.span,
                        stmts: vec![Stmt::If(nested)],
                        functions: FunctionTable::default(),
                    });
                }
                TokenKind::LBrace => else_body = Some(self.parse_braced_body()?),
                _ => {
                    let token = self.advance()?;
                    return Err(self.unexpected(&token, "'{' or 'if' after 'else'"));
                }
            }
        }

        Ok(IfTree {
            condition,
            body,
            else_body,
            span: keyword.span.merge(self.previous_span()),
        })
    }

    /// `while(cond) { ... }`
    fn parse_while(&mut self) -> ParseResult<WhileTree> {
        let keyword = self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_conditional()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_braced_body()?;
        Ok(WhileTree {
            condition,
            body,
            span: keyword.span.merge(self.previous_span()),
        })
    }

    /// `for(dest; src) { ... }`
    fn parse_for(&mut self) -> ParseResult<ForTree> {
        let keyword = self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;
        let dest = self.parse_term()?;
        self.expect(TokenKind::Semi)?;
        let src = self.parse_term()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_braced_body()?;
        Ok(ForTree {
            dest,
            src,
            body,
            span: keyword.span.merge(self.previous_span()),
        })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Functions
    // ══════════════════════════════════════════════════════════════════════════

    /// After `fn`: `name(params) body end [fn]`, or `module.name(args)`.
    fn parse_fn(&mut self, fn_span: Span) -> ParseResult<FnItem> {
        let name = self.expect_identifier()?;
        let next = self.advance()?;
        match next.kind {
            TokenKind::Dot => {
                let call = self.parse_module_call_tail(name.lexeme, fn_span)?;
                return Ok(FnItem::Call(call));
            }
            TokenKind::LParen => {}
            _ => return Err(self.unexpected(&next, &format!("'(' after 'fn {}'", name.lexeme))),
        }

        let mut params = Vec::new();
        let mut out_params = Vec::new();
        if !self.eat(TokenKind::RParen)? {
            loop {
                if self.eat(TokenKind::Star)? {
                    out_params.push(params.len());
                }
                let param = self.expect_identifier()?;
                params.push(param.lexeme.to_string());
                let token = self.advance()?;
                match token.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RParen => break,
                    _ => return Err(self.unexpected(&token, "',' or ')'")),
                }
            }
        }

        let body = self.parse_block(BlockMode::FunctionBody, fn_span)?;
        let end = self.advance()?;
        if end.kind != TokenKind::End {
            return Err(self
                .error_at(
                    end.span,
                    ErrorCode::MISSING_END,
                    format!("'end' expected to close function '{}', got {}", name.lexeme, describe(&end)),
                )
                .with_suggestion("finish the function with 'end fn'"));
        }
        let end_span = end.span;
        self.eat(TokenKind::Fn)?;

        Ok(FnItem::Def(FunctionDef {
            name: name.lexeme.to_string(),
            params,
            out_params,
            body,
            span: fn_span.merge(end_span).merge(self.previous_span()),
        }))
    }
}
