//! Expression, term and condition parsing.
//!
//! Expressions are flat `term (op term)*` lists; no precedence is applied
//! here. The evaluator folds them left to right.

use yu_lexer::{unescape, Token, TokenKind};
use yu_types::ast::*;
use yu_types::ErrorCode;

use crate::parser::{ParseResult, Parser};

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════════

    /// `term (( '+' | '-' | '*' | '/' ) term)*`, where `!` before an operator
    /// inverts the term after it.
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Expression> {
        let first = self.parse_term()?;
        let start = first.span;
        let mut terms = vec![first];
        let mut operators = Vec::new();

        loop {
            let token = self.advance()?;
            let (invert, op_token) = if token.kind == TokenKind::Not {
                (true, self.advance()?)
            } else {
                (false, token)
            };
            let Some(op) = op_token.kind.arith_op() else {
                if invert {
                    return Err(self.unexpected(&op_token, "an operator after '!'"));
                }
                self.unread(&op_token);
                break;
            };
            let mut term = self.parse_term()?;
            if invert {
                term.invert = !term.invert;
            }
            operators.push(op);
            terms.push(term);
        }

        Ok(Expression {
            terms,
            operators,
            span: start.merge(self.previous_span()),
        })
    }

    /// One operand: an optional `!`, then a literal, a variable, a negated
    /// number or variable, or a parenthesised expression.
    pub(crate) fn parse_term(&mut self) -> ParseResult<Term> {
        let first = self.advance()?;
        let (invert, token) = if first.kind == TokenKind::Not {
            (true, self.advance()?)
        } else {
            (false, first)
        };

        let mut term = match token.kind {
            TokenKind::LParen => {
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Term::new(TermKind::Group(Box::new(inner)), token.span)
            }
            TokenKind::Number => {
                Term::new(TermKind::Number(self.parse_number(&token, false)?), token.span)
            }
            TokenKind::Str => Term::new(TermKind::Str(unescape(token.lexeme)), token.span),
            TokenKind::True => Term::new(TermKind::Bool(true), token.span),
            TokenKind::False => Term::new(TermKind::Bool(false), token.span),
            TokenKind::Null => Term::new(TermKind::Null, token.span),
            TokenKind::VariablePrefix(_) | TokenKind::Identifier => {
                self.unread(&token);
                let var = self.parse_variable()?;
                Term::new(TermKind::Var(var), token.span)
            }
            TokenKind::Minus => {
                let operand = self.advance()?;
                match operand.kind {
                    TokenKind::Number => Term::new(
                        TermKind::Number(self.parse_number(&operand, true)?),
                        token.span,
                    ),
                    TokenKind::VariablePrefix(_) | TokenKind::Identifier => {
                        self.unread(&operand);
                        let var = self.parse_variable()?;
                        let mut term = Term::new(TermKind::Var(var), token.span);
                        term.negate = true;
                        term
                    }
                    _ => return Err(self.unexpected(&operand, "a number or variable after '-'")),
                }
            }
            _ => return Err(self.unexpected(&token, "a value")),
        };

        term.invert = invert;
        term.span = first.span.merge(self.previous_span());
        Ok(term)
    }

    /// `tier.name`, `tier name`, or a bare local `name`.
    fn parse_variable(&mut self) -> ParseResult<VarRef> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::VariablePrefix(tier) => {
                self.eat(TokenKind::Dot)?;
                let name = self.expect_identifier()?;
                self.reject_second_dot(&format!("{tier}.{}", name.lexeme))?;
                Ok(VarRef::new(tier, name.lexeme))
            }
            TokenKind::Identifier => {
                let next = self.peek()?;
                if next.kind == TokenKind::Dot {
                    return Err(self
                        .error_at(
                            next.span,
                            ErrorCode::MALFORMED_NAME,
                            format!("'{}' is not a scope tier", token.lexeme),
                        )
                        .with_suggestion("qualify variables with s, ss or sss"));
                }
                Ok(VarRef::local(token.lexeme))
            }
            _ => Err(self.unexpected(&token, "a variable")),
        }
    }

    fn parse_number(&self, token: &Token<'_>, negative: bool) -> ParseResult<i64> {
        let parsed = if negative {
            format!("-{}", token.lexeme).parse::<i64>()
        } else {
            token.lexeme.parse::<i64>()
        };
        parsed.map_err(|_| {
            self.error_at(
                token.span,
                ErrorCode::NUMBER_OUT_OF_RANGE,
                format!("number '{}' does not fit in 64 bits", token.lexeme),
            )
        })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Conditions
    // ══════════════════════════════════════════════════════════════════════════

    /// `expr relop expr`, or a lone `expr`.
    pub(crate) fn parse_condition(&mut self) -> ParseResult<Condition> {
        let left = self.parse_expression()?;
        let token = self.advance()?;
        let comparison = match token.kind.rel_op() {
            Some(op) => Some((op, self.parse_expression()?)),
            None => {
                self.unread(&token);
                None
            }
        };
        Ok(Condition {
            span: left.span.merge(self.previous_span()),
            left,
            comparison,
        })
    }

    /// `cond (( '&&' | '||' ) cond)*`
    pub(crate) fn parse_conditional(&mut self) -> ParseResult<ConditionalExpression> {
        let first = self.parse_condition()?;
        let start = first.span;
        let mut conditions = vec![first];
        let mut operators = Vec::new();

        loop {
            let token = self.advance()?;
            let op = match token.kind {
                TokenKind::AndAnd => BoolOp::And,
                TokenKind::OrOr => BoolOp::Or,
                _ => {
                    self.unread(&token);
                    break;
                }
            };
            operators.push(op);
            conditions.push(self.parse_condition()?);
        }

        Ok(ConditionalExpression {
            conditions,
            operators,
            span: start.merge(self.previous_span()),
        })
    }
}
