//! Recursive-descent parser producing the concrete [`SyntaxNode`] tree.

use crate::error::CoreError;
use crate::lexer::{Token, TokenKind, lex};
use crate::span::{Location, Span};
use crate::syntax::{Rule, SyntaxElement, SyntaxNode, SyntaxToken, Terminal};

type ParseResult<T> = Result<T, CoreError>;

/// Parse a whole compilation unit into a `start` production.
pub fn parse(source: &str) -> ParseResult<SyntaxNode> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        source,
        tokens,
        position: 0,
    };
    parser.parse_start()
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    position: usize,
}

impl<'src> Parser<'src> {
    fn parse_start(&mut self) -> ParseResult<SyntaxNode> {
        let start = self.peek().span.start;
        let mut statements = Vec::new();
        while !self.at(TokenKind::Eof) {
            statements.push(self.parse_statement()?.into());
        }
        Ok(self.node(Rule::Start, statements, start))
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn parse_statement(&mut self) -> ParseResult<SyntaxNode> {
        match self.peek().kind {
            TokenKind::Let => self.parse_var_decl(),
            TokenKind::Function => self.parse_function_decl(),
            TokenKind::Interface => self.parse_interface_decl(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Return => self.parse_return(),
            TokenKind::LBrace => self.parse_block(),
            _ => {
                let start = self.peek().span.start;
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semi)?;
                Ok(self.node(Rule::ExprStmt, vec![expr], start))
            }
        }
    }

    fn parse_var_decl(&mut self) -> ParseResult<SyntaxNode> {
        let start = self.expect(TokenKind::Let)?.span.start;
        let name = self.expect_name()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        self.expect(TokenKind::Equal)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semi)?;
        Ok(self.node(
            Rule::VarDecl,
            vec![name.into(), ty.into(), value],
            start,
        ))
    }

    fn parse_function_decl(&mut self) -> ParseResult<SyntaxNode> {
        let start = self.expect(TokenKind::Function)?.span.start;
        let name = self.expect_name()?;
        self.expect(TokenKind::LParen)?;
        let params = if self.at(TokenKind::RParen) {
            None
        } else {
            let params_start = self.peek().span.start;
            let mut params = vec![self.parse_param()?.into()];
            while self.eat(TokenKind::Comma) {
                params.push(self.parse_param()?.into());
            }
            Some(self.node(Rule::Parameters, params, params_start))
        };
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Colon)?;
        let return_type = self.parse_type()?;
        let body = self.parse_block()?;
        Ok(self.node(
            Rule::FunctionDecl,
            vec![name.into(), params.into(), return_type.into(), body.into()],
            start,
        ))
    }

    fn parse_param(&mut self) -> ParseResult<SyntaxNode> {
        let start = self.peek().span.start;
        let name = self.expect_name()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        Ok(self.node(Rule::Param, vec![name.into(), ty.into()], start))
    }

    fn parse_interface_decl(&mut self) -> ParseResult<SyntaxNode> {
        let start = self.expect(TokenKind::Interface)?.span.start;
        let name = self.expect_name()?;
        let extends = if self.at(TokenKind::Extends) {
            let clause_start = self.bump().span.start;
            let parent = self.expect_name()?;
            Some(self.node(Rule::ExtendsClause, vec![parent.into()], clause_start))
        } else {
            None
        };
        self.expect(TokenKind::LBrace)?;
        let mut children = vec![name.into(), extends.into()];
        while !self.at(TokenKind::RBrace) {
            let member_start = self.peek().span.start;
            let member = self.expect_name()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            if !self.eat(TokenKind::Semi) {
                self.eat(TokenKind::Comma);
            }
            children.push(
                self.node(
                    Rule::InterfaceMember,
                    vec![member.into(), ty.into()],
                    member_start,
                )
                .into(),
            );
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.node(Rule::InterfaceDecl, children, start))
    }

    fn parse_if(&mut self) -> ParseResult<SyntaxNode> {
        let start = self.expect(TokenKind::If)?.span.start;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = self.parse_statement()?;
        let else_branch = if self.eat(TokenKind::Else) {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Ok(self.node(
            Rule::IfStmt,
            vec![condition, then_branch.into(), else_branch.into()],
            start,
        ))
    }

    fn parse_while(&mut self) -> ParseResult<SyntaxNode> {
        let start = self.expect(TokenKind::While)?.span.start;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_statement()?;
        Ok(self.node(
            Rule::WhileStmt,
            vec![condition, body.into()],
            start,
        ))
    }

    fn parse_return(&mut self) -> ParseResult<SyntaxNode> {
        let start = self.expect(TokenKind::Return)?.span.start;
        let value = if self.at(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semi)?;
        Ok(self.node(Rule::ReturnStmt, vec![value.into()], start))
    }

    fn parse_block(&mut self) -> ParseResult<SyntaxNode> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut statements = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.error_here("unterminated block, expected '}'"));
            }
            statements.push(self.parse_statement()?.into());
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.node(Rule::Block, statements, start))
    }

    fn parse_type(&mut self) -> ParseResult<SyntaxNode> {
        let start = self.peek().span.start;
        let mut children = vec![self.expect_name()?.into()];
        while self.at(TokenKind::LBracket) {
            let open = self.bump();
            let close = self.expect(TokenKind::RBracket)?;
            children.push(
                SyntaxToken {
                    terminal: Terminal::ArraySuffix,
                    text: "[]".to_string(),
                    span: Span::new(open.span.start, close.span.end),
                }
                .into(),
            );
        }
        Ok(self.node(Rule::Type, children, start))
    }

    // -----------------------------------------------------------------
    // Expressions, lowest precedence first
    // -----------------------------------------------------------------

    fn parse_expr(&mut self) -> ParseResult<SyntaxElement> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> ParseResult<SyntaxElement> {
        let start = self.peek().span.start;
        let target = self.parse_or()?;
        if self.eat(TokenKind::Equal) {
            let value = self.parse_assign()?;
            return Ok(self.node(Rule::Assign, vec![target, value], start).into());
        }
        Ok(target)
    }

    fn parse_or(&mut self) -> ParseResult<SyntaxElement> {
        self.parse_left_assoc(&[(TokenKind::PipePipe, Rule::OrOp)], Self::parse_and)
    }

    fn parse_and(&mut self) -> ParseResult<SyntaxElement> {
        self.parse_left_assoc(&[(TokenKind::AmpAmp, Rule::AndOp)], Self::parse_bit_or)
    }

    fn parse_bit_or(&mut self) -> ParseResult<SyntaxElement> {
        self.parse_left_assoc(&[(TokenKind::Pipe, Rule::BitwiseOrOp)], Self::parse_bit_xor)
    }

    fn parse_bit_xor(&mut self) -> ParseResult<SyntaxElement> {
        self.parse_left_assoc(&[(TokenKind::Caret, Rule::BitwiseXorOp)], Self::parse_bit_and)
    }

    fn parse_bit_and(&mut self) -> ParseResult<SyntaxElement> {
        self.parse_left_assoc(&[(TokenKind::Amp, Rule::BitwiseAndOp)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> ParseResult<SyntaxElement> {
        self.parse_left_assoc(
            &[
                (TokenKind::EqEq, Rule::Eq),
                (TokenKind::BangEq, Rule::Neq),
                (TokenKind::EqEqEq, Rule::StrictEq),
                (TokenKind::BangEqEq, Rule::StrictNeq),
            ],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> ParseResult<SyntaxElement> {
        let start = self.peek().span.start;
        let mut left = self.parse_shift()?;
        loop {
            let rule = match self.peek().kind {
                TokenKind::Less => Rule::Lt,
                TokenKind::Greater => Rule::Gt,
                TokenKind::LessEq => Rule::Lte,
                TokenKind::GreaterEq => Rule::Gte,
                TokenKind::As => {
                    self.bump();
                    let ty = self.parse_type()?;
                    left = self.node(Rule::TypeCast, vec![left, ty.into()], start).into();
                    continue;
                }
                _ => return Ok(left),
            };
            self.bump();
            let right = self.parse_shift()?;
            left = self.node(rule, vec![left, right], start).into();
        }
    }

    fn parse_shift(&mut self) -> ParseResult<SyntaxElement> {
        self.parse_left_assoc(
            &[(TokenKind::Shl, Rule::Lshift), (TokenKind::Shr, Rule::Rshift)],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> ParseResult<SyntaxElement> {
        self.parse_left_assoc(
            &[(TokenKind::Plus, Rule::Add), (TokenKind::Minus, Rule::Sub)],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> ParseResult<SyntaxElement> {
        self.parse_left_assoc(
            &[
                (TokenKind::Star, Rule::Mul),
                (TokenKind::Slash, Rule::Div),
                (TokenKind::Percent, Rule::Mod),
            ],
            Self::parse_unary,
        )
    }

    fn parse_left_assoc(
        &mut self,
        operators: &[(TokenKind, Rule)],
        next: fn(&mut Self) -> ParseResult<SyntaxElement>,
    ) -> ParseResult<SyntaxElement> {
        let start = self.peek().span.start;
        let mut left = next(self)?;
        loop {
            let next_kind = self.peek().kind;
            let Some(&(_, rule)) = operators.iter().find(|(kind, _)| *kind == next_kind) else {
                break;
            };
            self.bump();
            let right = next(self)?;
            left = self.node(rule, vec![left, right], start).into();
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<SyntaxElement> {
        let rule = match self.peek().kind {
            TokenKind::Plus => Rule::Pos,
            TokenKind::Minus => Rule::Neg,
            TokenKind::Bang => Rule::NotOp,
            TokenKind::Tilde => Rule::BitwiseNotOp,
            TokenKind::PlusPlus => Rule::PreInc,
            TokenKind::MinusMinus => Rule::PreDec,
            _ => return self.parse_power(),
        };
        let start = self.bump().span.start;
        let operand = self.parse_unary()?;
        Ok(self.node(rule, vec![operand], start).into())
    }

    fn parse_power(&mut self) -> ParseResult<SyntaxElement> {
        let start = self.peek().span.start;
        let base = self.parse_postfix()?;
        if self.eat(TokenKind::StarStar) {
            let exponent = self.parse_unary()?;
            return Ok(self.node(Rule::Pow, vec![base, exponent], start).into());
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> ParseResult<SyntaxElement> {
        let start = self.peek().span.start;
        let mut expr = self.parse_primary()?;
        loop {
            expr = match self.peek().kind {
                TokenKind::LParen => {
                    self.bump();
                    let args = self.parse_arguments(TokenKind::RParen)?;
                    self.expect(TokenKind::RParen)?;
                    self.node(Rule::FunctionCall, vec![expr, args.into()], start).into()
                }
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    self.node(Rule::ArrayAccess, vec![expr, index], start).into()
                }
                TokenKind::Dot => {
                    self.bump();
                    let field = self.expect_name()?;
                    self.node(Rule::FieldAccess, vec![expr, field.into()], start).into()
                }
                TokenKind::PlusPlus => {
                    self.bump();
                    self.node(Rule::PostInc, vec![expr], start).into()
                }
                TokenKind::MinusMinus => {
                    self.bump();
                    self.node(Rule::PostDec, vec![expr], start).into()
                }
                _ => return Ok(expr),
            };
        }
    }

    fn parse_primary(&mut self) -> ParseResult<SyntaxElement> {
        let token = self.peek();
        let start = token.span.start;
        match token.kind {
            TokenKind::Number => Ok(self.terminal(Terminal::Number).into()),
            TokenKind::String => Ok(self.terminal(Terminal::String).into()),
            TokenKind::True => {
                self.bump();
                Ok(self.node(Rule::TrueLit, Vec::new(), start).into())
            }
            TokenKind::False => {
                self.bump();
                Ok(self.node(Rule::FalseLit, Vec::new(), start).into())
            }
            TokenKind::Null => {
                self.bump();
                Ok(self.node(Rule::NullLit, Vec::new(), start).into())
            }
            TokenKind::Ident => {
                let name = self.terminal(Terminal::Name);
                Ok(self.node(Rule::Var, vec![name.into()], start).into())
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.bump();
                let elements = self.parse_arguments(TokenKind::RBracket)?;
                self.expect(TokenKind::RBracket)?;
                Ok(self.node(Rule::ArrayLiteral, vec![elements.into()], start).into())
            }
            TokenKind::LBrace => {
                self.bump();
                let pairs = self.parse_key_value_pairs()?;
                self.expect(TokenKind::RBrace)?;
                Ok(self.node(Rule::ObjectLiteral, vec![pairs.into()], start).into())
            }
            other => Err(self.error_here(format!(
                "expected expression, found {}",
                other.describe()
            ))),
        }
    }

    /// Comma separated expressions up to (not including) `close`.
    fn parse_arguments(&mut self, close: TokenKind) -> ParseResult<Option<SyntaxNode>> {
        if self.at(close) {
            return Ok(None);
        }
        let start = self.peek().span.start;
        let mut args = vec![self.parse_expr()?];
        while self.eat(TokenKind::Comma) {
            if self.at(close) {
                break;
            }
            args.push(self.parse_expr()?);
        }
        Ok(Some(self.node(Rule::Arguments, args, start)))
    }

    fn parse_key_value_pairs(&mut self) -> ParseResult<Option<SyntaxNode>> {
        if self.at(TokenKind::RBrace) {
            return Ok(None);
        }
        let start = self.peek().span.start;
        let mut pairs = vec![self.parse_key_value()?.into()];
        while self.eat(TokenKind::Comma) {
            if self.at(TokenKind::RBrace) {
                break;
            }
            pairs.push(self.parse_key_value()?.into());
        }
        Ok(Some(self.node(Rule::KeyValuePairs, pairs, start)))
    }

    fn parse_key_value(&mut self) -> ParseResult<SyntaxNode> {
        let start = self.peek().span.start;
        let key = self.expect_name()?;
        self.expect(TokenKind::Colon)?;
        let value = self.parse_expr()?;
        Ok(self.node(Rule::KeyValue, vec![key.into(), value], start))
    }

    // -----------------------------------------------------------------
    // Token helpers
    // -----------------------------------------------------------------

    fn node(&self, rule: Rule, children: Vec<SyntaxElement>, start: u32) -> SyntaxNode {
        SyntaxNode::new(rule, children, Span::new(start, self.previous_end()))
    }

    fn terminal(&mut self, terminal: Terminal) -> SyntaxToken {
        let token = self.bump();
        SyntaxToken {
            terminal,
            text: token.span.text(self.source).to_string(),
            span: token.span,
        }
    }

    fn expect_name(&mut self) -> ParseResult<SyntaxToken> {
        if self.at(TokenKind::Ident) {
            Ok(self.terminal(Terminal::Name))
        } else {
            Err(self.error_here(format!(
                "expected identifier, found {}",
                self.peek().kind.describe()
            )))
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!(
                "expected {}, found {}",
                kind.describe(),
                self.peek().kind.describe()
            )))
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn peek(&self) -> Token {
        // The token stream always ends with Eof, which is never consumed.
        self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn previous_end(&self) -> u32 {
        match self.position {
            0 => 0,
            n => self.tokens[n - 1].span.end,
        }
    }

    fn error_here(&self, message: impl Into<String>) -> CoreError {
        CoreError::Parse {
            location: Location::locate(self.source, self.peek().span.start),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_statement(source: &str) -> SyntaxNode {
        let start = parse(source).expect("parse");
        assert_eq!(start.rule, Rule::Start);
        match start.children.into_iter().next() {
            Some(SyntaxElement::Node(node)) => node,
            other => panic!("expected a statement, got {other:?}"),
        }
    }

    fn child_node(node: &SyntaxNode, index: usize) -> &SyntaxNode {
        match &node.children[index] {
            SyntaxElement::Node(child) => child,
            other => panic!("expected node at {index}, got {other:?}"),
        }
    }

    fn expression(source: &str) -> SyntaxNode {
        let stmt = first_statement(source);
        assert_eq!(stmt.rule, Rule::ExprStmt);
        child_node(&stmt, 0).clone()
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = expression("1 + 2 * 3;");
        assert_eq!(expr.rule, Rule::Add);
        assert!(matches!(&expr.children[0], SyntaxElement::Token(t) if t.text == "1"));
        assert_eq!(child_node(&expr, 1).rule, Rule::Mul);
    }

    #[test]
    fn exponentiation_is_right_associative() {
        let expr = expression("a ** b ** c;");
        assert_eq!(expr.rule, Rule::Pow);
        assert_eq!(child_node(&expr, 0).rule, Rule::Var);
        assert_eq!(child_node(&expr, 1).rule, Rule::Pow);
    }

    #[test]
    fn assignment_is_right_associative() {
        let expr = expression("a = b = 1;");
        assert_eq!(expr.rule, Rule::Assign);
        assert_eq!(child_node(&expr, 1).rule, Rule::Assign);
    }

    #[test]
    fn parses_cast_at_relational_level() {
        let expr = expression("x + 1 as i32[];");
        assert_eq!(expr.rule, Rule::TypeCast);
        assert_eq!(child_node(&expr, 0).rule, Rule::Add);
        let ty = child_node(&expr, 1);
        assert_eq!(ty.rule, Rule::Type);
        assert_eq!(ty.children.len(), 2);
    }

    #[test]
    fn postfix_chain_applies_left_to_right() {
        let expr = expression("points[0].x++;");
        assert_eq!(expr.rule, Rule::PostInc);
        let field = child_node(&expr, 0);
        assert_eq!(field.rule, Rule::FieldAccess);
        assert_eq!(child_node(field, 0).rule, Rule::ArrayAccess);
    }

    #[test]
    fn absent_optional_slots_are_missing() {
        let stmt = first_statement("if (a) b; ");
        assert_eq!(stmt.rule, Rule::IfStmt);
        assert_eq!(stmt.children.len(), 3);
        assert_eq!(stmt.children[2], SyntaxElement::Missing);

        let call = expression("f();");
        assert_eq!(call.rule, Rule::FunctionCall);
        assert_eq!(call.children[1], SyntaxElement::Missing);
    }

    #[test]
    fn interface_keeps_extends_slot() {
        let decl = first_statement("interface A { x: i32; y: f64 }");
        assert_eq!(decl.rule, Rule::InterfaceDecl);
        assert_eq!(decl.children[1], SyntaxElement::Missing);
        assert_eq!(decl.children.len(), 4);
    }

    #[test]
    fn braces_in_expression_position_are_object_literals() {
        let decl = first_statement("let p: Point = { x: 1, y: 2, };");
        let literal = match &decl.children[2] {
            SyntaxElement::Node(node) => node,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(literal.rule, Rule::ObjectLiteral);
        assert_eq!(child_node(literal, 0).children.len(), 2);
    }

    #[test]
    fn reports_missing_semicolon() {
        let err = parse("let a: i32 = 1\nlet b: i32 = 2;").unwrap_err();
        match err {
            CoreError::Parse { location, message } => {
                assert_eq!(location.line, 2);
                assert!(message.contains("expected ';'"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reports_unterminated_block() {
        let err = parse("function f(): void { return;").unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }
}
