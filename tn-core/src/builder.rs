//! Tree builder: concrete parse tree to AST.
//!
//! The builder walks the concrete tree bottom-up. Children are transformed
//! first, then exactly one rule is applied per production. Lists, names and
//! key/value pairs only exist as intermediate [`Built`] values handed to the
//! directly enclosing rule.

use tracing::{debug, trace};

use crate::ast::{
    BinaryOp, Block, Expr, FunctionDecl, InterfaceDecl, InterfaceMember, KeyValue, Param,
    PostfixOp, Program, Stmt, UnaryOp, VarDecl,
};
use crate::error::CoreError;
use crate::syntax::{Rule, SyntaxElement, SyntaxNode, SyntaxToken, Terminal};
use crate::types::Type;

type BuildResult<T> = Result<T, CoreError>;

/// Build the AST for a `start` production.
pub fn build_program(root: &SyntaxNode) -> BuildResult<Program> {
    if root.rule != Rule::Start {
        return Err(malformed(root.rule, "expected a `start` production at the root"));
    }
    match transform_node(root)? {
        Built::Program(program) => {
            debug!(statements = program.statements.len(), "built program");
            Ok(program)
        }
        other => Err(malformed(root.rule, format!("produced {}", other.describe()))),
    }
}

/// Intermediate result of transforming one concrete tree element.
#[derive(Debug)]
enum Built {
    Program(Program),
    Stmt(Stmt),
    Expr(Expr),
    Type(Type),
    Name(String),
    ArraySuffix,
    Param(Param),
    Member(InterfaceMember),
    Pair(KeyValue),
    List(Vec<Built>),
    Missing,
}

impl Built {
    fn describe(&self) -> &'static str {
        match self {
            Built::Program(_) => "a program",
            Built::Stmt(_) => "a statement",
            Built::Expr(_) => "an expression",
            Built::Type(_) => "a type",
            Built::Name(_) => "a name",
            Built::ArraySuffix => "an array suffix",
            Built::Param(_) => "a parameter",
            Built::Member(_) => "an interface member",
            Built::Pair(_) => "a key/value pair",
            Built::List(_) => "a list",
            Built::Missing => "nothing",
        }
    }
}

fn transform_element(element: &SyntaxElement) -> BuildResult<Built> {
    match element {
        SyntaxElement::Node(node) => transform_node(node),
        SyntaxElement::Token(token) => transform_token(token),
        SyntaxElement::Missing => Ok(Built::Missing),
    }
}

fn transform_node(node: &SyntaxNode) -> BuildResult<Built> {
    let children = node
        .children
        .iter()
        .map(transform_element)
        .collect::<BuildResult<Vec<_>>>()?;
    trace!(rule = %node.rule, children = children.len(), "applying builder rule");
    apply(node.rule, Children::new(node.rule, children))
}

fn transform_token(token: &SyntaxToken) -> BuildResult<Built> {
    Ok(match token.terminal {
        Terminal::Name => Built::Name(token.text.clone()),
        Terminal::Number => Built::Expr(Expr::Number(decode_number(&token.text)?)),
        Terminal::String => Built::Expr(Expr::String(decode_string(&token.text)?)),
        Terminal::ArraySuffix => Built::ArraySuffix,
    })
}

fn apply(rule: Rule, mut children: Children) -> BuildResult<Built> {
    if let Some(op) = binary_op(rule) {
        let left = children.expr()?;
        let right = children.expr()?;
        children.finish()?;
        return Ok(Built::Expr(Expr::binary(left, op, right)));
    }
    if let Some(op) = unary_op(rule) {
        let operand = Box::new(children.expr()?);
        children.finish()?;
        return Ok(Built::Expr(Expr::Unary { op, operand }));
    }

    let built = match rule {
        Rule::Start => {
            let statements = children.rest(Children::stmt_of)?;
            Built::Program(Program { statements })
        }
        Rule::VarDecl => {
            let name = children.name()?;
            let ty = children.ty()?;
            let value = children.expr()?;
            Built::Stmt(Stmt::VarDecl(VarDecl { name, ty, value }))
        }
        Rule::FunctionDecl => {
            let name = children.name()?;
            let params = children.optional_list(Children::param_of)?;
            let return_type = children.ty()?;
            let body = children.block()?;
            Built::Stmt(Stmt::FunctionDecl(FunctionDecl {
                name,
                params,
                return_type,
                body,
            }))
        }
        Rule::Parameters | Rule::Arguments | Rule::KeyValuePairs => {
            Built::List(children.rest(|_, built| Ok(built))?)
        }
        Rule::Param => {
            let name = children.name()?;
            let ty = children.ty()?;
            Built::Param(Param { name, ty })
        }
        Rule::InterfaceDecl => {
            let name = children.name()?;
            let extends = match children.next("extends clause")? {
                Built::Missing => None,
                Built::Name(parent) => Some(parent),
                other => return Err(children.unexpected("an extends clause", &other)),
            };
            let members = children.rest(Children::member_of)?;
            Built::Stmt(Stmt::InterfaceDecl(InterfaceDecl {
                name,
                extends,
                members,
            }))
        }
        Rule::ExtendsClause => Built::Name(children.name()?),
        Rule::InterfaceMember => {
            let name = children.name()?;
            let ty = children.ty()?;
            Built::Member(InterfaceMember { name, ty })
        }
        Rule::Block => {
            let statements = children.rest(Children::stmt_of)?;
            Built::Stmt(Stmt::Block(Block { statements }))
        }
        Rule::IfStmt => {
            let condition = children.expr()?;
            let then_branch = Box::new(children.stmt()?);
            let else_branch = match children.next("else branch")? {
                Built::Missing => None,
                Built::Stmt(stmt) => Some(Box::new(stmt)),
                other => return Err(children.unexpected("a statement", &other)),
            };
            Built::Stmt(Stmt::If {
                condition,
                then_branch,
                else_branch,
            })
        }
        Rule::WhileStmt => {
            let condition = children.expr()?;
            let body = Box::new(children.stmt()?);
            Built::Stmt(Stmt::While { condition, body })
        }
        Rule::ReturnStmt => {
            let value = match children.next("return value")? {
                Built::Missing => None,
                Built::Expr(expr) => Some(expr),
                other => return Err(children.unexpected("an expression", &other)),
            };
            Built::Stmt(Stmt::Return(value))
        }
        Rule::ExprStmt => Built::Stmt(Stmt::Expr(children.expr()?)),
        Rule::Type => {
            let name = children.name()?;
            let suffixes = children.rest(|children, built| match built {
                Built::ArraySuffix => Ok(()),
                other => Err(children.unexpected("an array suffix", &other)),
            })?;
            Built::Type(Type::new(name, suffixes.len()))
        }
        Rule::Assign => {
            let target = Box::new(children.expr()?);
            let value = Box::new(children.expr()?);
            Built::Expr(Expr::Assignment { target, value })
        }
        Rule::PostInc | Rule::PostDec => {
            let operand = Box::new(children.expr()?);
            let op = if rule == Rule::PostInc {
                PostfixOp::Increment
            } else {
                PostfixOp::Decrement
            };
            Built::Expr(Expr::Postfix { operand, op })
        }
        Rule::TypeCast => {
            let expr = Box::new(children.expr()?);
            let ty = children.ty()?;
            Built::Expr(Expr::TypeCast { expr, ty })
        }
        Rule::FunctionCall => {
            let callee = Box::new(children.expr()?);
            let args = children.optional_list(Children::expr_of)?;
            Built::Expr(Expr::Call { callee, args })
        }
        Rule::ArrayAccess => {
            let array = Box::new(children.expr()?);
            let index = Box::new(children.expr()?);
            Built::Expr(Expr::ArrayAccess { array, index })
        }
        Rule::FieldAccess => {
            let object = Box::new(children.expr()?);
            let field = children.name()?;
            Built::Expr(Expr::FieldAccess { object, field })
        }
        Rule::ArrayLiteral => {
            Built::Expr(Expr::ArrayLiteral(children.optional_list(Children::expr_of)?))
        }
        Rule::ObjectLiteral => {
            Built::Expr(Expr::ObjectLiteral(children.optional_list(Children::pair_of)?))
        }
        Rule::KeyValue => {
            let key = children.name()?;
            let value = children.expr()?;
            Built::Pair(KeyValue { key, value })
        }
        Rule::Var => Built::Expr(Expr::variable(children.name()?)),
        Rule::TrueLit => Built::Expr(Expr::Boolean(true)),
        Rule::FalseLit => Built::Expr(Expr::Boolean(false)),
        Rule::NullLit => Built::Expr(Expr::Null),
        // Operator rules were handled above.
        other => return Err(malformed(other, "operator without a mapping")),
    };
    children.finish()?;
    Ok(built)
}

fn binary_op(rule: Rule) -> Option<BinaryOp> {
    Some(match rule {
        Rule::Add => BinaryOp::Add,
        Rule::Sub => BinaryOp::Sub,
        Rule::Mul => BinaryOp::Mul,
        Rule::Div => BinaryOp::Div,
        Rule::Mod => BinaryOp::Mod,
        Rule::Pow => BinaryOp::Pow,
        Rule::OrOp => BinaryOp::Or,
        Rule::AndOp => BinaryOp::And,
        Rule::BitwiseOrOp => BinaryOp::BitOr,
        Rule::BitwiseXorOp => BinaryOp::BitXor,
        Rule::BitwiseAndOp => BinaryOp::BitAnd,
        Rule::Eq => BinaryOp::Eq,
        Rule::Neq => BinaryOp::Neq,
        Rule::StrictEq => BinaryOp::StrictEq,
        Rule::StrictNeq => BinaryOp::StrictNeq,
        Rule::Lt => BinaryOp::Lt,
        Rule::Gt => BinaryOp::Gt,
        Rule::Lte => BinaryOp::Lte,
        Rule::Gte => BinaryOp::Gte,
        Rule::Lshift => BinaryOp::Shl,
        Rule::Rshift => BinaryOp::Shr,
        _ => return None,
    })
}

fn unary_op(rule: Rule) -> Option<UnaryOp> {
    Some(match rule {
        Rule::Pos => UnaryOp::Plus,
        Rule::Neg => UnaryOp::Minus,
        Rule::NotOp => UnaryOp::Not,
        Rule::BitwiseNotOp => UnaryOp::BitNot,
        Rule::PreInc => UnaryOp::Increment,
        Rule::PreDec => UnaryOp::Decrement,
        _ => return None,
    })
}

/// Transformed children of one production, consumed front to back.
struct Children {
    rule: Rule,
    items: std::vec::IntoIter<Built>,
}

impl Children {
    fn new(rule: Rule, items: Vec<Built>) -> Self {
        Children {
            rule,
            items: items.into_iter(),
        }
    }

    fn next(&mut self, expected: &str) -> BuildResult<Built> {
        self.items
            .next()
            .ok_or_else(|| malformed(self.rule, format!("missing {expected}")))
    }

    fn unexpected(&self, expected: &str, found: &Built) -> CoreError {
        malformed(
            self.rule,
            format!("expected {expected}, found {}", found.describe()),
        )
    }

    fn expr(&mut self) -> BuildResult<Expr> {
        let built = self.next("expression")?;
        self.expr_of(built)
    }

    fn stmt(&mut self) -> BuildResult<Stmt> {
        let built = self.next("statement")?;
        self.stmt_of(built)
    }

    fn name(&mut self) -> BuildResult<String> {
        match self.next("name")? {
            Built::Name(name) => Ok(name),
            other => Err(self.unexpected("a name", &other)),
        }
    }

    fn ty(&mut self) -> BuildResult<Type> {
        match self.next("type")? {
            Built::Type(ty) => Ok(ty),
            other => Err(self.unexpected("a type", &other)),
        }
    }

    fn block(&mut self) -> BuildResult<Block> {
        match self.next("block")? {
            Built::Stmt(Stmt::Block(block)) => Ok(block),
            other => Err(self.unexpected("a block", &other)),
        }
    }

    fn expr_of(&self, built: Built) -> BuildResult<Expr> {
        match built {
            Built::Expr(expr) => Ok(expr),
            other => Err(self.unexpected("an expression", &other)),
        }
    }

    fn stmt_of(&self, built: Built) -> BuildResult<Stmt> {
        match built {
            Built::Stmt(stmt) => Ok(stmt),
            other => Err(self.unexpected("a statement", &other)),
        }
    }

    fn param_of(&self, built: Built) -> BuildResult<Param> {
        match built {
            Built::Param(param) => Ok(param),
            other => Err(self.unexpected("a parameter", &other)),
        }
    }

    fn member_of(&self, built: Built) -> BuildResult<InterfaceMember> {
        match built {
            Built::Member(member) => Ok(member),
            other => Err(self.unexpected("an interface member", &other)),
        }
    }

    fn pair_of(&self, built: Built) -> BuildResult<KeyValue> {
        match built {
            Built::Pair(pair) => Ok(pair),
            other => Err(self.unexpected("a key/value pair", &other)),
        }
    }

    /// Convert every remaining child.
    fn rest<T>(
        &mut self,
        mut convert: impl FnMut(&Self, Built) -> BuildResult<T>,
    ) -> BuildResult<Vec<T>> {
        let items: Vec<Built> = self.items.by_ref().collect();
        items.into_iter().map(|built| convert(self, built)).collect()
    }

    /// An optional list production; absent means empty.
    fn optional_list<T>(
        &mut self,
        convert: impl Fn(&Self, Built) -> BuildResult<T>,
    ) -> BuildResult<Vec<T>> {
        match self.next("list")? {
            Built::Missing => Ok(Vec::new()),
            Built::List(items) => items.into_iter().map(|built| convert(self, built)).collect(),
            other => Err(self.unexpected("a list", &other)),
        }
    }

    fn finish(mut self) -> BuildResult<()> {
        match self.items.next() {
            None => Ok(()),
            Some(extra) => Err(malformed(
                self.rule,
                format!("unexpected trailing {}", extra.describe()),
            )),
        }
    }
}

fn malformed(rule: Rule, message: impl Into<String>) -> CoreError {
    CoreError::MalformedTree {
        rule,
        message: message.into(),
    }
}

fn invalid_literal(text: &str, message: impl Into<String>) -> CoreError {
    CoreError::InvalidLiteral {
        text: text.to_string(),
        message: message.into(),
    }
}

/// Decode numeric literal text into a double.
pub fn decode_number(text: &str) -> BuildResult<f64> {
    text.parse::<f64>()
        .map_err(|err| invalid_literal(text, err.to_string()))
}

/// Decode a quoted string literal, undoing source-level escaping.
pub fn decode_string(text: &str) -> BuildResult<String> {
    let mut outer = text.chars();
    let (Some(open), Some(close)) = (outer.next(), outer.next_back()) else {
        return Err(invalid_literal(text, "string literal is missing its quotes"));
    };
    if open != close || !matches!(open, '"' | '\'') {
        return Err(invalid_literal(text, "string literal is missing its quotes"));
    }

    let mut decoded = String::with_capacity(text.len());
    let mut chars = outer.as_str().chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            decoded.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => decoded.push('\n'),
            Some('t') => decoded.push('\t'),
            Some('r') => decoded.push('\r'),
            Some('b') => decoded.push('\u{8}'),
            Some('f') => decoded.push('\u{c}'),
            Some('v') => decoded.push('\u{b}'),
            Some('\\') => decoded.push('\\'),
            Some('"') => decoded.push('"'),
            Some('\'') => decoded.push('\''),
            // Escaped line break is a continuation.
            Some('\n') => {}
            Some(digit @ '0'..='7') => {
                let mut value = digit.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(next) => {
                            value = value * 8 + next;
                            chars.next();
                        }
                        None => break,
                    }
                }
                decoded.push(char_from(text, value)?);
            }
            Some('x') => {
                let value = take_hex(text, &mut chars, 2)?;
                decoded.push(char_from(text, value)?);
            }
            Some('u') => {
                let value = if chars.peek() == Some(&'{') {
                    chars.next();
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) if c.is_ascii_hexdigit() && digits.len() < 6 => digits.push(c),
                            _ => return Err(invalid_literal(text, "malformed \\u{...} escape")),
                        }
                    }
                    u32::from_str_radix(&digits, 16)
                        .map_err(|_| invalid_literal(text, "malformed \\u{...} escape"))?
                } else {
                    take_hex(text, &mut chars, 4)?
                };
                decoded.push(char_from(text, value)?);
            }
            Some(other) => {
                decoded.push('\\');
                decoded.push(other);
            }
            None => decoded.push('\\'),
        }
    }
    Ok(decoded)
}

fn take_hex(
    text: &str,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    count: usize,
) -> BuildResult<u32> {
    let mut value = 0;
    for _ in 0..count {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| invalid_literal(text, format!("expected {count} hex digits in escape")))?;
        value = value * 16 + digit;
    }
    Ok(value)
}

fn char_from(text: &str, value: u32) -> BuildResult<char> {
    char::from_u32(value)
        .ok_or_else(|| invalid_literal(text, format!("escape U+{value:X} is not a valid character")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::span::Span;

    fn build(source: &str) -> Program {
        build_program(&parse(source).expect("parse")).expect("build")
    }

    fn only_expr(source: &str) -> Expr {
        match build(source).statements.into_iter().next() {
            Some(Stmt::Expr(expr)) => expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn decodes_numbers_to_doubles() {
        assert_eq!(only_expr("5;"), Expr::Number(5.0));
        assert_eq!(only_expr("5.5;"), Expr::Number(5.5));
        assert_eq!(only_expr("1e3;"), Expr::Number(1000.0));
    }

    #[test]
    fn decodes_string_escapes() {
        assert_eq!(decode_string(r#""a\"b""#).unwrap(), "a\"b");
        assert_eq!(decode_string(r#""c:\\dir""#).unwrap(), "c:\\dir");
        assert_eq!(decode_string(r#"'it\'s'"#).unwrap(), "it's");
        assert_eq!(decode_string(r#""tab\tnl\n""#).unwrap(), "tab\tnl\n");
        assert_eq!(decode_string(r#""\x41\101\u0042\u{1F600}""#).unwrap(), "AAB\u{1F600}");
        assert_eq!(decode_string(r#""keep\q""#).unwrap(), "keep\\q");
    }

    #[test]
    fn rejects_broken_escapes() {
        let err = decode_string(r#""\xZZ""#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidLiteral { .. }));
        let err = decode_string(r#""\u{110000}""#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidLiteral { .. }));
    }

    #[test]
    fn maps_keywords_to_literal_nodes() {
        assert_eq!(only_expr("true;"), Expr::Boolean(true));
        assert_eq!(only_expr("false;"), Expr::Boolean(false));
        assert_eq!(only_expr("null;"), Expr::Null);
    }

    #[test]
    fn flattens_absent_lists_to_empty() {
        assert_eq!(only_expr("[];"), Expr::ArrayLiteral(Vec::new()));
        assert_eq!(
            only_expr("f();"),
            Expr::Call {
                callee: Box::new(Expr::variable("f")),
                args: Vec::new()
            }
        );
        let program = build("function main(): void {}");
        match &program.statements[0] {
            Stmt::FunctionDecl(decl) => {
                assert!(decl.params.is_empty());
                assert!(decl.body.statements.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn keeps_argument_order() {
        assert_eq!(
            only_expr("f(a, 2, 'x');"),
            Expr::Call {
                callee: Box::new(Expr::variable("f")),
                args: vec![
                    Expr::variable("a"),
                    Expr::Number(2.0),
                    Expr::String("x".to_string())
                ],
            }
        );
    }

    #[test]
    fn builds_operators() {
        assert_eq!(
            only_expr("a === b;"),
            Expr::binary(Expr::variable("a"), BinaryOp::StrictEq, Expr::variable("b"))
        );
        assert_eq!(
            only_expr("-x++;"),
            Expr::Unary {
                op: UnaryOp::Minus,
                operand: Box::new(Expr::Postfix {
                    operand: Box::new(Expr::variable("x")),
                    op: PostfixOp::Increment,
                }),
            }
        );
    }

    #[test]
    fn builds_declarations() {
        let program = build(
            "interface Point3 extends Point { z: f64; tags: string[]; }\n\
             let p: Point = { x: 1, y: 2 };\n\
             function add(a: i32, b: i32): i32 { return a + b; }",
        );
        assert_eq!(
            program.statements[0],
            Stmt::InterfaceDecl(InterfaceDecl {
                name: "Point3".to_string(),
                extends: Some("Point".to_string()),
                members: vec![
                    InterfaceMember {
                        name: "z".to_string(),
                        ty: Type::scalar("f64"),
                    },
                    InterfaceMember {
                        name: "tags".to_string(),
                        ty: Type::new("string", 1),
                    },
                ],
            })
        );
        assert_eq!(
            program.statements[1],
            Stmt::VarDecl(VarDecl {
                name: "p".to_string(),
                ty: Type::scalar("Point"),
                value: Expr::ObjectLiteral(vec![
                    KeyValue {
                        key: "x".to_string(),
                        value: Expr::Number(1.0),
                    },
                    KeyValue {
                        key: "y".to_string(),
                        value: Expr::Number(2.0),
                    },
                ]),
            })
        );
        match &program.statements[2] {
            Stmt::FunctionDecl(decl) => {
                assert_eq!(decl.name, "add");
                assert_eq!(decl.params.len(), 2);
                assert_eq!(decl.return_type, Type::scalar("i32"));
                assert_eq!(decl.body.statements.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_non_start_root() {
        let node = SyntaxNode::new(Rule::Block, Vec::new(), Span::default());
        let err = build_program(&node).unwrap_err();
        assert!(matches!(err, CoreError::MalformedTree { rule: Rule::Block, .. }));
    }

    #[test]
    fn rejects_misshapen_productions() {
        // A var_decl without its initializer cannot come from the parser.
        let name = SyntaxToken {
            terminal: Terminal::Name,
            text: "x".to_string(),
            span: Span::default(),
        };
        let ty = SyntaxNode::new(Rule::Type, vec![name.clone().into()], Span::default());
        let decl = SyntaxNode::new(Rule::VarDecl, vec![name.into(), ty.into()], Span::default());
        let root = SyntaxNode::new(Rule::Start, vec![decl.into()], Span::default());
        let err = build_program(&root).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedTree { rule: Rule::VarDecl, .. }
        ));
    }
}
