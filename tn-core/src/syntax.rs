//! Concrete parse tree produced by the parser and consumed by the builder.
//!
//! The tree is deliberately untyped: every named grammar production becomes a
//! [`SyntaxNode`] tagged with its [`Rule`], and its children are the payload
//! tokens and sub-productions in source order. Punctuation and keywords are
//! not kept. Optional positional slots hold [`SyntaxElement::Missing`].

use std::fmt;

use crate::span::Span;

/// Named grammar productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Start,

    // Statements and declarations
    VarDecl,
    FunctionDecl,
    Parameters,
    Param,
    InterfaceDecl,
    ExtendsClause,
    InterfaceMember,
    Block,
    IfStmt,
    WhileStmt,
    ReturnStmt,
    ExprStmt,
    Type,

    // Binary operators
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    OrOp,
    AndOp,
    BitwiseOrOp,
    BitwiseXorOp,
    BitwiseAndOp,
    Eq,
    Neq,
    StrictEq,
    StrictNeq,
    Lt,
    Gt,
    Lte,
    Gte,
    Lshift,
    Rshift,

    // Prefix and postfix operators
    Pos,
    Neg,
    NotOp,
    BitwiseNotOp,
    PreInc,
    PreDec,
    PostInc,
    PostDec,

    // Other expressions
    TypeCast,
    FunctionCall,
    Arguments,
    ArrayAccess,
    FieldAccess,
    ArrayLiteral,
    ObjectLiteral,
    KeyValuePairs,
    KeyValue,
    Var,
    TrueLit,
    FalseLit,
    NullLit,
}

impl Rule {
    pub fn name(self) -> &'static str {
        match self {
            Rule::Start => "start",
            Rule::VarDecl => "var_decl",
            Rule::FunctionDecl => "function_decl",
            Rule::Parameters => "parameters",
            Rule::Param => "param",
            Rule::InterfaceDecl => "interface_decl",
            Rule::ExtendsClause => "extends_clause",
            Rule::InterfaceMember => "interface_member",
            Rule::Block => "block",
            Rule::IfStmt => "if_stmt",
            Rule::WhileStmt => "while_stmt",
            Rule::ReturnStmt => "return_stmt",
            Rule::ExprStmt => "expr_stmt",
            Rule::Type => "type",
            Rule::Assign => "assign",
            Rule::Add => "add",
            Rule::Sub => "sub",
            Rule::Mul => "mul",
            Rule::Div => "div",
            Rule::Mod => "mod",
            Rule::Pow => "pow",
            Rule::OrOp => "or_op",
            Rule::AndOp => "and_op",
            Rule::BitwiseOrOp => "bitwise_or_op",
            Rule::BitwiseXorOp => "bitwise_xor_op",
            Rule::BitwiseAndOp => "bitwise_and_op",
            Rule::Eq => "eq",
            Rule::Neq => "neq",
            Rule::StrictEq => "strict_eq",
            Rule::StrictNeq => "strict_neq",
            Rule::Lt => "lt",
            Rule::Gt => "gt",
            Rule::Lte => "lte",
            Rule::Gte => "gte",
            Rule::Lshift => "lshift",
            Rule::Rshift => "rshift",
            Rule::Pos => "pos",
            Rule::Neg => "neg",
            Rule::NotOp => "not_op",
            Rule::BitwiseNotOp => "bitwise_not_op",
            Rule::PreInc => "pre_inc",
            Rule::PreDec => "pre_dec",
            Rule::PostInc => "post_inc",
            Rule::PostDec => "post_dec",
            Rule::TypeCast => "type_cast",
            Rule::FunctionCall => "function_call",
            Rule::Arguments => "arguments",
            Rule::ArrayAccess => "array_access",
            Rule::FieldAccess => "field_access",
            Rule::ArrayLiteral => "array_literal",
            Rule::ObjectLiteral => "object_literal",
            Rule::KeyValuePairs => "key_value_pairs",
            Rule::KeyValue => "key_value",
            Rule::Var => "var",
            Rule::TrueLit => "true_lit",
            Rule::FalseLit => "false_lit",
            Rule::NullLit => "null_lit",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kinds of payload tokens kept in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Name,
    Number,
    /// Raw string literal text, quotes and escapes included.
    String,
    /// One `[]` pair after a type name.
    ArraySuffix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxToken {
    pub terminal: Terminal,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxElement {
    Node(SyntaxNode),
    Token(SyntaxToken),
    /// Placeholder for an optional production that was not present.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub rule: Rule,
    pub children: Vec<SyntaxElement>,
    pub span: Span,
}

impl SyntaxNode {
    pub fn new(rule: Rule, children: Vec<SyntaxElement>, span: Span) -> Self {
        SyntaxNode {
            rule,
            children,
            span,
        }
    }
}

impl From<SyntaxNode> for SyntaxElement {
    fn from(node: SyntaxNode) -> Self {
        SyntaxElement::Node(node)
    }
}

impl From<SyntaxToken> for SyntaxElement {
    fn from(token: SyntaxToken) -> Self {
        SyntaxElement::Token(token)
    }
}

impl<T: Into<SyntaxElement>> From<Option<T>> for SyntaxElement {
    fn from(element: Option<T>) -> Self {
        element.map_or(SyntaxElement::Missing, Into::into)
    }
}
