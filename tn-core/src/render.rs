//! Canonical source rendering of the AST.
//!
//! Every compound expression is fully parenthesised, so re-parsing the
//! rendered text yields the same tree regardless of operator precedence.

use std::fmt::{self, Display, Formatter};

use crate::ast::{Block, Expr, FunctionDecl, InterfaceDecl, Program, Stmt, VarDecl};

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_separated(f, &self.statements, "\n")
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("{\n")?;
        write_separated(f, &self.statements, "\n")?;
        f.write_str("\n}")
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::VarDecl(decl) => decl.fmt(f),
            Stmt::FunctionDecl(decl) => decl.fmt(f),
            Stmt::InterfaceDecl(decl) => decl.fmt(f),
            Stmt::Block(block) => block.fmt(f),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                write!(f, "if ({condition}) {then_branch}")?;
                if let Some(else_branch) = else_branch {
                    write!(f, " else {else_branch}")?;
                }
                Ok(())
            }
            Stmt::While { condition, body } => write!(f, "while ({condition}) {body}"),
            Stmt::Return(Some(value)) => write!(f, "return {value};"),
            Stmt::Return(None) => f.write_str("return;"),
            Stmt::Expr(expr) => write!(f, "{expr};"),
        }
    }
}

impl Display for VarDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "let {}: {} = {};", self.name, self.ty, self.value)
    }
}

impl Display for FunctionDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "function {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", param.name, param.ty)?;
        }
        write!(f, "): {}\n{}", self.return_type, self.body)
    }
}

impl Display for InterfaceDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "interface {}", self.name)?;
        if let Some(parent) = &self.extends {
            write!(f, " extends {parent}")?;
        }
        f.write_str(" {\n")?;
        for member in &self.members {
            writeln!(f, "{}: {};", member.name, member.ty)?;
        }
        f.write_str("}")
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            // Only an overflowing literal decodes to infinity.
            Expr::Number(value) if value.is_infinite() => {
                f.write_str(if value.is_sign_negative() { "(-1e400)" } else { "1e400" })
            }
            Expr::Number(value) => write!(f, "{value}"),
            Expr::String(value) => write!(f, "\"{}\"", escape_source_string(value)),
            Expr::Boolean(value) => write!(f, "{value}"),
            Expr::Null => f.write_str("null"),
            Expr::Variable(name) => f.write_str(name),
            Expr::ArrayLiteral(elements) => {
                f.write_str("[")?;
                write_separated(f, elements, ", ")?;
                f.write_str("]")
            }
            Expr::ObjectLiteral(pairs) => {
                f.write_str("{\n")?;
                for (i, pair) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",\n")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                f.write_str("\n}")
            }
            Expr::Assignment { target, value } => write!(f, "({target} = {value})"),
            Expr::Binary { left, op, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Unary { op, operand } => write!(f, "({}{operand})", op.symbol()),
            Expr::Postfix { operand, op } => write!(f, "({operand}{})", op.symbol()),
            Expr::TypeCast { expr, ty } => write!(f, "({expr} as {ty})"),
            Expr::Call { callee, args } => {
                write!(f, "{callee}(")?;
                write_separated(f, args, ", ")?;
                f.write_str(")")
            }
            Expr::ArrayAccess { array, index } => write!(f, "{array}[{index}]"),
            Expr::FieldAccess { object, field } => write!(f, "{object}.{field}"),
        }
    }
}

fn write_separated<T: Display>(f: &mut Formatter<'_>, items: &[T], separator: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        item.fmt(f)?;
    }
    Ok(())
}

/// Escapes a decoded string so the lexer reads it back unchanged.
fn escape_source_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_ascii_control() => escaped.push_str(&format!("\\x{:02x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}
