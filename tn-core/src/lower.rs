//! Lowering from the AST to C++20 source text.
//!
//! The emitted text targets the runtime support library: `AutoRef<T>`
//! handles, `Array<T>` containers, `newString`, `newArray`, checked `at`
//! and `as<T>` accessors and the `Object` root type.
//!
//! Lowering is a pure function of the tree. The only context-sensitive
//! cases are empty array literals and object literals, which need the type
//! (and, for objects, the variable name) of the declaration they initialize.
//! That context is passed explicitly as a [`DeclContext`] and only by
//! `VarDecl`; anywhere else those literals are rejected.

use tracing::debug;

use crate::ast::{
    BinaryOp, Block, Expr, FunctionDecl, InterfaceDecl, KeyValue, Program, Stmt, VarDecl,
};
use crate::error::CoreError;
use crate::types::Type;

type LowerResult<T> = Result<T, CoreError>;

/// Fixed include lines at the top of every generated translation unit.
pub const PREAMBLE: &[&str] = &[
    "#include \"src/core/core.hpp\"",
    "#include <cmath>",
    "#include <initializer_list>",
];

/// Declaration an initializer expression is bound to.
#[derive(Debug, Clone, Copy)]
pub struct DeclContext<'a> {
    pub name: &'a str,
    pub ty: &'a Type,
}

/// Lower a whole program: preamble, blank line, then the statements.
pub fn lower_program(program: &Program) -> LowerResult<String> {
    debug!(statements = program.statements.len(), "lowering program");
    let statements = program
        .statements
        .iter()
        .map(lower_stmt)
        .collect::<LowerResult<Vec<_>>>()?;
    Ok(format!("{}\n\n{}", PREAMBLE.join("\n"), statements.join("\n")))
}

pub fn lower_stmt(stmt: &Stmt) -> LowerResult<String> {
    match stmt {
        Stmt::VarDecl(decl) => lower_var_decl(decl),
        Stmt::FunctionDecl(decl) => lower_function(decl),
        Stmt::InterfaceDecl(decl) => Ok(lower_interface(decl)),
        Stmt::Block(block) => lower_block(block),
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut out = format!("if ({}) {}", lower_expr(condition)?, lower_stmt(then_branch)?);
            if let Some(else_branch) = else_branch {
                out.push_str(" else ");
                out.push_str(&lower_stmt(else_branch)?);
            }
            Ok(out)
        }
        Stmt::While { condition, body } => Ok(format!(
            "while ({}) {}",
            lower_expr(condition)?,
            lower_stmt(body)?
        )),
        Stmt::Return(Some(value)) => Ok(format!("return {};", lower_expr(value)?)),
        Stmt::Return(None) => Ok("return;".to_string()),
        Stmt::Expr(expr) => Ok(format!("{};", lower_expr(expr)?)),
    }
}

fn lower_var_decl(decl: &VarDecl) -> LowerResult<String> {
    let context = DeclContext {
        name: &decl.name,
        ty: &decl.ty,
    };
    Ok(format!(
        "{} {} = {};",
        decl.ty.lower(),
        decl.name,
        lower_initializer(&decl.value, context)?
    ))
}

fn lower_block(block: &Block) -> LowerResult<String> {
    let statements = block
        .statements
        .iter()
        .map(lower_stmt)
        .collect::<LowerResult<Vec<_>>>()?;
    Ok(format!("{{\n{}\n}}", statements.join("\n")))
}

fn lower_function(decl: &FunctionDecl) -> LowerResult<String> {
    let params = decl
        .params
        .iter()
        .map(|param| format!("{} {}", param.ty.lower(), param.name))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "{} {}({})\n{}",
        decl.return_type.lower(),
        decl.name,
        params,
        lower_block(&decl.body)?
    ))
}

fn lower_interface(decl: &InterfaceDecl) -> String {
    let parent = decl.extends.as_deref().unwrap_or("Object");
    let members = decl
        .members
        .iter()
        .map(|member| format!("{} {};", member.ty.lower(), member.name))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "struct {} : virtual public {} {{\n{}\n}};",
        decl.name, parent, members
    )
}

/// Lower the direct initializer of a declaration.
pub fn lower_initializer(expr: &Expr, context: DeclContext<'_>) -> LowerResult<String> {
    match expr {
        Expr::ArrayLiteral(elements) if elements.is_empty() => {
            Ok(format!("{}::make()", context.ty.lower()))
        }
        Expr::ObjectLiteral(pairs) => lower_object_literal(pairs, context),
        other => lower_expr(other),
    }
}

/// A default instance followed by one field assignment per pair, in order.
fn lower_object_literal(pairs: &[KeyValue], context: DeclContext<'_>) -> LowerResult<String> {
    let mut out = format!("{}::make()", context.ty.lower());
    for pair in pairs {
        out.push_str(&format!(
            "; {}->{} = {}",
            context.name,
            pair.key,
            lower_expr(&pair.value)?
        ));
    }
    Ok(out)
}

pub fn lower_expr(expr: &Expr) -> LowerResult<String> {
    Ok(match expr {
        Expr::Number(value) => lower_number(*value),
        Expr::String(value) => format!("newString(\"{}\")", escape_cpp_string(value)),
        Expr::Boolean(true) => "true".to_string(),
        Expr::Boolean(false) => "false".to_string(),
        Expr::Null => "nullptr".to_string(),
        Expr::Variable(name) => name.clone(),
        Expr::ArrayLiteral(elements) => {
            if elements.is_empty() {
                return Err(CoreError::LiteralRequiresDeclaration {
                    kind: "empty array",
                });
            }
            format!(
                "newArray(std::initializer_list({{{}}}))",
                lower_list(elements)?
            )
        }
        Expr::ObjectLiteral(_) => {
            return Err(CoreError::LiteralRequiresDeclaration { kind: "object" });
        }
        Expr::Assignment { target, value } => {
            format!("{} = {}", lower_expr(target)?, lower_expr(value)?)
        }
        Expr::Binary { left, op, right } => {
            let left = lower_expr(left)?;
            let right = lower_expr(right)?;
            match op {
                BinaryOp::Pow => format!("std::pow({left}, {right})"),
                BinaryOp::StrictEq => format!("(*({left}) == *({right}))"),
                BinaryOp::StrictNeq => format!("(*({left}) != *({right}))"),
                op => format!("({left} {} {right})", op.symbol()),
            }
        }
        Expr::Unary { op, operand } => format!("({}{})", op.symbol(), lower_expr(operand)?),
        Expr::Postfix { operand, op } => format!("({}{})", lower_expr(operand)?, op.symbol()),
        Expr::TypeCast { expr, ty } => format!("({}.as<{}>())", lower_expr(expr)?, ty.name),
        Expr::Call { callee, args } => format!("{}({})", lower_expr(callee)?, lower_list(args)?),
        Expr::ArrayAccess { array, index } => {
            format!("{}->at({})", lower_expr(array)?, lower_expr(index)?)
        }
        Expr::FieldAccess { object, field } => format!("{}->{}", lower_expr(object)?, field),
    })
}

fn lower_list(exprs: &[Expr]) -> LowerResult<String> {
    Ok(exprs
        .iter()
        .map(lower_expr)
        .collect::<LowerResult<Vec<_>>>()?
        .join(", "))
}

/// Integral values print as plain integers; everything else is a `float`
/// literal with an explicit `f` suffix.
pub fn lower_number(value: f64) -> String {
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}INFINITY");
    }
    if value.fract() == 0.0 {
        // -0.0 is integral too and prints as plain 0.
        if value == 0.0 {
            return "0".to_string();
        }
        return format!("{value}");
    }
    format!("{value}f")
}

/// Escape text for the inside of a C++ string literal.
pub fn escape_cpp_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            // Three octal digits never swallow a following digit.
            c if c.is_ascii_control() => escaped.push_str(&format!("\\{:03o}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}
