use tracing::debug;

use crate::ast::Program;
use crate::builder::build_program;
use crate::error::CoreError;
use crate::lower::lower_program;
use crate::parser::parse;

/// Output of a successful transpilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationArtifact {
    pub program: Program,
    /// Complete C++ translation unit, preamble included.
    pub cpp: String,
}

/// Lex, parse and build the AST for `source`.
pub fn parse_program(source: &str) -> Result<Program, CoreError> {
    let tree = parse(source)?;
    debug!(children = tree.children.len(), "parsed concrete tree");
    let program = build_program(&tree)?;
    debug!(statements = program.statements.len(), "built syntax tree");
    Ok(program)
}

pub fn transpile(source: &str) -> Result<CompilationArtifact, CoreError> {
    let program = parse_program(source)?;
    let cpp = lower_program(&program)?;
    debug!(bytes = cpp.len(), "lowered program to C++");
    Ok(CompilationArtifact { program, cpp })
}

/// Canonical, fully parenthesised rendering of `source`.
pub fn render(source: &str) -> Result<String, CoreError> {
    Ok(parse_program(source)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Stmt, VarDecl};
    use crate::span::Location;
    use crate::types::Type;

    const POINTS: &str = include_str!("../samples/points.tn");

    #[test]
    fn transpiles_sample_program() {
        let artifact = transpile(POINTS).expect("transpile should succeed");
        assert_eq!(artifact.program.statements.len(), 5);
        assert!(artifact.cpp.starts_with("#include \"src/core/core.hpp\"\n"));
        assert!(
            artifact
                .cpp
                .contains("struct Point3 : virtual public Point {\nf64 z;\n};")
        );
        assert!(artifact.cpp.contains(
            "AutoRef<Point3> origin = AutoRef<Point3>::make(); origin->x = 0; origin->y = 0; origin->z = 0.5f;"
        ));
        assert!(
            artifact
                .cpp
                .contains("f64 length(AutoRef<Point> p)\n{\nreturn std::pow(((p->x * p->x) + (p->y * p->y)), 0.5f);\n}")
        );
        assert!(
            artifact
                .cpp
                .contains("AutoRef<Array<AutoRef<Point>>> path = AutoRef<Array<AutoRef<Point>>>::make();")
        );
    }

    #[test]
    fn transpile_is_idempotent() {
        let first = transpile(POINTS).expect("first run");
        let second = transpile(POINTS).expect("second run");
        assert_eq!(first, second);
    }

    #[test]
    fn parse_program_builds_declarations() {
        let program = parse_program("let n: number = 1;").expect("parse");
        assert_eq!(
            program.statements,
            vec![Stmt::VarDecl(VarDecl {
                name: "n".to_string(),
                ty: Type::scalar("number"),
                value: Expr::Number(1.0),
            })]
        );
    }

    #[test]
    fn render_output_transpiles_identically() {
        let rendered = render(POINTS).expect("render");
        assert_eq!(
            transpile(&rendered).expect("rendered").cpp,
            transpile(POINTS).expect("source").cpp
        );
    }

    #[test]
    fn reports_parse_errors_with_location() {
        let err = transpile("let x: i32 = 1;\nlet y: i32 = ;").unwrap_err();
        match err {
            CoreError::Parse { location, .. } => {
                assert_eq!(location, Location { line: 2, column: 14 })
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_object_literal_outside_declaration() {
        let err = transpile("print({ x: 1 });").unwrap_err();
        assert_eq!(err, CoreError::LiteralRequiresDeclaration { kind: "object" });
    }
}
