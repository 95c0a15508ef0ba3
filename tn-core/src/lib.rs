//! Core pipeline for the TypeNative language.
//!
//! TypeNative is a small statically typed language with TypeScript-like
//! surface syntax that is transpiled to C++20 source text. The pipeline is:
//!
//!   source .tn
//!     -> lexer    (tokens)
//!     -> parser   (concrete syntax tree of named grammar productions)
//!     -> builder  (typed AST)
//!     -> lower    (C++ text against the runtime support library)
//!
//! The CLI depends on this crate rather than reimplementing any stage.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing, parsing and tree building
// ---------------------------------------------------------------------

pub mod lexer;
pub mod syntax;
pub mod parser;
pub mod ast;
pub mod types;
pub mod builder;

// ---------------------------------------------------------------------
// Back-end: rendering, lowering and pipeline orchestration
// ---------------------------------------------------------------------

pub mod render;
pub mod lower;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CompilationArtifact, parse_program, render, transpile};
pub use error::CoreError;
