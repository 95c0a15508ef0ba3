//! Semantic type descriptors.
//!
//! A type is nothing more than a base name plus an array nesting depth.
//! There is no registry of declared types: two types are the same when
//! their names and depths are the same.

use std::fmt;

/// Base names that lower to C++ value types without an ownership wrapper.
pub const VALUE_TYPES: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "u8", "u16", "u32", "u64", "u128", "f32", "f64", "f128",
    "void",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    pub name: String,
    /// Array nesting depth; 0 for scalars.
    pub array_dims: usize,
}

impl Type {
    pub fn new(name: impl Into<String>, array_dims: usize) -> Self {
        Type {
            name: name.into(),
            array_dims,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Type::new(name, 0)
    }

    pub fn is_array(&self) -> bool {
        self.array_dims > 0
    }

    /// Returns true if the base name lowers to an unwrapped primitive.
    pub fn is_value_type(&self) -> bool {
        matches!(self.name.as_str(), "boolean" | "number") || VALUE_TYPES.contains(&self.name.as_str())
    }

    /// C++ spelling of the base name, before any array wrapping.
    fn lower_base(&self) -> String {
        match self.name.as_str() {
            "boolean" => "bool".to_string(),
            "number" => "f64".to_string(),
            name if self.is_value_type() => name.to_string(),
            name => format!("AutoRef<{name}>"),
        }
    }

    /// Lower to C++ type text.
    ///
    /// Arrays are always reference types: `i32[][]` becomes
    /// `AutoRef<Array<Array<i32>>>`, the element is wrapped first and the
    /// whole nested array is wrapped in a single `AutoRef`.
    pub fn lower(&self) -> String {
        let base = self.lower_base();
        if !self.is_array() {
            return base;
        }
        format!(
            "AutoRef<{}{}{}>",
            "Array<".repeat(self.array_dims),
            base,
            ">".repeat(self.array_dims)
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, "[]".repeat(self.array_dims))
    }
}
