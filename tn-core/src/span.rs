use std::fmt;

/// Byte range into the source of a single compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        &source[self.start as usize..self.end as usize]
    }
}

/// 1-based line/column position used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    /// Resolve a byte offset into a line/column pair.
    ///
    /// Columns count characters, not bytes, so multi-byte identifiers or
    /// string contents do not skew the reported position.
    pub fn locate(source: &str, offset: u32) -> Location {
        let offset = (offset as usize).min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        Location { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_offsets_on_later_lines() {
        let source = "let a: i32 = 1;\nlet b: i32 = 2;";
        assert_eq!(Location::locate(source, 0), Location { line: 1, column: 1 });
        assert_eq!(Location::locate(source, 20), Location { line: 2, column: 5 });
    }

    #[test]
    fn clamps_offsets_past_the_end() {
        let location = Location::locate("ab", 10);
        assert_eq!(location, Location { line: 1, column: 3 });
    }
}
