//! Submitted source split into physical lines

/// An immutable view of a submission as 1-based physical lines.
#[derive(Debug, Clone)]
pub struct SourceText<'a> {
    lines: Vec<&'a str>,
}

impl<'a> SourceText<'a> {
    /// Split `code` on line breaks, dropping a trailing `\r` from each line.
    pub fn new(code: &'a str) -> Self {
        let lines = code
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        SourceText { lines }
    }

    /// Number of physical lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.trim().is_empty())
    }

    /// Line by 1-based number
    pub fn line(&self, number: usize) -> Option<&'a str> {
        number.checked_sub(1).and_then(|idx| self.lines.get(idx).copied())
    }

    /// All lines in order
    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    /// Iterate `(line_number, text)` pairs, numbering from 1.
    pub fn numbered(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        self.lines.iter().enumerate().map(|(idx, line)| (idx + 1, *line))
    }
}

/// Column (in characters) of the first non-whitespace character.
pub fn indentation(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_one_based() {
        let source = SourceText::new("a = 1\r\nb = 2\n");
        assert_eq!(source.len(), 3);
        assert_eq!(source.line(1), Some("a = 1"));
        assert_eq!(source.line(2), Some("b = 2"));
        assert_eq!(source.line(3), Some(""));
        assert_eq!(source.line(0), None);
        assert_eq!(source.line(4), None);
    }

    #[test]
    fn test_blank_source_is_empty() {
        assert!(SourceText::new("  \n\t\n").is_empty());
        assert!(!SourceText::new("x").is_empty());
    }

    #[test]
    fn test_indentation() {
        assert_eq!(indentation("    x"), 4);
        assert_eq!(indentation("\tx"), 1);
        assert_eq!(indentation("x"), 0);
    }
}
