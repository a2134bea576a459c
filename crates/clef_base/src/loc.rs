//! Source locations for tokens, AST nodes and diagnostics.
//!
//! A [`Loc`] is a `(file, line, column)` triple.  File names are kept
//! out of the location itself: the lexer registers each file with a
//! [`SourceMap`] and locations carry a small [`FileId`].  Preprocessed
//! input switches files through `# line "name"` markers, so several
//! file ids can appear within one translation unit.

/// Handle to a file name registered in a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileId(u32);

/// A source position: file, 1-based line, 1-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Loc {
    pub file: FileId,
    pub line: u32,
    pub column: u32,
}

impl Loc {
    pub fn new(file: FileId, line: u32, column: u32) -> Self {
        Loc { file, line, column }
    }
}

/// Registry of file names referenced by [`Loc`]s.
#[derive(Debug, Default)]
pub struct SourceMap {
    names: Vec<String>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file name, reusing the id of an already known name.
    pub fn add_file(&mut self, name: &str) -> FileId {
        if let Some(pos) = self.names.iter().position(|n| n == name) {
            return FileId(pos as u32);
        }
        self.names.push(name.to_string());
        FileId(self.names.len() as u32 - 1)
    }

    /// Returns the name for `id`, or `"<unknown>"` for a foreign id.
    pub fn name(&self, id: FileId) -> &str {
        self.names
            .get(id.0 as usize)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_file_reuses_ids_for_equal_names() {
        let mut map = SourceMap::new();
        let a = map.add_file("t.c");
        let b = map.add_file("t.c");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_names_get_distinct_ids() {
        let mut map = SourceMap::new();
        let a = map.add_file("a.c");
        let b = map.add_file("b.h");
        assert_ne!(a, b);
        assert_eq!(map.name(a), "a.c");
        assert_eq!(map.name(b), "b.h");
    }

    #[test]
    fn unknown_id_renders_placeholder() {
        let map = SourceMap::new();
        assert_eq!(map.name(FileId(7)), "<unknown>");
    }
}
