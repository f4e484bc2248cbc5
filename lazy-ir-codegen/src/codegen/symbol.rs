use std::collections::BTreeSet;

/// Resolves an operator to its interned C++ symbol.
pub struct SymbolTable<'a> {
    missing_interned: &'a BTreeSet<String>,
}

impl<'a> SymbolTable<'a> {
    pub fn new(missing_interned: &'a BTreeSet<String>) -> Self {
        Self { missing_interned }
    }

    /// `at::aten::<name>`, or a string lookup for names the upstream
    /// symbol table lacks.
    pub fn aten_symbol(&self, aten_name: &str) -> String {
        if self.missing_interned.contains(aten_name) {
            log::debug!("{aten_name}: no interned symbol, using string lookup");
            format!("c10::Symbol::fromQualString(\"aten::{aten_name}\")")
        } else {
            format!("at::aten::{aten_name}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interned_and_missing_symbols() {
        let missing: BTreeSet<String> = ["sigmoid_backward".to_string()].into_iter().collect();
        let table = SymbolTable::new(&missing);
        assert_eq!(table.aten_symbol("add"), "at::aten::add");
        assert_eq!(
            table.aten_symbol("sigmoid_backward"),
            "c10::Symbol::fromQualString(\"aten::sigmoid_backward\")"
        );
    }

    #[test]
    fn empty_exception_set_interns_everything() {
        let missing = BTreeSet::new();
        let table = SymbolTable::new(&missing);
        assert_eq!(table.aten_symbol("sigmoid_backward"), "at::aten::sigmoid_backward");
    }
}
