use std::collections::HashMap;

/// An ordered, deduplicated set of symbol names establishing stable monomial positions.
///
/// Two series are compatible for multiplication iff their symbol sets are `==`. `SymbolSet`
/// itself carries no monomial data -- it only fixes what "position `i`" means.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolSet {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl SymbolSet {
    /// Builds a `SymbolSet` from an ordered list of names. Panics if a name repeats -- callers
    /// are expected to deduplicate before constructing rather than have this type silently merge
    /// or rename colliding symbols.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = SymbolSet::default();
        for name in names {
            let name = name.into();
            let position = set.names.len();
            if set.positions.insert(name.clone(), position).is_some() {
                panic!("duplicate symbol name in SymbolSet::new: {name}");
            }
            set.names.push(name);
        }
        set
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if this symbol set has no symbols.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The stable position of `name`, if present.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Iterates over symbol names in position order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// The union of `self` and `other`, in `self`'s order followed by any names in `other` not
    /// already present. Used to align two operands that are compatible in content but not in
    /// encounter order before a multiplication.
    pub fn union(&self, other: &SymbolSet) -> SymbolSet {
        let mut names: Vec<String> = self.names.clone();
        for name in &other.names {
            if !self.positions.contains_key(name) {
                names.push(name.clone());
            }
        }
        SymbolSet::new(names)
    }

    /// For each position in `target` (which must be a superset of `self`), the position in
    /// `self` that should be read to populate it, or `None` if `target` introduces a symbol
    /// `self` does not have (in which case the exponent at that position is zero).
    pub fn remap_positions(&self, target: &SymbolSet) -> Vec<Option<usize>> {
        target
            .names()
            .map(|name| self.position_of(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_stable_and_in_order() {
        let symbols = SymbolSet::new(["x", "y", "z"]);
        assert_eq!(symbols.len(), 3);
        assert_eq!(symbols.position_of("x"), Some(0));
        assert_eq!(symbols.position_of("y"), Some(1));
        assert_eq!(symbols.position_of("z"), Some(2));
        assert_eq!(symbols.position_of("w"), None);
    }

    #[test]
    fn equality_is_order_sensitive() {
        let a = SymbolSet::new(["x", "y"]);
        let b = SymbolSet::new(["y", "x"]);
        assert_ne!(a, b);
        assert_eq!(a, SymbolSet::new(["x", "y"]));
    }

    #[test]
    #[should_panic(expected = "duplicate symbol name")]
    fn duplicate_names_panic() {
        SymbolSet::new(["x", "x"]);
    }

    #[test]
    fn union_appends_new_names_in_order() {
        let a = SymbolSet::new(["x", "y"]);
        let b = SymbolSet::new(["y", "z"]);
        let u = a.union(&b);
        assert_eq!(u.names().collect::<Vec<_>>(), vec!["x", "y", "z"]);
    }

    #[test]
    fn remap_positions_finds_common_and_missing_symbols() {
        let a = SymbolSet::new(["x", "z"]);
        let target = SymbolSet::new(["x", "y", "z"]);
        let remap = a.remap_positions(&target);
        assert_eq!(remap, vec![Some(0), None, Some(1)]);
    }
}
