use std::collections::HashMap;

use super::Terminal;

/// Table of terminal spellings used by the longest-match scanner. Besides
/// exact lookup it answers whether any entry starts with a given prefix,
/// which drives maximal-munch for multi-character operators (`:=`, `==`,
/// `=>`, ...).
#[derive(Debug, Default)]
pub struct LexMap {
    entries: HashMap<&'static str, Terminal>,
}

impl LexMap {
    pub fn insert(&mut self, key: &'static str, value: Terminal) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<Terminal> {
        self.entries.get(key).copied()
    }

    pub fn can_match(&self, prefix: &str) -> bool {
        self.entries.keys().any(|key| key.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_lookup() {
        let mut map = LexMap::default();
        map.insert(":=", Terminal::Walrus);

        assert_eq!(map.get(":="), Some(Terminal::Walrus));
        assert_eq!(map.get(":"), None);
    }

    #[test]
    fn test_prefix_match() {
        let mut map = LexMap::default();
        map.insert(":=", Terminal::Walrus);
        map.insert(":", Terminal::Colon);

        assert!(map.can_match(":"));
        assert!(!map.can_match(";"));
    }
}
