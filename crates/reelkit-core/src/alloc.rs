//! Hash collections using AHash.
//!
//! Symbol lookups and resource registries sit on the per-frame path, so the
//! whole workspace uses these instead of the SipHash defaults.

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashmap_ahash() {
        let mut map = HashMap::new();
        map.insert("A", 0usize);
        map.insert("B", 1usize);
        assert_eq!(map.get("B"), Some(&1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_hashset_ahash() {
        let mut set = HashSet::new();
        assert!(set.insert("_"));
        assert!(!set.insert("_"));
    }
}
