use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::interpreter::{Namespace, Value};

/// The session-wide name → namespace lookup table (the module system).
///
/// Cloning produces another handle onto the same table. Entries are never
/// removed during a session; `ensure` refuses to clobber existing entries,
/// and only `bind`, the canonical registration point of a build, may
/// replace what a name points to.
#[derive(Clone, Default)]
pub struct ModuleTable {
    entries: Rc<RefCell<HashMap<String, Namespace>>>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Namespace> {
        self.entries.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    /// Register a fresh empty namespace under `name` unless one already
    /// exists, returning the registered handle either way.
    pub fn ensure(&self, name: &str) -> Namespace {
        let mut entries = self.entries.borrow_mut();
        entries
            .entry(name.to_string())
            .or_insert_with(Namespace::new)
            .clone()
    }

    /// Canonical registration of a built module.
    pub fn bind(&self, name: &str, namespace: Namespace) {
        self.entries
            .borrow_mut()
            .insert(name.to_string(), namespace);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Synthesize the ancestor chain of a dotted name so that nested access
    /// works: every prefix gets a table entry, and every parent namespace
    /// gets an attribute aliasing its immediate child. Idempotent.
    pub fn link_ancestors(&self, full_name: &str) {
        let names: Vec<&str> = full_name.split('.').collect();
        for it in 0..names.len() {
            let prefix = names[..=it].join(".");
            self.ensure(&prefix);
        }
        for it in (1..names.len()).rev() {
            let parent = names[..it].join(".");
            let child = names[..=it].join(".");
            if let (Some(parent_ns), Some(child_ns)) = (self.lookup(&parent), self.lookup(&child))
            {
                parent_ns.set(names[it], Value::Module(child_ns));
            }
        }
    }
}

// Only registered names are printed; namespaces can alias each other.
impl fmt::Debug for ModuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.entries.borrow().keys().cloned().collect();
        names.sort();
        write!(f, "ModuleTable({:?})", names)
    }
}

/// A resolved build invocation: the user-supplied leaf identifier plus the
/// dotted full name it registers under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub leaf: String,
    pub full_name: String,
}

impl BuildSpec {
    /// Resolve the token shapes `name` and `name in parent`. Anything else
    /// is a usage error and must leave all registry state untouched.
    pub fn parse(tokens: &[&str]) -> Option<Self> {
        match tokens {
            [name] => Some(Self {
                leaf: (*name).to_string(),
                full_name: (*name).to_string(),
            }),
            [name, "in", parent] => Some(Self {
                leaf: (*name).to_string(),
                full_name: format!("{}.{}", parent, name),
            }),
            _ => None,
        }
    }

    /// The canonical invocation line, kept with the record for provenance.
    pub fn build_line(&self) -> String {
        if self.leaf == self.full_name {
            format!("mod build {}", self.full_name)
        } else {
            let parent = &self.full_name[..self.full_name.len() - self.leaf.len() - 1];
            format!("mod build {} in {}", self.leaf, parent)
        }
    }

    /// Top-level package segment of the full name.
    pub fn top_level(&self) -> &str {
        self.full_name.split('.').next().unwrap_or(&self.full_name)
    }
}

/// One managed module: its namespace plus everything needed to re-display it.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub full_name: String,
    pub namespace: Namespace,
    pub source: String,
    pub build_line: String,
}

impl ModuleRecord {
    pub fn new(full_name: impl Into<String>, build_line: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            namespace: Namespace::new(),
            source: source.into(),
            build_line: build_line.into(),
        }
    }

    /// Last dotted component, used for the `show` fallback lookup.
    pub fn leaf(&self) -> &str {
        self.full_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.full_name)
    }
}

/// Ordered content store of managed modules, keyed by full name.
///
/// First-build order is preserved for listing no matter how many times a
/// module is rebuilt.
#[derive(Debug, Default)]
pub struct ModuleStore {
    records: HashMap<String, ModuleRecord>,
    order: Vec<String>,
}

impl ModuleStore {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn get(&self, full_name: &str) -> Option<&ModuleRecord> {
        self.records.get(full_name)
    }

    pub fn get_mut(&mut self, full_name: &str) -> Option<&mut ModuleRecord> {
        self.records.get_mut(full_name)
    }

    pub fn insert(&mut self, record: ModuleRecord) {
        if !self.records.contains_key(&record.full_name) {
            self.order.push(record.full_name.clone());
        }
        self.records.insert(record.full_name.clone(), record);
    }

    /// Registered full names in first-build order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Two-phase lookup: exact full name first, then the first record (in
    /// first-build order) whose leaf matches. Duplicated leaves therefore
    /// resolve to the earliest-registered module.
    pub fn find(&self, query: &str) -> Option<&ModuleRecord> {
        if let Some(record) = self.records.get(query) {
            return Some(record);
        }
        self.order
            .iter()
            .filter_map(|name| self.records.get(name))
            .find(|record| record.leaf() == query)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_spec_single_token() {
        let spec = BuildSpec::parse(&["alpha"]).unwrap();
        assert_eq!(spec.leaf, "alpha");
        assert_eq!(spec.full_name, "alpha");
        assert_eq!(spec.build_line(), "mod build alpha");
    }

    #[test]
    fn build_spec_parented() {
        let spec = BuildSpec::parse(&["leaf", "in", "pkg.sub"]).unwrap();
        assert_eq!(spec.leaf, "leaf");
        assert_eq!(spec.full_name, "pkg.sub.leaf");
        assert_eq!(spec.build_line(), "mod build leaf in pkg.sub");
        assert_eq!(spec.top_level(), "pkg");
    }

    #[test]
    fn build_spec_rejects_other_shapes() {
        assert!(BuildSpec::parse(&[]).is_none());
        assert!(BuildSpec::parse(&["a", "b"]).is_none());
        assert!(BuildSpec::parse(&["a", "within", "b"]).is_none());
        assert!(BuildSpec::parse(&["a", "in", "b", "c"]).is_none());
    }

    #[test]
    fn ensure_is_idempotent_and_preserves_entries() {
        let table = ModuleTable::new();
        let first = table.ensure("pkg");
        first.set("marker", Value::Int(7));
        let second = table.ensure("pkg");
        assert!(Namespace::ptr_eq(&first, &second));
        assert_eq!(second.get("marker"), Some(Value::Int(7)));
    }

    #[test]
    fn link_ancestors_builds_the_package_chain() {
        let table = ModuleTable::new();
        let leaf = table.ensure("a.b.c");
        table.link_ancestors("a.b.c");

        let a = table.lookup("a").unwrap();
        let ab = table.lookup("a.b").unwrap();
        match a.get("b") {
            Some(Value::Module(ns)) => assert!(Namespace::ptr_eq(&ns, &ab)),
            other => panic!("expected module attribute, found {other:?}"),
        }
        match ab.get("c") {
            Some(Value::Module(ns)) => assert!(Namespace::ptr_eq(&ns, &leaf)),
            other => panic!("expected module attribute, found {other:?}"),
        }
    }

    #[test]
    fn link_ancestors_is_idempotent() {
        let table = ModuleTable::new();
        table.ensure("a.b");
        table.link_ancestors("a.b");
        let a_before = table.lookup("a").unwrap();
        a_before.set("extra", Value::Int(1));

        table.link_ancestors("a.b");
        let a_after = table.lookup("a").unwrap();
        assert!(Namespace::ptr_eq(&a_before, &a_after));
        assert_eq!(a_after.get("extra"), Some(Value::Int(1)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn store_preserves_first_build_order() {
        let mut store = ModuleStore::new();
        store.insert(ModuleRecord::new("b", "mod build b", "x = 1\n"));
        store.insert(ModuleRecord::new("a", "mod build a", "y = 2\n"));
        // Rebuild of `b` keeps its original slot.
        let mut rebuilt = store.get("b").cloned().unwrap();
        rebuilt.source.push_str("x = 2\n");
        store.insert(rebuilt);
        assert_eq!(store.names(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn find_prefers_exact_then_first_registered_leaf() {
        let mut store = ModuleStore::new();
        store.insert(ModuleRecord::new("pkg.util", "mod build util in pkg", ""));
        store.insert(ModuleRecord::new("other.util", "mod build util in other", ""));
        // Exact match wins outright.
        assert_eq!(store.find("other.util").unwrap().full_name, "other.util");
        // Leaf fallback resolves to the first-registered record.
        assert_eq!(store.find("util").unwrap().full_name, "pkg.util");
        assert!(store.find("missing").is_none());
    }
}
