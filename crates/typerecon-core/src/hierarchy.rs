//! Class hierarchy index
//!
//! For every declared class and interface the index records the transitive
//! set of names it resolves to (itself, its implemented and extended
//! interfaces, its parent chain) and the inverse descendant sets. Names are
//! stored lowercased. Ancestor sets keep a deterministic order: the class
//! itself, then its interfaces in declaration order, then its parent's set.

use crate::ir::{ClassDecl, ClassId, ClassKind};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::warn;

/// Ancestor name mapped to its declaration, if the program declares it.
pub type AncestorSet = IndexMap<String, Option<ClassId>>;

/// A recoverable problem found while building the index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyIssue {
    #[error("could not find parent class `{parent}` of `{class}`")]
    MissingParent { class: String, parent: String },
}

#[derive(Debug, Clone, Default)]
pub struct ClassHierarchyIndex {
    resolves: IndexMap<String, AncestorSet>,
    resolved_by: IndexMap<String, IndexSet<String>>,
    issues: Vec<HierarchyIssue>,
}

impl ClassHierarchyIndex {
    /// Build the index from every class-like declaration. Traits are skipped.
    pub fn build(classes: &[ClassDecl]) -> Self {
        let mut decls: IndexMap<String, (ClassId, &ClassDecl)> = IndexMap::new();
        for (i, class) in classes.iter().enumerate() {
            if class.kind != ClassKind::Trait {
                decls
                    .entry(class.name.to_ascii_lowercase())
                    .or_insert((ClassId(i), class));
            }
        }

        let interface_extends: IndexMap<String, Vec<String>> = decls
            .iter()
            .filter(|(_, (_, decl))| decl.kind == ClassKind::Interface)
            .map(|(name, (_, decl))| (name.clone(), lowercased(&decl.extends)))
            .collect();

        // Self plus implemented interfaces, before parents are folded in.
        let mut own: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for (name, (_, decl)) in &decls {
            let mut set = IndexSet::new();
            set.insert(name.clone());
            let direct = match decl.kind {
                ClassKind::Interface => &decl.extends,
                _ => &decl.implements,
            };
            for interface in lowercased(direct) {
                set.extend(interface_closure(&interface, &interface_extends));
            }
            own.insert(name.clone(), set);
        }

        let mut index = ClassHierarchyIndex::default();
        for (name, (_, decl)) in &decls {
            let mut ancestors = AncestorSet::new();
            let mut visited = IndexSet::new();
            let mut queue = VecDeque::from([name.clone()]);
            while let Some(current) = queue.pop_front() {
                if !visited.insert(current.clone()) {
                    continue;
                }
                if let Some(set) = own.get(&current) {
                    for ancestor in set {
                        ancestors
                            .entry(ancestor.clone())
                            .or_insert_with(|| decls.get(ancestor).map(|(id, _)| *id));
                    }
                }
                let Some((_, current_decl)) = decls.get(&current) else {
                    continue;
                };
                if current_decl.kind == ClassKind::Interface {
                    continue;
                }
                for parent in &current_decl.extends {
                    let parent_lc = parent.to_ascii_lowercase();
                    if decls.contains_key(&parent_lc) {
                        queue.push_back(parent_lc);
                    } else if current == *name {
                        warn!(class = %decl.name, parent = %parent, "Could not find parent class");
                        index.issues.push(HierarchyIssue::MissingParent {
                            class: decl.name.clone(),
                            parent: parent.clone(),
                        });
                    }
                }
            }
            index.resolves.insert(name.clone(), ancestors);
        }

        for (child, ancestors) in &index.resolves {
            for ancestor in ancestors.keys() {
                index
                    .resolved_by
                    .entry(ancestor.clone())
                    .or_default()
                    .insert(child.clone());
            }
        }
        index
    }

    /// Full ancestor set of a class or interface, itself included.
    pub fn resolves(&self, name: &str) -> Option<&AncestorSet> {
        self.resolves.get(&name.to_ascii_lowercase())
    }

    /// Every declared class or interface that resolves to `name`.
    pub fn resolved_by(&self, name: &str) -> Option<&IndexSet<String>> {
        self.resolved_by.get(&name.to_ascii_lowercase())
    }

    /// Whether `name` is a declared class or interface.
    pub fn contains(&self, name: &str) -> bool {
        self.resolves.contains_key(&name.to_ascii_lowercase())
    }

    pub fn is_subclass_of(&self, child: &str, ancestor: &str) -> bool {
        self.resolves(child)
            .is_some_and(|set| set.contains_key(&ancestor.to_ascii_lowercase()))
    }

    pub fn issues(&self) -> &[HierarchyIssue] {
        &self.issues
    }
}

fn lowercased(names: &[String]) -> Vec<String> {
    names.iter().map(|name| name.to_ascii_lowercase()).collect()
}

/// `interface` followed by every interface it transitively extends.
fn interface_closure(interface: &str, extends: &IndexMap<String, Vec<String>>) -> IndexSet<String> {
    let mut seen = IndexSet::new();
    let mut stack = vec![interface.to_string()];
    while let Some(current) = stack.pop() {
        if !seen.insert(current.clone()) {
            continue;
        }
        if let Some(parents) = extends.get(&current) {
            stack.extend(parents.iter().rev().cloned());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: &AncestorSet) -> Vec<&str> {
        set.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_class_chain_is_transitive() {
        let index = ClassHierarchyIndex::build(&[
            ClassDecl::class("A").extends("B"),
            ClassDecl::class("B").extends("C"),
            ClassDecl::class("C"),
        ]);
        assert_eq!(names(index.resolves("A").unwrap()), vec!["a", "b", "c"]);
        let descendants = index.resolved_by("C").unwrap();
        for name in ["a", "b", "c"] {
            assert!(descendants.contains(name));
        }
        assert!(index.issues().is_empty());
    }

    #[test]
    fn test_interfaces_are_transitive() {
        let index = ClassHierarchyIndex::build(&[
            ClassDecl::class("A").implements("I"),
            ClassDecl::interface("I").extends("J"),
            ClassDecl::interface("J").extends("K").extends("L"),
            ClassDecl::interface("K"),
            ClassDecl::interface("L"),
        ]);
        assert_eq!(names(index.resolves("a").unwrap()), vec!["a", "i", "j", "k", "l"]);
        assert_eq!(names(index.resolves("I").unwrap()), vec!["i", "j", "k", "l"]);
        assert!(index.is_subclass_of("A", "L"));
        assert!(index.resolved_by("k").unwrap().contains("a"));
    }

    #[test]
    fn test_parent_interfaces_are_inherited() {
        let index = ClassHierarchyIndex::build(&[
            ClassDecl::class("Child").extends("Base"),
            ClassDecl::class("Base").implements("Countable"),
        ]);
        let set = index.resolves("child").unwrap();
        assert_eq!(names(set), vec!["child", "base", "countable"]);
        assert_eq!(set["base"], Some(ClassId(1)));
        assert_eq!(set["countable"], None);
    }

    #[test]
    fn test_forward_reference_resolves() {
        let index = ClassHierarchyIndex::build(&[
            ClassDecl::class("B").extends("A"),
            ClassDecl::class("A"),
        ]);
        assert!(index.is_subclass_of("b", "a"));
        assert!(!index.is_subclass_of("a", "b"));
    }

    #[test]
    fn test_missing_parent_is_recorded() {
        let index = ClassHierarchyIndex::build(&[
            ClassDecl::class("A").extends("Missing"),
            ClassDecl::class("B").extends("A"),
        ]);
        assert_eq!(
            index.issues(),
            &[HierarchyIssue::MissingParent {
                class: "A".into(),
                parent: "Missing".into(),
            }]
        );
        assert_eq!(names(index.resolves("B").unwrap()), vec!["b", "a"]);
    }

    #[test]
    fn test_inheritance_cycle_terminates() {
        let index = ClassHierarchyIndex::build(&[
            ClassDecl::class("A").extends("B"),
            ClassDecl::class("B").extends("A"),
        ]);
        assert_eq!(names(index.resolves("A").unwrap()), vec!["a", "b"]);
        assert_eq!(names(index.resolves("B").unwrap()), vec!["b", "a"]);
    }

    #[test]
    fn test_traits_are_skipped() {
        let index = ClassHierarchyIndex::build(&[ClassDecl::trait_decl("T")]);
        assert!(!index.contains("T"));
        assert!(index.resolved_by("T").is_none());
    }
}
