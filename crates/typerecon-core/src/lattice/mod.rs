//! Type lattice for type reconstruction
//!
//! Implements the value type assigned to every operand:
//! - Primitives (`Null`, `Boolean`, `Long`, `Double`, `String`, `Callable`)
//! - Objects, optionally carrying a class name compared case-insensitively
//! - Arrays, optionally carrying an element type
//! - Union and intersection combinators over member multisets
//! - `Unknown` for values the engine could not resolve
//!
//! Types are plain immutable values. Simplification and subtraction build
//! new values instead of mutating members in place.

pub mod comment;
mod decl;

use crate::error::{ReconstructError, Result};
use crate::ir::Literal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use comment::DocTag;

/// An inferred type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum Type {
    /// Not (yet) resolvable
    #[default]
    Unknown,
    Null,
    Boolean,
    Long,
    Double,
    String,
    /// An object; `None` is the generic object of unknown class
    Object(Option<String>),
    /// An array; `None` when the element type is not tracked
    Array(Option<Box<Type>>),
    Callable,
    Union(Vec<Type>),
    Intersection(Vec<Type>),
}

impl Type {
    /// The generic object type.
    pub fn object() -> Self {
        Type::Object(None)
    }

    /// An object of the named class. An empty name yields the generic object.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            Type::Object(None)
        } else {
            Type::Object(Some(name))
        }
    }

    /// An array without element information.
    pub fn array() -> Self {
        Type::Array(None)
    }

    pub fn array_of(element: Type) -> Self {
        Type::Array(Some(Box::new(element)))
    }

    /// `int|float`
    pub fn numeric() -> Self {
        Type::Union(vec![Type::Long, Type::Double])
    }

    /// The union of every primitive, used whenever nothing better is known.
    pub fn mixed() -> Self {
        Type::Union(vec![
            Type::Null,
            Type::Boolean,
            Type::Long,
            Type::Double,
            Type::String,
            Type::Object(None),
            Type::Array(None),
            Type::Callable,
        ])
    }

    /// Map a literal's runtime kind to its type.
    pub fn from_value(value: &Literal) -> Result<Self> {
        match value {
            Literal::Int(_) => Ok(Type::Long),
            Literal::Bool(_) => Ok(Type::Boolean),
            Literal::Float(_) => Ok(Type::Double),
            Literal::String(_) => Ok(Type::String),
            Literal::Null => Err(ReconstructError::UnsupportedLiteral {
                kind: value.kind_name(),
            }),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    /// Member types of a union or intersection; empty for anything else.
    pub fn members(&self) -> &[Type] {
        match self {
            Type::Union(members) | Type::Intersection(members) => members,
            _ => &[],
        }
    }

    /// Element type of an array that tracks one.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(Some(element)) => Some(element),
            _ => None,
        }
    }

    /// Class name of a named object type.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Object(Some(name)) => Some(name),
            _ => None,
        }
    }

    /// Flatten nested combinators of the same kind into their parent.
    ///
    /// Members that merely repeat each other are kept.
    pub fn simplify(self) -> Type {
        match self {
            Type::Union(members) => Type::Union(flatten(members, true)),
            Type::Intersection(members) => Type::Intersection(flatten(members, false)),
            other => other,
        }
    }

    /// Subtract `ty` from this type.
    ///
    /// A non-combinator equal to `ty` leaves `Null` behind. A combinator keeps
    /// its members that differ from `ty`; a single survivor is returned bare.
    pub fn remove_type(&self, ty: &Type) -> Result<Type> {
        let members = match self {
            Type::Union(members) | Type::Intersection(members) => members,
            _ if self == ty => return Ok(Type::Null),
            _ => return Ok(self.clone()),
        };
        let mut kept: Vec<Type> = members.iter().filter(|member| *member != ty).cloned().collect();
        match kept.len() {
            0 => Err(ReconstructError::EmptyCombinator {
                from: self.to_string(),
                removed: ty.to_string(),
            }),
            1 => Ok(kept.remove(0)),
            _ if matches!(self, Type::Union(_)) => Ok(Type::Union(kept)),
            _ => Ok(Type::Intersection(kept)),
        }
    }

    pub fn allows_null(&self) -> bool {
        match self {
            Type::Null => true,
            Type::Union(members) => members.iter().any(Type::allows_null),
            Type::Intersection(members) => members.iter().all(Type::allows_null),
            _ => false,
        }
    }

    /// Whether every value of this type is also a value of `other`.
    ///
    /// Class names are compared by name only; inheritance is not consulted.
    pub fn is_subset_of(&self, other: &Type) -> bool {
        if self.is_unknown() || other.is_unknown() {
            return false;
        }
        if self == other && !matches!(self, Type::Array(_)) {
            return true;
        }
        match (self, other) {
            (Type::Union(members), _) => members.iter().all(|m| m.is_subset_of(other)),
            (_, Type::Intersection(members)) => members.iter().all(|m| self.is_subset_of(m)),
            (Type::Intersection(members), _) => members.iter().any(|m| m.is_subset_of(other)),
            (_, Type::Union(members)) => members.iter().any(|m| self.is_subset_of(m)),
            (Type::Object(_), Type::Object(None)) => true,
            (Type::Object(Some(name)), Type::Callable) => name.eq_ignore_ascii_case("closure"),
            (Type::Array(_), Type::Array(None)) => true,
            (Type::Array(Some(a)), Type::Array(Some(b))) => a.is_subset_of(b),
            _ => false,
        }
    }

    /// Subset that is not also equal.
    pub fn is_strict_subset_of(&self, other: &Type) -> bool {
        self.is_subset_of(other) && self != other
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        let (members, separator) = match self {
            Type::Unknown => return f.write_str("unknown"),
            Type::Null => return f.write_str("null"),
            Type::Boolean => return f.write_str("bool"),
            Type::Long => return f.write_str("int"),
            Type::Double => return f.write_str("float"),
            Type::String => return f.write_str("string"),
            Type::Callable => return f.write_str("callable"),
            Type::Object(Some(name)) => return f.write_str(name),
            Type::Object(None) => return f.write_str("object"),
            Type::Array(None) => return f.write_str("array"),
            Type::Array(Some(element)) => {
                element.write(f, true)?;
                return f.write_str("[]");
            }
            Type::Union(members) => (members, "|"),
            Type::Intersection(members) => (members, "&"),
        };
        if nested {
            f.write_str("(")?;
        }
        for (i, member) in members.iter().enumerate() {
            if i > 0 {
                f.write_str(separator)?;
            }
            member.write(f, true)?;
        }
        if nested {
            f.write_str(")")?;
        }
        Ok(())
    }
}

fn flatten(members: Vec<Type>, union: bool) -> Vec<Type> {
    let mut flat = Vec::with_capacity(members.len());
    for member in members {
        match member.simplify() {
            Type::Union(inner) if union => flat.extend(inner),
            Type::Intersection(inner) if !union => flat.extend(inner),
            other => flat.push(other),
        }
    }
    flat
}

/// Multiset equality: each member must pair with a distinct equal member.
fn same_members(a: &[Type], b: &[Type]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|left| {
        let hit = b
            .iter()
            .enumerate()
            .position(|(i, right)| !used[i] && left == right);
        match hit {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

/// Structural equality. Object names ignore ASCII case and array element
/// types are not compared.
impl PartialEq for Type {
    fn eq(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Object(a), Type::Object(b)) => match (a, b) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            },
            (Type::Union(a), Type::Union(b)) | (Type::Intersection(a), Type::Intersection(b)) => {
                same_members(a, b)
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, false)
    }
}

/// Merge the candidate types gathered for one variable.
///
/// Returns `None` when a candidate is still unknown or nothing was gathered.
pub fn merge_types(types: &[Type]) -> Option<Type> {
    match types {
        [] => None,
        [only] => Some(only.clone()),
        [first, rest @ ..] => {
            if types.iter().any(Type::is_unknown) {
                return None;
            }
            if rest.iter().all(|ty| ty == first) {
                return Some(first.clone());
            }
            Some(Type::Union(types.to_vec()).simplify())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_equality_ignores_order() {
        let a = Type::Union(vec![Type::Long, Type::String]);
        let b = Type::Union(vec![Type::String, Type::Long]);
        assert_eq!(a, b);
        assert_eq!(b, a);
    }

    #[test]
    fn test_union_equality_respects_counts() {
        let a = Type::Union(vec![Type::Long, Type::Long, Type::String]);
        let b = Type::Union(vec![Type::Long, Type::String, Type::String]);
        assert_ne!(a, b);
        assert_ne!(a, Type::Union(vec![Type::Long, Type::String]));
    }

    #[test]
    fn test_union_is_not_intersection() {
        let members = vec![Type::Long, Type::String];
        assert_ne!(Type::Union(members.clone()), Type::Intersection(members));
    }

    #[test]
    fn test_object_names_compare_case_insensitively() {
        assert_eq!(Type::named("Foo\\Bar"), Type::named("foo\\BAR"));
        assert_ne!(Type::named("Foo"), Type::named("Bar"));
        assert_ne!(Type::named("Foo"), Type::object());
        assert_eq!(Type::named(""), Type::object());
    }

    #[test]
    fn test_array_equality_is_coarse() {
        assert_eq!(Type::array_of(Type::Long), Type::array_of(Type::String));
        assert_eq!(Type::array_of(Type::Long), Type::array());
    }

    #[test]
    fn test_simplify_flattens_same_kind() {
        let nested = Type::Union(vec![
            Type::Union(vec![Type::Long, Type::Double]),
            Type::String,
        ]);
        assert_eq!(
            nested.simplify(),
            Type::Union(vec![Type::Long, Type::Double, Type::String])
        );
    }

    #[test]
    fn test_simplify_keeps_other_kind_nested() {
        let inner = Type::Intersection(vec![Type::named("A"), Type::named("B")]);
        let ty = Type::Union(vec![inner.clone(), Type::Null]).simplify();
        assert_eq!(ty.members().len(), 2);
        assert_eq!(ty.members()[0], inner);
    }

    #[test]
    fn test_simplify_keeps_duplicates() {
        let ty = Type::Union(vec![Type::Union(vec![Type::Long]), Type::Long]).simplify();
        assert_eq!(ty, Type::Union(vec![Type::Long, Type::Long]));
    }

    #[test]
    fn test_remove_type_from_primitive() {
        assert_eq!(Type::Long.remove_type(&Type::Long).unwrap(), Type::Null);
        assert_eq!(Type::Long.remove_type(&Type::String).unwrap(), Type::Long);
        assert_eq!(Type::array().remove_type(&Type::array()).unwrap(), Type::Null);
    }

    #[test]
    fn test_remove_type_collapses_single_member() {
        let ty = Type::Union(vec![Type::named("Foo"), Type::Null]);
        assert_eq!(ty.remove_type(&Type::Null).unwrap(), Type::named("Foo"));
    }

    #[test]
    fn test_remove_type_from_mixed() {
        let ty = Type::mixed().remove_type(&Type::Null).unwrap();
        assert_eq!(ty.members().len(), 7);
        assert!(!ty.allows_null());
    }

    #[test]
    fn test_remove_type_emptying_combinator_fails() {
        let ty = Type::Union(vec![Type::Long, Type::Long]);
        assert!(matches!(
            ty.remove_type(&Type::Long),
            Err(ReconstructError::EmptyCombinator { .. })
        ));
    }

    #[test]
    fn test_allows_null() {
        assert!(Type::Null.allows_null());
        assert!(Type::mixed().allows_null());
        assert!(!Type::numeric().allows_null());
        assert!(!Type::Intersection(vec![Type::Null, Type::Long]).allows_null());
        assert!(Type::Intersection(vec![Type::Null, Type::Union(vec![Type::Null])]).allows_null());
    }

    #[test]
    fn test_subset_relation() {
        assert!(Type::Long.is_subset_of(&Type::numeric()));
        assert!(Type::numeric().is_subset_of(&Type::mixed()));
        assert!(!Type::mixed().is_subset_of(&Type::numeric()));
        assert!(Type::named("Foo").is_subset_of(&Type::object()));
        assert!(!Type::object().is_subset_of(&Type::named("Foo")));
        assert!(Type::array_of(Type::Long).is_subset_of(&Type::array()));
        assert!(!Type::array().is_subset_of(&Type::array_of(Type::Long)));
        assert!(Type::named("Closure").is_subset_of(&Type::Callable));
        assert!(!Type::Unknown.is_subset_of(&Type::Unknown));
    }

    #[test]
    fn test_strict_subset() {
        assert!(Type::Long.is_strict_subset_of(&Type::numeric()));
        assert!(!Type::numeric().is_strict_subset_of(&Type::numeric()));
        assert!(!Type::Long.is_strict_subset_of(&Type::Long));
    }

    #[test]
    fn test_from_value() {
        assert_eq!(Type::from_value(&Literal::Int(1)).unwrap(), Type::Long);
        assert_eq!(Type::from_value(&Literal::Float(1.5)).unwrap(), Type::Double);
        assert_eq!(Type::from_value(&Literal::Bool(true)).unwrap(), Type::Boolean);
        assert_eq!(
            Type::from_value(&Literal::String("a".into())).unwrap(),
            Type::String
        );
        assert!(Type::from_value(&Literal::Null).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::array_of(Type::Long).to_string(), "int[]");
        assert_eq!(Type::named("Foo\\Bar").to_string(), "Foo\\Bar");
        assert_eq!(
            Type::Union(vec![
                Type::Intersection(vec![Type::named("A"), Type::named("B")]),
                Type::Null,
            ])
            .to_string(),
            "(A&B)|null"
        );
        assert_eq!(
            Type::array_of(Type::Union(vec![Type::Long, Type::String])).to_string(),
            "(int|string)[]"
        );
        insta::assert_snapshot!(
            Type::mixed().to_string(),
            @"null|bool|int|float|string|object|array|callable"
        );
    }

    #[test]
    fn test_merge_types() {
        assert_eq!(merge_types(&[]), None);
        assert_eq!(merge_types(&[Type::Long]), Some(Type::Long));
        assert_eq!(merge_types(&[Type::Long, Type::Long]), Some(Type::Long));
        assert_eq!(merge_types(&[Type::Long, Type::Unknown]), None);
        assert_eq!(
            merge_types(&[Type::Long, Type::numeric()]),
            Some(Type::Union(vec![Type::Long, Type::Long, Type::Double]))
        );
    }
}
