//! Parsing of type declaration text (`?Foo`, `int[]`, `(A&B)|null`, ...)

use super::Type;
use crate::error::DeclarationError;
use regex::Regex;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:[a-zA-Z_\x{7f}-\x{10ffff}][a-zA-Z0-9_\x{7f}-\x{10ffff}]*\\)*[a-zA-Z_\x{7f}-\x{10ffff}][a-zA-Z0-9_\x{7f}-\x{10ffff}]*$",
        )
        .expect("valid regex")
    })
}

impl Type {
    /// Parse a type annotation as written in a signature or doc comment.
    pub fn from_decl(decl: &str) -> Result<Type, DeclarationError> {
        if decl.is_empty() {
            return Err(DeclarationError::Empty);
        }
        let decl = if let Some(rest) = decl.strip_prefix('\\') {
            if rest.is_empty() {
                return Err(DeclarationError::Empty);
            }
            rest
        } else if let Some(inner) = decl.strip_prefix('?') {
            let ty = Type::from_decl(inner)?;
            return Ok(Type::Union(vec![ty, Type::Null]).simplify());
        } else {
            decl
        };

        if let Some(ty) = keyword(decl)? {
            return Ok(ty);
        }
        if decl.contains(&['|', '&', '(', ')'][..]) {
            return Ok(parse_combined(decl)?.simplify());
        }
        if let Some(element) = decl.strip_suffix("[]") {
            return Ok(Type::array_of(Type::from_decl(element)?));
        }
        if !identifier_re().is_match(decl) {
            return Err(DeclarationError::InvalidIdentifier(decl.to_string()));
        }
        Ok(Type::named(decl))
    }
}

fn keyword(decl: &str) -> Result<Option<Type>, DeclarationError> {
    let ty = match decl.to_ascii_lowercase().as_str() {
        "boolean" | "bool" | "false" | "true" => Type::Boolean,
        "integer" | "int" => Type::Long,
        "double" | "real" | "float" => Type::Double,
        "string" => Type::String,
        "array" => Type::array(),
        "callable" => Type::Callable,
        "object" => Type::object(),
        "null" | "void" => Type::Null,
        "mixed" => Type::mixed(),
        "numeric" => Type::from_decl("int|float")?,
        _ => return Ok(None),
    };
    Ok(Some(ty))
}

fn combine(combinator: u8, left: Type, right: Type) -> Type {
    if combinator == b'|' {
        Type::Union(vec![left, right])
    } else {
        Type::Intersection(vec![left, right])
    }
}

/// Parse a declaration containing a combinator or a parenthesized group.
fn parse_combined(decl: &str) -> Result<Type, DeclarationError> {
    if decl.starts_with('(') {
        let close = closing_paren(decl)
            .ok_or_else(|| DeclarationError::UnmatchedParentheses(decl.to_string()))?;
        let mut left = Type::from_decl(&decl[1..close])?;
        let mut rest = &decl[close + 1..];
        while let Some(tail) = rest.strip_prefix("[]") {
            left = Type::array_of(left);
            rest = tail;
        }
        if rest.is_empty() {
            return Ok(left);
        }
        let combinator = rest.as_bytes()[0];
        if combinator != b'|' && combinator != b'&' {
            return Err(DeclarationError::DanglingCombinator(rest.to_string()));
        }
        let right = Type::from_decl(&rest[1..])?;
        return Ok(combine(combinator, left, right));
    }

    let pos = top_level_combinator(decl)?
        .ok_or_else(|| DeclarationError::MissingCombinator(decl.to_string()))?;
    if pos == 0 {
        return Err(DeclarationError::DanglingCombinator(decl.to_string()));
    }
    let left = Type::from_decl(&decl[..pos])?;
    let right = Type::from_decl(&decl[pos + 1..])?;
    Ok(combine(decl.as_bytes()[pos], left, right))
}

/// Byte offset of the `)` closing the group that opens at offset 0.
fn closing_paren(decl: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, byte) in decl.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Leftmost `|` or `&` outside any parentheses.
fn top_level_combinator(decl: &str) -> Result<Option<usize>, DeclarationError> {
    let mut depth = 0usize;
    for (i, byte) in decl.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| DeclarationError::UnmatchedParentheses(decl.to_string()))?;
            }
            b'|' | b'&' if depth == 0 => return Ok(Some(i)),
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(decl: &str) -> Type {
        Type::from_decl(decl).unwrap_or_else(|e| panic!("failed to parse {decl}: {e}"))
    }

    #[test]
    fn test_primitive_keywords() {
        assert_eq!(parse("int"), Type::Long);
        assert_eq!(parse("INTEGER"), Type::Long);
        assert_eq!(parse("Bool"), Type::Boolean);
        assert_eq!(parse("false"), Type::Boolean);
        assert_eq!(parse("double"), Type::Double);
        assert_eq!(parse("real"), Type::Double);
        assert_eq!(parse("string"), Type::String);
        assert_eq!(parse("array"), Type::array());
        assert_eq!(parse("callable"), Type::Callable);
        assert_eq!(parse("void"), Type::Null);
        assert_eq!(parse("object"), Type::object());
        assert_eq!(parse("mixed"), Type::mixed());
    }

    #[test]
    fn test_numeric_expands() {
        assert_eq!(parse("numeric"), Type::numeric());
    }

    #[test]
    fn test_nullable() {
        assert_eq!(
            parse("?Foo"),
            Type::Union(vec![Type::named("Foo"), Type::Null]).simplify()
        );
        assert_eq!(parse("?int|string"), Type::Union(vec![
            Type::Long,
            Type::String,
            Type::Null,
        ]));
    }

    #[test]
    fn test_namespace_root_is_stripped() {
        assert_eq!(parse("\\Foo\\Bar"), Type::named("Foo\\Bar"));
        assert_eq!(parse("\\int"), Type::Long);
    }

    #[test]
    fn test_array_suffix() {
        let ty = parse("int[]");
        assert_eq!(ty.element_type(), Some(&Type::Long));
        let nested = parse("Foo[][]");
        assert_eq!(
            nested.element_type().and_then(Type::element_type),
            Some(&Type::named("Foo"))
        );
    }

    #[test]
    fn test_union_and_intersection() {
        assert_eq!(parse("int|string"), Type::Union(vec![Type::Long, Type::String]));
        assert_eq!(
            parse("A&B"),
            Type::Intersection(vec![Type::named("A"), Type::named("B")])
        );
        assert_eq!(
            parse("int|string|null"),
            Type::Union(vec![Type::Long, Type::String, Type::Null])
        );
    }

    #[test]
    fn test_leftmost_combinator_wins() {
        // `A&B|C` splits at `&` first: A & (B|C)
        let ty = parse("A&B|C");
        assert_eq!(
            ty,
            Type::Intersection(vec![
                Type::named("A"),
                Type::Union(vec![Type::named("B"), Type::named("C")]),
            ])
        );
    }

    #[test]
    fn test_parenthesized_groups() {
        assert_eq!(parse("(int|string)"), Type::Union(vec![Type::Long, Type::String]));
        assert_eq!(
            parse("(A&B)|null"),
            Type::Union(vec![
                Type::Intersection(vec![Type::named("A"), Type::named("B")]),
                Type::Null,
            ])
        );
        assert_eq!(
            parse("null|(A&B)"),
            Type::Union(vec![
                Type::Null,
                Type::Intersection(vec![Type::named("A"), Type::named("B")]),
            ])
        );
        assert_eq!(
            parse("((int))|string"),
            Type::Union(vec![Type::Long, Type::String])
        );
    }

    #[test]
    fn test_array_of_group() {
        let ty = parse("(int|string)[]");
        assert_eq!(
            ty.element_type(),
            Some(&Type::Union(vec![Type::Long, Type::String]))
        );
        let ty = parse("null|(A&B)[]");
        assert_eq!(ty.members().len(), 2);
        assert_eq!(
            ty.members()[1].element_type(),
            Some(&Type::Intersection(vec![Type::named("A"), Type::named("B")]))
        );
    }

    #[test]
    fn test_array_inside_union() {
        let ty = parse("string[]|false");
        assert_eq!(ty.members().len(), 2);
        assert_eq!(ty.members()[0].element_type(), Some(&Type::String));
        assert_eq!(ty.members()[1], Type::Boolean);
    }

    #[test]
    fn test_malformed_declarations() {
        assert_eq!(Type::from_decl(""), Err(DeclarationError::Empty));
        assert!(matches!(
            Type::from_decl("9lives"),
            Err(DeclarationError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            Type::from_decl("Foo Bar"),
            Err(DeclarationError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            Type::from_decl("(int|string"),
            Err(DeclarationError::UnmatchedParentheses(_))
        ));
        assert!(matches!(
            Type::from_decl("int)|(string"),
            Err(DeclarationError::UnmatchedParentheses(_))
        ));
        assert!(matches!(
            Type::from_decl("|int"),
            Err(DeclarationError::DanglingCombinator(_))
        ));
        assert!(matches!(
            Type::from_decl("(int)string"),
            Err(DeclarationError::DanglingCombinator(_))
        ));
        assert_eq!(Type::from_decl("int|"), Err(DeclarationError::Empty));
        assert!(matches!(
            Type::from_decl("Foo(Bar)"),
            Err(DeclarationError::MissingCombinator(_))
        ));
    }

    #[test]
    fn test_bare_root_and_stray_close_paren() {
        assert_eq!(Type::from_decl("\\"), Err(DeclarationError::Empty));
        assert!(matches!(
            Type::from_decl("A|B)"),
            Err(DeclarationError::UnmatchedParentheses(_))
        ));
        assert!(matches!(
            Type::from_decl("Foo)"),
            Err(DeclarationError::UnmatchedParentheses(_))
        ));
    }
}
