//! Doc-comment tag extraction (`@var`, `@return`, `@param`)

use super::Type;
use crate::error::DeclarationError;
use regex::Regex;
use std::sync::OnceLock;

/// The doc-comment tag to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocTag<'a> {
    Var,
    Return,
    /// `@param <type> $name`, matched on the parameter name
    Param(&'a str),
}

fn var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@var\s+(\S+)").expect("valid regex"))
}

fn return_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@return\s+(\S+)").expect("valid regex"))
}

fn param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)@param\s+(\S+)\s+\$(\w+)").expect("valid regex"))
}

/// Raw declaration text of the first matching tag.
pub fn extract<'c>(tag: DocTag<'_>, comment: Option<&'c str>) -> Option<&'c str> {
    let comment = comment?;
    let found = match tag {
        DocTag::Var => var_re().captures(comment)?.get(1),
        DocTag::Return => return_re().captures(comment)?.get(1),
        DocTag::Param(name) => param_re()
            .captures_iter(comment)
            .find(|caps| caps[2].eq_ignore_ascii_case(name))?
            .get(1),
    };
    found.map(|m| m.as_str())
}

impl Type {
    /// Type named by a doc-comment tag, or mixed when the tag is absent.
    pub fn from_comment(tag: DocTag<'_>, comment: Option<&str>) -> Result<Type, DeclarationError> {
        match extract(tag, comment) {
            Some(decl) => Type::from_decl(decl),
            None => Ok(Type::mixed()),
        }
    }
}
