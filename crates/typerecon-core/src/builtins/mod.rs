//! Built-in function, constant and class signatures
//!
//! Return types are kept as declaration text and parsed on use, so a table
//! can be written by hand. Function, class and method names are stored
//! lowercased; constant names are case-sensitive.

use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const STANDARD: &str = include_str!("standard.json");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Declared return type; empty or absent when it depends on the arguments
    #[serde(rename = "return", default)]
    pub returns: Option<String>,
}

impl FunctionSignature {
    pub fn returning(decl: impl Into<String>) -> Self {
        Self {
            returns: Some(decl.into()),
        }
    }

    fn return_decl(&self) -> Option<&str> {
        self.returns.as_deref().filter(|decl| !decl.is_empty())
    }
}

/// A built-in class with the names it inherits from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuiltinClass {
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub methods: IndexMap<String, FunctionSignature>,
}

impl BuiltinClass {
    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.extends.push(parent.into().to_ascii_lowercase());
        self
    }

    pub fn method(mut self, name: impl Into<String>, returns: impl Into<String>) -> Self {
        self.methods.insert(
            name.into().to_ascii_lowercase(),
            FunctionSignature::returning(returns),
        );
        self
    }
}

/// Signature table for the host language's standard library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuiltinSignatures {
    #[serde(default)]
    functions: IndexMap<String, FunctionSignature>,
    #[serde(default)]
    constants: IndexMap<String, String>,
    #[serde(default)]
    classes: IndexMap<String, BuiltinClass>,
}

impl BuiltinSignatures {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The table shipped with the crate.
    pub fn standard() -> Result<Self> {
        Self::from_json(STANDARD)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let table: BuiltinSignatures = serde_json::from_str(json)?;
        Ok(table.normalized())
    }

    fn normalized(self) -> Self {
        let functions = self
            .functions
            .into_iter()
            .map(|(name, sig)| (name.to_ascii_lowercase(), sig))
            .collect();
        let classes = self
            .classes
            .into_iter()
            .map(|(name, class)| {
                let class = BuiltinClass {
                    extends: class
                        .extends
                        .into_iter()
                        .map(|parent| parent.to_ascii_lowercase())
                        .collect(),
                    methods: class
                        .methods
                        .into_iter()
                        .map(|(method, sig)| (method.to_ascii_lowercase(), sig))
                        .collect(),
                };
                (name.to_ascii_lowercase(), class)
            })
            .collect();
        Self {
            functions,
            constants: self.constants,
            classes,
        }
    }

    pub fn register_function(&mut self, name: &str, signature: FunctionSignature) {
        self.functions.insert(name.to_ascii_lowercase(), signature);
    }

    pub fn register_constant(&mut self, name: impl Into<String>, decl: impl Into<String>) {
        self.constants.insert(name.into(), decl.into());
    }

    pub fn register_class(&mut self, name: &str, class: BuiltinClass) {
        self.classes.insert(name.to_ascii_lowercase(), class);
    }

    /// Return declaration of a function, if it has a fixed one.
    pub fn function_return(&self, name: &str) -> Option<&str> {
        self.functions
            .get(&name.to_ascii_lowercase())
            .and_then(FunctionSignature::return_decl)
    }

    /// Declared type of a constant.
    pub fn constant(&self, name: &str) -> Option<&str> {
        self.constants.get(name).map(String::as_str)
    }

    /// Return declarations of `method` on `class` and every class it extends.
    ///
    /// Entries without a fixed return type are skipped.
    pub fn method_returns(&self, class: &str, method: &str) -> Vec<&str> {
        let class = class.to_ascii_lowercase();
        let method = method.to_ascii_lowercase();
        let Some(entry) = self.classes.get(&class) else {
            return Vec::new();
        };
        std::iter::once(&class)
            .chain(entry.extends.iter())
            .filter_map(|name| self.classes.get(name))
            .filter_map(|c| c.methods.get(&method))
            .filter_map(FunctionSignature::return_decl)
            .collect()
    }
}
