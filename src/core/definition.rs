//! Layered compiler and linker definitions.
//!
//! A definition may `extends` another by name. Resolving a definition yields
//! its chain, most specific first. Scalar settings are taken from the first
//! definition in the chain that sets them; arguments and parameters are
//! gathered from the most-base definition to the most specific so the
//! specific ones land last.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::library_set::LibrarySet;
use crate::util::errors::{BuildError, BuildResult};

/// Where a definition argument is placed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArgLocation {
    Pre,
    #[default]
    Mid,
    End,
}

/// A literal command-line argument contributed by a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefArg {
    pub value: String,
    #[serde(default)]
    pub location: ArgLocation,
}

impl DefArg {
    pub fn new(value: impl Into<String>, location: ArgLocation) -> Self {
        DefArg {
            value: value.into(),
            location,
        }
    }
}

/// A named processor parameter, e.g. `target` for cross toolchains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

/// Arguments sorted into their command-line buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgBuckets {
    pub pre: Vec<String>,
    pub mid: Vec<String>,
    pub end: Vec<String>,
}

impl ArgBuckets {
    pub fn push(&mut self, location: ArgLocation, value: impl Into<String>) {
        let value = value.into();
        match location {
            ArgLocation::Pre => self.pre.push(value),
            ArgLocation::Mid => self.mid.push(value),
            ArgLocation::End => self.end.push(value),
        }
    }

    /// All arguments in pre, mid, end order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.pre.iter().chain(&self.mid).chain(&self.end)
    }
}

/// Common surface of layered definitions.
pub trait Definition {
    /// Human-readable kind used in error messages.
    const KIND: &'static str;

    fn name(&self) -> &str;
    fn extends(&self) -> Option<&str>;
    fn is_abstract(&self) -> bool;
    fn args(&self) -> &[DefArg];
    fn params(&self) -> &[Param];
}

/// A compiler definition from the project description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerDef {
    pub name: String,
    pub extends: Option<String>,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    /// Compiler kind, e.g. `gcc` or `clang++`
    pub kind: Option<String>,
    pub debug: Option<bool>,
    pub rebuild: Option<bool>,
    pub args: Vec<DefArg>,
    pub params: Vec<Param>,
    pub includepath: Vec<PathBuf>,
    pub sysincludepath: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub undefines: Vec<String>,
}

/// A linker definition from the project description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerDef {
    pub name: String,
    pub extends: Option<String>,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    /// Linker family, e.g. `gcc`, `ld` or `os390`
    pub kind: Option<String>,
    pub debug: Option<bool>,
    pub rebuild: Option<bool>,
    pub incremental: Option<bool>,
    pub fixed: Option<bool>,
    pub map: Option<bool>,
    /// Image base address
    pub base: Option<i64>,
    /// Stack size in bytes
    pub stack: Option<i32>,
    /// Entry point symbol
    pub entry: Option<String>,
    pub args: Vec<DefArg>,
    pub params: Vec<Param>,
    pub libsets: Vec<LibrarySet>,
}

macro_rules! impl_definition {
    ($ty:ty, $kind:literal) => {
        impl Definition for $ty {
            const KIND: &'static str = $kind;

            fn name(&self) -> &str {
                &self.name
            }

            fn extends(&self) -> Option<&str> {
                self.extends.as_deref()
            }

            fn is_abstract(&self) -> bool {
                self.is_abstract
            }

            fn args(&self) -> &[DefArg] {
                &self.args
            }

            fn params(&self) -> &[Param] {
                &self.params
            }
        }
    };
}

impl_definition!(CompilerDef, "compiler");
impl_definition!(LinkerDef, "linker");

/// A definition together with the definitions it extends.
#[derive(Debug, Clone)]
pub struct Layered<'a, D> {
    /// Most specific first.
    chain: Vec<&'a D>,
}

impl<'a, D: Definition> Layered<'a, D> {
    /// Resolve `specific` against the definitions it may extend.
    pub fn resolve(specific: &'a D, all: &'a [D]) -> BuildResult<Self> {
        let mut chain = vec![specific];
        let mut seen = HashSet::new();
        seen.insert(specific.name());

        let mut current = specific;
        while let Some(parent) = current.extends() {
            if seen.contains(parent) {
                let mut names: Vec<String> = chain.iter().map(|d| d.name().to_string()).collect();
                names.push(parent.to_string());
                return Err(BuildError::DefinitionCycle { chain: names });
            }
            let next = all.iter().find(|d| d.name() == parent).ok_or_else(|| {
                BuildError::UnknownDefinition {
                    kind: D::KIND,
                    name: parent.to_string(),
                }
            })?;
            seen.insert(next.name());
            chain.push(next);
            current = next;
        }

        Ok(Layered { chain })
    }

    /// The most specific definition.
    pub fn specific(&self) -> &'a D {
        self.chain[0]
    }

    /// Definitions from most specific to most base.
    pub fn chain(&self) -> &[&'a D] {
        &self.chain
    }

    /// First value set along the chain, most specific first.
    pub fn first<T>(&self, f: impl Fn(&'a D) -> Option<T>) -> Option<T> {
        self.chain.iter().find_map(|d| f(*d))
    }

    /// Arguments bucketed by location, most-base definition first.
    pub fn arg_buckets(&self) -> ArgBuckets {
        let mut buckets = ArgBuckets::default();
        for def in self.chain.iter().rev() {
            for arg in def.args() {
                buckets.push(arg.location, arg.value.clone());
            }
        }
        buckets
    }

    /// Parameters, most-base definition first.
    pub fn params(&self) -> Vec<Param> {
        self.chain
            .iter()
            .rev()
            .flat_map(|d| d.params().iter().cloned())
            .collect()
    }

    /// Collect list items along the chain, most-base first, without duplicates.
    pub fn collect_base_first<T: Clone + PartialEq + 'a>(
        &self,
        f: impl Fn(&'a D) -> &'a [T],
    ) -> Vec<T> {
        let mut out: Vec<T> = Vec::new();
        for def in self.chain.iter().rev() {
            for item in f(*def) {
                if !out.contains(item) {
                    out.push(item.clone());
                }
            }
        }
        out
    }
}

/// Look up a parameter by name. The last one wins, so specific overrides base.
pub fn find_param<'a>(params: &'a [Param], name: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|p| p.name == name)
        .map(|p| p.value.as_str())
}

/// Concrete (non-abstract) definitions.
pub fn concrete<D: Definition>(all: &[D]) -> impl Iterator<Item = &D> {
    all.iter().filter(|d| !d.is_abstract())
}
