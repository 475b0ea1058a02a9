//! Include directive extraction.
//!
//! Parsers only find the literal targets of include directives. They do not
//! evaluate conditionals or macros, so a header behind `#if 0` is still
//! reported.

use std::sync::LazyLock;

use regex::Regex;

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*[\s\S]*?\*/").expect("block comment pattern"));

static C_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*#[ \t]*(?:include|import|include_next)[ \t]*(?:"([^"\r\n]+)"|<([^>\r\n]+)>)"#)
        .expect("C include pattern")
});

static ASM_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?mi)^[ \t]*\.include[ \t]+"([^"\r\n]+)""#).expect("asm include pattern")
});

/// A grammar that extracts include targets from source text.
pub trait IncludeParser: Send + Sync {
    fn parse(&self, text: &str) -> Vec<String>;
}

/// C, C++ and Objective-C: `#include "x"`, `#include <x>`, `#import`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CParser;

impl IncludeParser for CParser {
    fn parse(&self, text: &str) -> Vec<String> {
        let stripped = BLOCK_COMMENT.replace_all(text, " ");
        C_INCLUDE
            .captures_iter(&stripped)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().trim().to_string())
            .collect()
    }
}

/// GNU assembler: `.include "x"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsmParser;

impl IncludeParser for AsmParser {
    fn parse(&self, text: &str) -> Vec<String> {
        ASM_INCLUDE
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Grammar that finds nothing, for tools whose inputs have no includes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullParser;

impl IncludeParser for NullParser {
    fn parse(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }
}
