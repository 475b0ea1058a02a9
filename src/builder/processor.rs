//! File classification by bidding.
//!
//! Every compiler and linker answers how interested it is in a file name:
//! - `BID_NONE` (0): not recognized
//! - `BID_DISCARD` (1): recognized but not processed (headers, or for a
//!   linker, an unknown file it will still pass through)
//! - `BID_PROCESS` (100): this processor handles the file
//!
//! Bids depend only on the file name text.

/// Bid for a file the processor does not recognize.
pub const BID_NONE: u32 = 0;

/// Bid for a recognized file the processor will not process.
pub const BID_DISCARD: u32 = 1;

/// Bid for a file the processor will process.
pub const BID_PROCESS: u32 = 100;

/// Anything that can bid on a file name.
pub trait Processor {
    fn bid(&self, filename: &str) -> u32;
}

/// A processor that turns each source into its own outputs.
pub trait Compiler: Processor {
    /// Output names for `input`, empty when it produces nothing.
    fn output_file_names(&self, input: &str) -> Vec<String>;

    /// Whether its outputs are rebuilt regardless of timestamps.
    fn rebuild(&self) -> bool {
        false
    }
}

/// Source and header extension sets of a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extensions {
    pub sources: &'static [&'static str],
    pub headers: &'static [&'static str],
}

impl Extensions {
    pub const fn new(sources: &'static [&'static str], headers: &'static [&'static str]) -> Self {
        Extensions { sources, headers }
    }

    /// Case-insensitive suffix match against the source, then header, extensions.
    pub fn bid(&self, filename: &str) -> u32 {
        let lower = filename.to_lowercase();
        if self
            .sources
            .iter()
            .any(|ext| lower.ends_with(&ext.to_lowercase()))
        {
            return BID_PROCESS;
        }
        if self
            .headers
            .iter()
            .any(|ext| lower.ends_with(&ext.to_lowercase()))
        {
            return BID_DISCARD;
        }
        BID_NONE
    }

    /// Linker bidding: unknown files become pass-through, ignored files are dropped.
    pub fn linker_bid(&self, filename: &str) -> u32 {
        invert_for_linker(self.bid(filename))
    }
}

/// Swap `BID_NONE` and `BID_DISCARD`, leaving other bids alone.
pub fn invert_for_linker(bid: u32) -> u32 {
    match bid {
        BID_NONE => BID_DISCARD,
        BID_DISCARD => BID_NONE,
        other => other,
    }
}

/// File name without directory (either separator) and without its last extension.
pub fn base_output_name(input: &str) -> &str {
    let start = input.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    let name = &input[start..];
    match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C: Extensions = Extensions::new(&[".c"], &[".h"]);
    const OBJ: Extensions = Extensions::new(&[".o", ".a"], &[".h"]);

    #[test]
    fn test_bid_values() {
        assert_eq!(C.bid("main.c"), BID_PROCESS);
        assert_eq!(C.bid("main.h"), BID_DISCARD);
        assert_eq!(C.bid("Makefile"), BID_NONE);
    }

    #[test]
    fn test_bid_ignores_case_and_prefix() {
        for name in ["A.C", "dir/with.dots/x.c", "C:\\src\\Main.C", ".c"] {
            assert_eq!(C.bid(name), BID_PROCESS, "{}", name);
        }
    }

    #[test]
    fn test_bid_is_one_of_three() {
        for name in ["", "x", "x.c", "x.h", "x.cpp", "x.o", "weird.c.bak"] {
            assert!([BID_NONE, BID_DISCARD, BID_PROCESS].contains(&C.bid(name)));
        }
    }

    #[test]
    fn test_linker_inverts() {
        assert_eq!(OBJ.linker_bid("a.o"), BID_PROCESS);
        assert_eq!(OBJ.linker_bid("a.h"), BID_NONE);
        assert_eq!(OBJ.linker_bid("a.weird"), BID_DISCARD);
    }

    #[test]
    fn test_base_output_name() {
        assert_eq!(base_output_name("src/foo.c"), "foo");
        assert_eq!(base_output_name("src\\dir\\bar.cpp"), "bar");
        assert_eq!(base_output_name("a.b.c"), "a.b");
        assert_eq!(base_output_name("noext"), "noext");
        assert_eq!(base_output_name("dir.d/noext"), "noext");
    }
}
