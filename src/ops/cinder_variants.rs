//! Implementation of `cinder variants`: the linker decision table.

use serde::Serialize;

use crate::builder::linker::table::{lookup, VariantKey};
use crate::util::errors::BuildResult;

/// One row of the decision table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantRow {
    pub family: String,
    pub kind: String,
    pub os: String,
    pub driver: String,
    pub wrapper: String,
    pub command: String,
    /// Output name for the base name `NAME`
    pub output: String,
    pub libtool: bool,
    pub xcrun: bool,
}

/// Resolve every selector combination.
pub fn variants() -> BuildResult<Vec<VariantRow>> {
    VariantKey::all()
        .map(|key| {
            let variant = lookup(&key)?;
            Ok(VariantRow {
                family: key.family.to_string(),
                kind: key.kind.to_string(),
                os: key.os.to_string(),
                driver: key.driver.to_string(),
                wrapper: key.wrapper.to_string(),
                command: variant.command.to_string(),
                output: variant.output_file_name("NAME"),
                libtool: variant.libtool,
                xcrun: variant.xcrun,
            })
        })
        .collect()
}

/// Render rows as an aligned text table.
pub fn format_table(rows: &[VariantRow]) -> String {
    let header = ["FAMILY", "KIND", "OS", "DRIVER", "WRAPPER", "COMMAND", "OUTPUT", "FLAGS"];
    let cells: Vec<[String; 8]> = rows
        .iter()
        .map(|r| {
            let mut flags = Vec::new();
            if r.libtool {
                flags.push("libtool");
            }
            if r.xcrun {
                flags.push("xcrun");
            }
            [
                r.family.clone(),
                r.kind.clone(),
                r.os.clone(),
                r.driver.clone(),
                r.wrapper.clone(),
                r.command.clone(),
                r.output.clone(),
                flags.join(","),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let mut push_line = |line: Vec<&str>| {
        let padded: Vec<String> = line
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        out.push_str(padded.join("  ").trim_end());
        out.push('\n');
    };
    push_line(header.to_vec());
    for row in &cells {
        push_line(row.iter().map(String::as_str).collect());
    }
    out
}
