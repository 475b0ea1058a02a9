//! `cinder variants` command

use anyhow::Result;

use crate::cli::VariantsArgs;
use cinder::ops::{format_table, variants};

pub fn execute(args: VariantsArgs) -> Result<()> {
    let rows = variants()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", format_table(&rows));
    }
    Ok(())
}
