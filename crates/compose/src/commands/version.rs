//! Version command

use anyhow::Result;

use crate::cli::VersionArgs;
use crate::version::build_info;

pub fn run(args: VersionArgs) -> Result<()> {
    let info = build_info();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else if args.short {
        println!("{}", info.version);
    } else {
        println!("{}", info.display());
    }

    Ok(())
}
