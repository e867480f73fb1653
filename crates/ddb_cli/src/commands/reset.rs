//! Reset command implementation.

use std::io::{self, BufRead, Write};
use std::path::Path;

/// Runs the reset command. Without `yes` the user must confirm on stdin.
pub fn run(path: &Path, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path)?;

    if !yes && !confirm(path)? {
        println!("Reset cancelled");
        return Ok(());
    }

    store.reset()?;
    println!("✓ Store at {:?} reset", path);
    Ok(())
}

fn confirm(path: &Path) -> io::Result<bool> {
    print!("This deletes every document in {:?}. Type 'yes' to continue: ", path);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim() == "yes")
}
