//! Shared bits for the interactive binaries.

use std::io::{self, BufRead, Write};

use crate::index::QueryMatch;

/// Typing either of these ends an interactive session. Matched
/// case-insensitively, before the input reaches any pipeline stage.
pub const EXIT_SENTINELS: [&str; 2] = ["exit", "salir"];

pub fn is_exit(input: &str) -> bool {
    let trimmed = input.trim();
    EXIT_SENTINELS
        .iter()
        .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
}

/// Print a prompt label and read one line. `None` on end of input.
pub fn prompt(label: &str) -> io::Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

pub fn print_matches(matches: &[QueryMatch]) {
    if matches.is_empty() {
        println!("  (no results)");
        return;
    }
    for hit in matches {
        let category = hit.category();
        if category.is_empty() {
            println!("  id: {}, score: {:.2}, text: {}", hit.id, hit.score, hit.text());
        } else {
            println!(
                "  id: {}, score: {:.2}, category: {}, text: {}",
                hit.id,
                hit.score,
                category,
                hit.text()
            );
        }
    }
}
