//! `pwvault generate`: print a random password or passphrase.

use console::style;

use crate::errors::Result;
use crate::generator::{self, GeneratorOptions};

/// Execute the `generate` command. No vault is opened.
pub fn execute(options: &GeneratorOptions, words: Option<usize>, separator: &str) -> Result<()> {
    let password = match words {
        Some(count) => generator::generate_passphrase(count, separator)?,
        None => generator::generate(options)?,
    };
    let strength = generator::estimate_strength(&password);

    println!("{password}");
    eprintln!(
        "{}",
        style(format!("strength: {} ({}/100)", strength.label, strength.score)).dim()
    );
    Ok(())
}
