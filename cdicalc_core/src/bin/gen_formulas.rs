//! Generate the Markdown formula reference from the registry.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin gen-formulas                 # writes cdicalc_core/FORMULAS.md
//! cargo run --bin gen-formulas -- docs/ref.md  # writes elsewhere
//! cargo run --bin gen-formulas -- -            # prints to stdout
//! ```

use std::fs;
use std::path::PathBuf;

use cdicalc_core::formulas::{generate_formulas_markdown, REGISTRY};

/// Relative to the workspace root
const DEFAULT_OUTPUT: &str = "cdicalc_core/FORMULAS.md";

#[derive(Debug, PartialEq)]
enum Output {
    Stdout,
    File(PathBuf),
}

fn output_from_args(mut args: impl Iterator<Item = String>) -> Output {
    match args.next().as_deref() {
        Some("-") => Output::Stdout,
        Some(path) => Output::File(PathBuf::from(path)),
        None => Output::File(PathBuf::from(DEFAULT_OUTPUT)),
    }
}

fn main() {
    let markdown = generate_formulas_markdown(&REGISTRY);

    let path = match output_from_args(std::env::args().skip(1)) {
        Output::Stdout => {
            print!("{markdown}");
            return;
        }
        Output::File(path) => path,
    };

    if let Err(e) = fs::write(&path, &markdown) {
        eprintln!("Error writing {}: {}", path.display(), e);
        std::process::exit(1);
    }
    println!(
        "Wrote {} formulas ({} bytes) to {}",
        REGISTRY.formulas().len(),
        markdown.len(),
        path.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_output_defaults_to_crate_reference() {
        assert_eq!(output_from_args(args(&[])), Output::File(PathBuf::from(DEFAULT_OUTPUT)));
    }

    #[test]
    fn test_output_from_arguments() {
        assert_eq!(output_from_args(args(&["-"])), Output::Stdout);
        assert_eq!(
            output_from_args(args(&["docs/formulas.md"])),
            Output::File(PathBuf::from("docs/formulas.md"))
        );
    }
}
