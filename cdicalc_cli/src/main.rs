//! # CDICALC Command Line
//!
//! Terminal front-end for the cdicalc_core engine: list formulas and units,
//! solve one relation, or derive everything reachable from a set of values.
//!
//! ```text
//! cdicalc solve --target fringe_spacing \
//!     --set wavelength=1angstrom --set detector_distance=1m --set crystal_size=100nm
//! ```

mod cli;

fn main() {
    std::process::exit(cli::run_from_env());
}
