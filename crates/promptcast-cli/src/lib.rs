//! Library surface of the promptcast CLI, split out so argument parsing is
//! testable without spawning the binary.

pub mod cli_args;
