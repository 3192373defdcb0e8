//! Transport layer: the command-line surface

pub mod cli;
