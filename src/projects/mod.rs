/// # Entry points that drive the analyzer from outside the library

// The basic CLI for running the analysis over a schema file
pub mod cli;
