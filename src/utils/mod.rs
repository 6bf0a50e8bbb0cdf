//! Helpers shared by the source parsers, the catalog codec and the CLI.

pub mod normalize;
