// Path Planning algorithms module

pub mod chomp;

pub use chomp::*;
