#![forbid(unsafe_code)]

pub mod audit;
pub mod gate;
pub mod settings;
