#![deny(rust_2018_idioms)]

pub mod chart;
pub mod helper;
pub mod pipeline;
