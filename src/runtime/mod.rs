// Runtime - Host loop driving the sequencer engine

pub mod runner;

pub use runner::{EngineRunner, MAX_IDLE};
