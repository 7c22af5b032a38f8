pub mod config;
pub mod constants;
pub mod error;
pub mod gene;
pub mod io;
pub mod mutation;
pub mod permutation;
pub mod pool;
pub mod report;
pub mod sample;
pub mod seq;
pub mod stats;
