pub mod bed;
pub mod maf;
pub mod output;
