pub mod args;
pub mod cli;
pub mod export;
pub mod import;
pub mod ir;
pub mod operations;
pub mod reconcile;
pub mod table;
