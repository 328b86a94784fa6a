pub mod amount;
pub mod dedup;
pub mod extract;
pub mod remap;
pub mod transform;
