pub mod migrate;
pub mod resolve;
pub mod stage;
