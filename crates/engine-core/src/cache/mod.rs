pub mod compiled;
pub mod filter_key;
pub mod final_key;
pub mod types;
