pub mod chunk;
pub mod extract;
pub mod inventory;
pub mod process;
pub mod status;
