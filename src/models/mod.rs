mod components;
mod devices;
mod eol;
mod inventory;

pub use components::*;
pub use devices::*;
pub use eol::*;
pub use inventory::*;
