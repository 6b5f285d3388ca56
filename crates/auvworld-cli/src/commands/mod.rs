pub mod build;
pub mod extent;
pub mod fly;
pub mod inventory;
pub mod search;
pub mod teleport;
