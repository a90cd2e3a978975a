pub mod extract;
pub mod update;
