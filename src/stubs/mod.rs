pub mod launcher;
pub mod sink;
