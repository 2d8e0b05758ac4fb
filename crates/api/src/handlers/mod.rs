pub mod artifacts;
pub mod generation;
pub mod tasks;
pub mod workflows;
