pub mod artifact;
pub mod demo;
pub mod maintenance;
