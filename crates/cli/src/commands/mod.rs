pub mod flags;
pub mod sonar;
