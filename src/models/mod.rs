pub mod stack;
pub mod views;
