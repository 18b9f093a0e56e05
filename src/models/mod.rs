pub mod recipe;
pub mod shopping;
