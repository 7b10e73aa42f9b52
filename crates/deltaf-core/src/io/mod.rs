pub mod cache;
pub mod export;
pub mod source;
pub mod stack;
pub mod table;
