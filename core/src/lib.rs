pub mod interface;
pub mod resolver;
pub mod scanner;
