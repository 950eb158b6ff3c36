pub mod live;
pub mod printer;
