pub mod poll;
pub mod result;
pub mod vote;
