pub mod push;
pub mod telegram;
