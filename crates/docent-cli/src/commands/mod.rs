pub mod capabilities;
pub mod conversation;
pub mod knowledge;
