pub mod channels;
pub mod history;
