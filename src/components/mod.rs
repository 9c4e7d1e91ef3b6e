pub mod history;
pub mod replay;
