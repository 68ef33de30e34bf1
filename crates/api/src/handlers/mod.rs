pub mod ai_undo;
pub mod health;
