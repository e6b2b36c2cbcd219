// Preview sessions: the per-document-view surface over the pagination engine.

pub mod handlers;
pub mod session;
