// Interview and session lifecycles.
// interview.rs / session.rs are pure transition rules; service.rs persists them
// with compare-and-set writes and emits lifecycle events.

pub mod handlers;
pub mod interview;
pub mod service;
pub mod session;
