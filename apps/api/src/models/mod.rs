pub mod conversation;
pub mod evaluation;
pub mod interview;
pub mod screenshot;
pub mod session;
