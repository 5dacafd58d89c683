pub mod docx;
pub mod session_locks;
pub mod session_store;

pub use docx::{DocxPackage, Paragraph, StyleSet};
pub use session_locks::SessionLocks;
pub use session_store::SessionStore;
