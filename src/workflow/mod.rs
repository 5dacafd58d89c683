pub mod level_ctx;
pub mod level_flow;

pub use level_ctx::LevelCtx;
pub use level_flow::{LevelFlow, LevelState};
