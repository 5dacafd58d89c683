pub mod level;
pub mod loaders;
pub mod prompts;
pub mod result;

pub use level::ProficiencyLevel;
pub use loaders::{load_prompt_overrides, load_prompt_set};
pub use prompts::{PromptOverride, PromptOverrides, PromptSet};
pub use result::GenerationResult;
