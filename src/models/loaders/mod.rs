pub mod toml_loader;

pub use toml_loader::{load_prompt_overrides, load_prompt_set};
