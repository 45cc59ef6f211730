//! Terminal output helpers
//!
//! Styled status lines when attached to a terminal, bracketed plain tags
//! otherwise so output stays grep-friendly in CI and pipes.

mod context;
mod output;

pub use context::UiContext;
pub use output::{intro, key_value, step_info, step_ok_detail, step_warn_hint};
