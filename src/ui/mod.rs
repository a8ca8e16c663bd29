//! Terminal output for the CLI
//!
//! Uses `cliclack` for interactive output and prompts, with plain-text
//! fallback in CI and when stdout is not a terminal.
//!
//! ```rust,ignore
//! use stagecache::ui::{self, StageProgress, UiContext};
//!
//! let ctx = UiContext::detect().with_auto_yes(args.yes);
//! let progress = StageProgress::new(&ctx, "/data/projA");
//! session
//!     .stage_directory_with(dir, Category::Input, |done, total| progress.update(done, total))
//!     .await?;
//! progress.finish();
//!
//! if ui::confirm(&ctx, "Remove session?", false).await? {
//!     // ...
//! }
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, remark, section, step_error_detail, step_info, step_ok, step_ok_detail,
    step_warn_hint,
};
pub use progress::{StageProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{init_theme, StageTheme};
