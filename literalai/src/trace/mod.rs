//! Thread and step handles and their scoped lifecycle.
//!
//! `wrap` runs a callback with the handle's entity as the current context, so
//! every step created inside inherits its thread, parent and root run. Frames
//! are restored when the callback settles.

mod decorate;
mod step;
mod thread;
mod update;


pub use decorate::{DecorateOptions, Decorator};
pub use step::Step;
pub use thread::Thread;
pub use update::UpdateAfter;
