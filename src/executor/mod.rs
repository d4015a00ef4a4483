//! UI-affinity executor.
//!
//! Capture completion happens on worker threads, but application
//! callbacks must run on the thread that owns the session. Workers post
//! tasks through a [`UiHandle`]; the owning thread drains them from its
//! [`UiLoop`].

mod ui_loop;

pub use ui_loop::{UiHandle, UiLoop, UiTask};
