pub mod chat_surface;
pub mod chromium_surface;
#[cfg(test)]
pub(crate) mod fake_surface;

pub use chat_surface::{ChatSurface, ControlLocator, Hyperlink};
pub use chromium_surface::ChromiumSurface;
