// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shell panels.

mod chat;
mod sidebar;
mod top_bar;
mod viewport;

pub use chat::ChatPanel;
pub use sidebar::sidebar_ui;
pub use top_bar::TopBar;
pub use viewport::ViewportPanel;
