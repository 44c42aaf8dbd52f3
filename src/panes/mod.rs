pub mod codec;
pub mod controller;
pub mod layout;
pub mod stack;

pub use controller::{PaneController, PaneStatus};
pub use layout::{PaneSlot, StripLayout};
pub use stack::PaneStack;
