//! Interval Tree Clocks.
//!
//! [`Id`] and [`Event`] are the two trees, [`Stamp`] pairs them and carries
//! the clock operations. [`wire`] and [`text`] are the serialized forms.

pub mod event;
pub mod id;
pub mod stamp;
pub mod text;
pub mod wire;

pub use event::Event;
pub use id::Id;
pub use stamp::Stamp;
pub use text::{ITC_TEXT_PREFIX, stamp_from_text, stamp_from_text_with, stamp_to_text};
