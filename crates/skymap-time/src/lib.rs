//! SkyMap Time - "what time is it" for the sky view
//!
//! This crate implements the clocks:
//! - Real (wall) time and a manually driven clock
//! - Time travel: user-controlled playback through simulated time
//! - The composite clock that eases between real time and time travel

pub mod clock;
pub mod travel;
pub mod composite;

pub use clock::*;
pub use travel::*;
pub use composite::*;
