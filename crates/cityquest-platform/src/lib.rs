//! CityQuest — client platform resolution.
//!
//! Turns the `User-Agent` and `X-App-Platform` request headers into a
//! [`Platform`](cityquest_core::platform::Platform) descriptor. Pure: no
//! state, no I/O.

mod resolver;

pub use resolver::{APP_PLATFORM_HEADER, resolve};
