//! Client-side request throttling for third-party APIs.

mod sliding_window;

pub use sliding_window::SlidingWindowThrottle;
