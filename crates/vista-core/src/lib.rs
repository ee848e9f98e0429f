// Forbid unsafe in production; deny (with targeted allows) in tests.
#![cfg_attr(not(test), forbid(unsafe_code))]
#![cfg_attr(test, deny(unsafe_code))]

//! Core: geometry, input events, gestures, and animation primitives.
//!
//! # Role in Vista
//! `vista-core` is the vocabulary layer. It owns the normalized input events
//! the host feeds in, the rectangle math visibility is computed from, the
//! easing curves and animation-item handles the controllers drive, and the
//! monotonic clock abstraction every timing decision is made against.
//!
//! # Primary responsibilities
//! - **InputEvent**: canonical user input (pointer, wheel, touch, key, drag intent).
//! - **GestureRecognizer**: drag-intent synthesis and scroll-direction tracking.
//! - **Rect**: viewport geometry and visible-area ratios.
//! - **AnimationItem**: seek / play-range / completion / dispose handles.
//! - **Clock**: monotonic time source passed into every controller.
//!
//! # How it fits in the system
//! `vista-layout` builds panes and visibility sensors on top of [`geometry`];
//! `vista-runtime` consumes [`event`], [`gesture`] and [`animation`] to drive
//! its mount and focus state machines.

pub mod animation;
pub mod clock;
pub mod event;
pub mod geometry;
pub mod gesture;
