//! Cartsync Core - shared domain types and the cart state machine.
//!
//! This crate provides the types used across all cartsync components:
//! - `engine` - the synchronization engine (snapshot store, remote client,
//!   sync orchestrator)
//! - UI embedders - anything that renders a cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no HTTP clients, no async. Everything that can fail for environmental
//! reasons lives in the engine crate; transitions here are total over their
//! declared inputs and auto-correct malformed data instead of erroring.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, cart items, sync statuses, snapshot records
//! - [`cart`] - The [`CartState`] transition vocabulary and derived totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::CartState;
pub use types::*;
