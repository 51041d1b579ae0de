//! A rope balanced list of fixed capacity blocks.
//!
//! Items live in leaf blocks reached through a [`store::ContentStore`], so a
//! list can keep most of its blocks paged out to a temporary file while a
//! small cache of them stays resident. Per-leaf statistics can be carried up
//! the tree with a [`builder::CustomBuilder`]; [`range`] and [`height`] are
//! the two that ship with the crate.

extern crate bincode;
extern crate libcompression;

pub mod biglist;
pub mod block;
pub mod builder;
pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod height;
pub mod node;
pub mod prelude;
pub mod range;
pub mod store;
mod tree;

pub use crate::biglist::*;
pub use crate::error::*;
