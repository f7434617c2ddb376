//! Route handlers

pub mod chat;
pub mod lookup;
pub mod speech;
