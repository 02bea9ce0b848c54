#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod broadcast;
pub mod bus;
pub mod config;
pub mod entities;
pub mod events;
pub mod hub;
pub mod processors;
pub mod snapshot;
pub mod store;
pub mod utils;
