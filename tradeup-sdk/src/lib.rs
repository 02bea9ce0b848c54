//! Wire objects shared by the tradeup server, its clients and the bus.

pub mod objects;
