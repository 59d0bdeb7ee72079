//! Terminal drivers that own a [`RoomHost`](super::RoomHost) and pump frames.

pub mod cli;
