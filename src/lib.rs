//! Grid Traffic Simulation Library
//!
//! Simulates vehicles on a discretised road grid under lane, turn, signal and
//! closure rules, to study network-level routing effects such as Braess's
//! paradox.

pub mod export;
pub mod simulation;
