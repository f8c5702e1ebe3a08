//! Domain modules (vertical slices): wire types, state, clients.

pub mod chart;
pub mod market;
pub mod session;
