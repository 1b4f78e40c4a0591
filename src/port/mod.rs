//! Ports: trait seams between the settlement core and the outside world.

pub mod outbound;
