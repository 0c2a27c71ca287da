// Domain layer: lifecycle model, filesystem layout and the ports external tools sit behind.

pub mod layout;
pub mod model;
pub mod ports;
