mod coords;
mod venue;

pub use coords::*;
pub use venue::*;
