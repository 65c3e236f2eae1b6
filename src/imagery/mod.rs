mod aligner;
mod placeholder;
mod provider;

pub use aligner::*;
pub use placeholder::*;
pub use provider::*;
