//! Low-level signal-processing primitives: Walsh-Hadamard transform,
//! scrambling, Gray coding, and tone synthesis.

pub mod gray;
pub mod scrambler;
pub mod tone;
pub mod wht;
