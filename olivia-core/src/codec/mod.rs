//! Block-level encode/decode: redundancy coding, scrambling, and bit
//! interleaving for a single 64-symbol block.

pub mod block_decoder;
pub mod block_encoder;
