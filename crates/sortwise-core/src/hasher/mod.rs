pub mod fingerprint;

pub use fingerprint::{fingerprint_file, CHUNK_SIZE};
