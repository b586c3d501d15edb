/// Filesystem discovery of batch directories.
pub mod fs;
