use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

pub const CHUNK_SIZE: usize = 8 * 1024; // 8KB

/// Partial content fingerprint: BLAKE3 over the first 8KB, the last 8KB
/// (only when the file is larger than 16KB) and the decimal file size.
///
/// Files that share head, tail and size collide even if their middles differ.
pub fn fingerprint_file(file: &Path) -> io::Result<String> {
    let mut f = File::open(file)?;
    let size = f.metadata()?.len();

    let mut hasher = blake3::Hasher::new();
    hasher.update(&read_head(&mut f)?);

    if size > (CHUNK_SIZE as u64) * 2 {
        f.seek(SeekFrom::End(-(CHUNK_SIZE as i64)))?;
        hasher.update(&read_head(&mut f)?);
    }

    hasher.update(size.to_string().as_bytes());
    Ok(hasher.finalize().to_hex().to_string())
}

fn read_head(f: &mut File) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(CHUNK_SIZE);
    f.by_ref().take(CHUNK_SIZE as u64).read_to_end(&mut buffer)?;
    Ok(buffer)
}
