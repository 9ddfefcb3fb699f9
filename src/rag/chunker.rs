pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 200;

/// Split text into fixed-size character windows, each overlapping the previous
/// one by `overlap` characters. Windows containing only whitespace are dropped.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    assert!(overlap < size, "chunk overlap must be smaller than chunk size");
    let chars: Vec<char> = text.chars().collect();
    let step = size - overlap;

    let mut chunks = Vec::with_capacity(chars.len() / step + 1);
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        if !window.trim().is_empty() {
            chunks.push(window);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}
