//! Concrete generation providers.

pub mod anthropic;
pub mod ollama;

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;

/// Take every complete line out of `buffer`, leaving a trailing partial line.
///
/// Network chunks do not respect line boundaries, so streamed NDJSON and SSE
/// bodies are buffered as bytes and only decoded once a full line is present.
pub(crate) fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();

    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\n', '\r']);
        if !text.trim().is_empty() {
            lines.push(text.to_string());
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_lines_keeps_partial_tail() {
        let mut buffer = b"{\"a\":1}\n{\"b\":".to_vec();
        let lines = drain_lines(&mut buffer);
        assert_eq!(lines, vec!["{\"a\":1}".to_string()]);
        assert_eq!(buffer, b"{\"b\":".to_vec());

        buffer.extend_from_slice(b"2}\r\n\n");
        let lines = drain_lines(&mut buffer);
        assert_eq!(lines, vec!["{\"b\":2}".to_string()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_lines_split_multibyte() {
        // "é" is 0xC3 0xA9; split it across two network chunks
        let mut buffer = vec![b'c', b'a', b'f', 0xC3];
        assert!(drain_lines(&mut buffer).is_empty());
        buffer.extend_from_slice(&[0xA9, b'\n']);
        assert_eq!(drain_lines(&mut buffer), vec!["café".to_string()]);
    }
}
