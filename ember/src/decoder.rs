use std::sync::Arc;

use crate::{engine::Token, vocab::Vocab};

/// Converts a lazily growing sequence of produced token ids into decodable
/// text. Piece bytes accumulate until they form valid UTF-8; a trailing
/// incomplete multi-byte sequence is held back until more tokens arrive.
pub struct StreamingTokenDecoder {
    vocab: Arc<dyn Vocab>,
    bytes: Vec<u8>,
}

impl StreamingTokenDecoder {
    pub fn new(vocab: Arc<dyn Vocab>) -> Self {
        Self {
            vocab,
            bytes: Vec::new(),
        }
    }

    pub fn push(
        &mut self,
        token: Token,
    ) {
        let piece = self.vocab.token_bytes(token);
        self.bytes.extend_from_slice(&piece);
    }

    pub fn push_all(
        &mut self,
        tokens: &[Token],
    ) {
        for &token in tokens {
            self.push(token);
        }
    }

    /// Returns the text that became decodable since the previous call; never
    /// re-emits already-returned text. A byte that can never begin a valid
    /// sequence is skipped rather than blocking the stream.
    pub fn read(&mut self) -> String {
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.bytes) {
                Ok(text) => {
                    out.push_str(text);
                    self.bytes.clear();
                    break;
                },
                Err(error) => {
                    let valid_up_to = error.valid_up_to();
                    out.push_str(
                        std::str::from_utf8(&self.bytes[..valid_up_to])
                            .expect("prefix below valid_up_to is valid UTF-8"),
                    );
                    match error.error_len() {
                        Some(invalid_len) => {
                            self.bytes.drain(..valid_up_to + invalid_len);
                        },
                        None => {
                            // Incomplete tail; wait for more tokens.
                            self.bytes.drain(..valid_up_to);
                            break;
                        },
                    }
                },
            }
        }
        out
    }

    pub fn pending_bytes(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::StreamingTokenDecoder;
    use crate::{engine::Token, vocab::Vocab};

    struct ByteVocab;

    impl Vocab for ByteVocab {
        fn encode(
            &self,
            text: &str,
        ) -> Vec<Token> {
            text.bytes().map(|byte| byte as Token).collect()
        }

        fn token_bytes(
            &self,
            token: Token,
        ) -> Vec<u8> {
            vec![token as u8]
        }
    }

    fn decoder() -> StreamingTokenDecoder {
        StreamingTokenDecoder::new(Arc::new(ByteVocab))
    }

    #[test]
    fn test_read_ascii() {
        let mut decoder = decoder();
        decoder.push_all(&ByteVocab.encode("hello"));
        assert_eq!(decoder.read(), "hello");
        assert_eq!(decoder.read(), "");
    }

    #[test]
    fn test_incomplete_multibyte_held_back() {
        // "é" is 0xC3 0xA9.
        let mut decoder = decoder();
        decoder.push(0xC3);
        assert_eq!(decoder.read(), "");
        assert_eq!(decoder.pending_bytes(), 1);
        decoder.push(0xA9);
        assert_eq!(decoder.read(), "é");
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_four_byte_sequence_across_reads() {
        // U+1F980 is 0xF0 0x9F 0xA6 0x80.
        let mut decoder = decoder();
        decoder.push_all(&[0xF0, 0x9F]);
        assert_eq!(decoder.read(), "");
        decoder.push_all(&[0xA6, 0x80]);
        assert_eq!(decoder.read(), "🦀");
    }

    #[test]
    fn test_valid_prefix_emitted_before_incomplete_tail() {
        let mut decoder = decoder();
        decoder.push_all(&[b'a' as Token, b'b' as Token, 0xC3]);
        assert_eq!(decoder.read(), "ab");
        assert_eq!(decoder.pending_bytes(), 1);
    }

    #[test]
    fn test_invalid_byte_skipped() {
        // 0xFF can never start a UTF-8 sequence.
        let mut decoder = decoder();
        decoder.push_all(&[0xFF, b'a' as Token]);
        assert_eq!(decoder.read(), "a");
    }
}
