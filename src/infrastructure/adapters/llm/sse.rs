//! SSE 解码
//!
//! 按字节缓冲，遇到空行切出一个事件，只保留 `data:` 行。
//! 多字节字符可能被拆到两个网络分块里，所以在切完整事件之后才做 UTF-8 解码。

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加网络分块，返回所有已完整事件的 data 负载
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some((end, separator_len)) = find_event_end(&self.buffer) {
            let event: Vec<u8> = self.buffer.drain(..end + separator_len).take(end).collect();
            payloads.extend(data_lines(&String::from_utf8_lossy(&event)));
        }
        payloads
    }

    /// 流结束时处理残留的未终止事件
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buffer);
        data_lines(&String::from_utf8_lossy(&rest))
    }
}

fn find_event_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn data_lines(event: &str) -> Vec<String> {
    event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data).trim_end().to_string())
        .filter(|data| !data.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_events_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        assert_eq!(decoder.push(b"1}\n\ndata: [DONE]\n\n"), vec!["{\"a\":1}", "[DONE]"]);
    }

    #[test]
    fn test_multibyte_char_split_between_chunks() {
        let bytes = "data: 天地\n\n".as_bytes();
        let mut decoder = SseDecoder::new();
        // "天" 占三个字节，从中间切开
        assert!(decoder.push(&bytes[..7]).is_empty());
        assert_eq!(decoder.push(&bytes[7..]), vec!["天地"]);
    }

    #[test]
    fn test_ignores_event_lines_and_handles_crlf() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"event: content_block_delta\r\ndata: {}\r\n\r\n: ping\n\n");
        assert_eq!(payloads, vec!["{}"]);
        assert_eq!(decoder.push(b"data: tail"), Vec::<String>::new());
        assert_eq!(decoder.finish(), vec!["tail"]);
    }
}
