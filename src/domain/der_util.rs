//! Minimal DER framing helpers for hand-assembled structures.

/// Encode ASN.1 length field (short form vs long form)
#[must_use]
pub fn encode_length(length: usize) -> Vec<u8> {
    if length < 128 {
        return vec![length as u8];
    }
    let bytes = length.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    let mut out = Vec::with_capacity(1 + bytes.len() - skip);
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
    out
}

/// Tag-length-value with a single-byte tag.
#[must_use]
pub fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let length = encode_length(content.len());
    let mut out = Vec::with_capacity(1 + length.len() + content.len());
    out.push(tag);
    out.extend_from_slice(&length);
    out.extend_from_slice(content);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_forms() {
        assert_eq!(encode_length(0x7F), vec![0x7F]);
        assert_eq!(encode_length(0x80), vec![0x81, 0x80]);
        assert_eq!(encode_length(0x0123), vec![0x82, 0x01, 0x23]);
        assert_eq!(encode_length(0x010000), vec![0x83, 0x01, 0x00, 0x00]);
        assert_eq!(encode_length(0x0100_0000), vec![0x84, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(encode_length(0xFF), vec![0x81, 0xFF]);
    }

    #[test]
    fn tlv_wraps_content() {
        assert_eq!(encode_tlv(0x04, &[1, 2]), vec![0x04, 0x02, 1, 2]);
    }
}
