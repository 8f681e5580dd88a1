//! MJPEG multipart wire format.
//!
//! Each frame is one multipart unit:
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! \r\n
//! <jpeg bytes>\r\n
//! ```
//!
//! The HTTP response carrying the units must declare [`CONTENT_TYPE`].

/// Multipart boundary token.
pub const BOUNDARY: &str = "frame";

/// MIME type for the streaming response.
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
const PART_TRAILER: &[u8] = b"\r\n";

/// Wrap one JPEG into a multipart unit.
pub fn encode_part(jpeg: &[u8]) -> Vec<u8> {
    let mut part = Vec::with_capacity(PART_HEADER.len() + jpeg.len() + PART_TRAILER.len());
    part.extend_from_slice(PART_HEADER);
    part.extend_from_slice(jpeg);
    part.extend_from_slice(PART_TRAILER);
    part
}

/// Extract the JPEG payload from a unit produced by [`encode_part`].
pub fn decode_part(part: &[u8]) -> Option<&[u8]> {
    part.strip_prefix(PART_HEADER)?.strip_suffix(PART_TRAILER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_layout() {
        let part = encode_part(&[0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(
            part,
            b"--frame\r\nContent-Type: image/jpeg\r\n\r\n\xFF\xD8\xFF\xD9\r\n".to_vec()
        );
        assert!(CONTENT_TYPE.ends_with(&format!("boundary={BOUNDARY}")));
    }

    #[test]
    fn empty_payload_is_still_a_unit() {
        let part = encode_part(&[]);
        assert_eq!(decode_part(&part), Some(&[][..]));
    }

    #[test]
    fn decode_rejects_foreign_bytes() {
        assert_eq!(decode_part(b"HTTP/1.1 200 OK\r\n"), None);
    }
}
