use crate::buffer::{contains, find, ResponseBuffer};

#[test]
fn test_push_appends_in_order() {
    let mut buffer: ResponseBuffer<8> = ResponseBuffer::new();
    assert!(buffer.is_empty());

    for byte in b"OK\r\n" {
        buffer.push(*byte);
    }

    assert_eq!(4, buffer.len());
    buffer.with_contiguous(|data| assert_eq!(b"OK\r\n", data));
    assert!(!buffer.has_overflowed());
}

#[test]
fn test_clear_zeroes_content() {
    let mut buffer: ResponseBuffer<8> = ResponseBuffer::new();
    for byte in b"ERROR" {
        buffer.push(*byte);
    }

    buffer.clear();

    assert!(buffer.is_empty());
    assert!(!buffer.contains(b"ERROR"));
    buffer.with_contiguous(|data| assert!(data.is_empty()));
}

#[test]
fn test_overflow_keeps_tail() {
    let mut buffer: ResponseBuffer<6> = ResponseBuffer::new();
    for byte in b"garbage OK\r\n" {
        buffer.push(*byte);
    }

    assert_eq!(6, buffer.len());
    buffer.with_contiguous(|data| assert_eq!(b"e OK\r\n", data));
    assert!(buffer.contains(b"OK\r\n"));
    assert!(buffer.has_overflowed());

    buffer.clear();
    assert!(!buffer.has_overflowed());
}

#[test]
fn test_overflow_after_wraparound() {
    let mut buffer: ResponseBuffer<4> = ResponseBuffer::new();
    for byte in b"ab" {
        buffer.push(*byte);
    }
    buffer.clear();

    for byte in b"xyzERROR\r\n" {
        buffer.push(*byte);
    }

    assert_eq!(4, buffer.len());
    buffer.with_contiguous(|data| assert_eq!(b"OR\r\n", data));
    assert!(buffer.contains(b"R\r\n"));
    assert!(!buffer.contains(b"ERROR"));
}

#[test]
fn test_long_stream_keeps_last_bytes() {
    let mut buffer: ResponseBuffer<16> = ResponseBuffer::new();
    for index in 0..10_000u32 {
        buffer.push((index % 251) as u8);
    }
    for byte in b"\r\nOK\r\n" {
        buffer.push(*byte);
    }

    assert_eq!(16, buffer.len());
    assert!(buffer.contains(b"\r\nOK\r\n"));
    buffer.with_contiguous(|data| assert_eq!(b"\r\nOK\r\n", &data[10..]));
}

#[test]
fn test_contains_treats_nul_as_data() {
    assert!(contains(b"\0OK", b"OK"));
    assert!(!contains(b"ER\0OR", b"ERROR"));
    assert!(contains(b"ER\0OR", b"R\0O"));
    assert!(!contains(b"O", b"OK"));
}

#[test]
fn test_find_position() {
    assert_eq!(Some(0), find(b"+CIPDOMAIN:1.2.3.4", b"+CIPDOMAIN:"));
    assert_eq!(Some(2), find(b"\r\nOK", b"OK"));
    assert_eq!(None, find(b"", b"OK"));
    assert_eq!(Some(0), find(b"abc", b""));
}
