//! Property and example tests for the wire frame codec: header round-tripping, ctx echoing, and
//! rejection of malformed input.

use proptest::prelude::*;
use sirius::frame::{Frame, FRAME_MAGIC, HEADER_LEN, MAX_PAYLOAD_SIZE};

#[test]
fn header_fields_survive_a_full_encode_decode_cycle() {
    let frame = Frame::new(0xDEAD_BEEF, 7, vec![1, 2, 3, 4, 5]).unwrap();
    let bytes = frame.encode();
    assert_eq!(bytes.len(), HEADER_LEN + 5);

    let decoded = Frame::decode(&bytes).unwrap();
    assert_eq!(decoded, frame);
    assert_eq!(decoded.magic, FRAME_MAGIC);
}

#[test]
fn error_frames_carry_no_payload() {
    let frame = Frame::error(42, 3, -10001);
    assert!(frame.payload.is_empty());
    assert_eq!(frame.err_code, -10001);
    assert_eq!(frame.ctx, 42);
}

#[test]
fn oversized_payload_is_rejected_at_construction() {
    let oversized = vec![0u8; MAX_PAYLOAD_SIZE as usize + 1];
    assert!(Frame::new(1, 1, oversized).is_err());
}

#[tokio::test]
async fn async_write_then_read_reproduces_the_frame() {
    let frame = Frame::new(99, 2, b"hello sirius".to_vec()).unwrap();

    let (mut client, mut server) = tokio::io::duplex(4096);
    frame.write_to(&mut client).await.unwrap();
    drop(client);

    let decoded = Frame::read_from(&mut server).await.unwrap();
    assert_eq!(decoded, frame);
}

#[tokio::test]
async fn async_read_on_a_truncated_stream_errors_instead_of_hanging() {
    use tokio::io::AsyncWriteExt;

    let (mut client, mut server) = tokio::io::duplex(4096);
    client.write_all(&[1, 2, 3]).await.unwrap();
    drop(client);

    let result = Frame::read_from(&mut server).await;
    assert!(result.is_err());
}

proptest! {
    #[test]
    fn round_trip_preserves_header_and_payload_for_any_valid_frame(
        ctx in any::<u64>(),
        payload_type in any::<u32>(),
        payload in proptest::collection::vec(any::<u8>(), 0..2_000),
    ) {
        let frame = Frame::new(ctx, payload_type, payload).unwrap();
        let decoded = Frame::decode(&frame.encode()).unwrap();
        prop_assert_eq!(decoded, frame);
    }

    #[test]
    fn ctx_round_trips_through_an_error_frame(
        ctx in any::<u64>(),
        payload_type in any::<u32>(),
        err_code in any::<i32>(),
    ) {
        let frame = Frame::error(ctx, payload_type, err_code);
        let decoded = Frame::decode(&frame.encode()).unwrap();
        prop_assert_eq!(decoded.ctx, ctx);
        prop_assert_eq!(decoded.err_code, err_code);
    }

    #[test]
    fn decode_never_panics_on_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..300)) {
        let _ = Frame::decode(&bytes);
    }
}
