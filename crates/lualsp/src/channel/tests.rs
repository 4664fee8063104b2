//! Unit tests for the blocking byte channel.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;

const TEST_CEILING: usize = 1024 * 1024;
const UNBLOCK_TIMEOUT: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_millis(50);

#[fixture]
fn channel() -> Arc<ByteChannel> {
    Arc::new(ByteChannel::new(TEST_CEILING))
}

fn take_on_thread(
    channel: &Arc<ByteChannel>,
    len: usize,
) -> mpsc::Receiver<Result<ReadOutcome, TransportError>> {
    let (sender, receiver) = mpsc::channel();
    let reader = Arc::clone(channel);
    thread::spawn(move || {
        let _ = sender.send(reader.take(len));
    });
    receiver
}

#[rstest]
fn concatenates_appends_for_a_single_take(channel: Arc<ByteChannel>) {
    assert!(channel.append(b"ab"));
    assert!(channel.append(b"cd"));
    assert!(channel.append(b"ef"));

    let outcome = channel.take(6).expect("take should succeed");

    assert_eq!(outcome, ReadOutcome::Data(b"abcdef".to_vec()));
    assert_eq!(channel.buffered_len(), 0);
}

#[rstest]
fn takes_preserve_order_then_end_short(channel: Arc<ByteChannel>) {
    let payload = b"Content-Length: 2\r\n\r\n{}";
    assert!(channel.append(payload));
    channel.disconnect();

    let first = channel.take(15).expect("first take");
    let second = channel.take(8).expect("second take");
    let third = channel.take(4).expect("third take");

    assert_eq!(first, ReadOutcome::Data(payload[..15].to_vec()));
    assert_eq!(second, ReadOutcome::Data(payload[15..].to_vec()));
    assert_eq!(third, ReadOutcome::EndOfStream(Vec::new()));
}

#[rstest]
fn short_read_after_disconnect_returns_remaining_bytes(channel: Arc<ByteChannel>) {
    assert!(channel.append(b"xyz"));
    channel.disconnect();

    let outcome = channel.take(10).expect("take should succeed");

    assert!(outcome.is_end_of_stream());
    assert_eq!(outcome.bytes(), b"xyz");
}

#[rstest]
fn disconnect_without_input_returns_immediately(channel: Arc<ByteChannel>) {
    channel.disconnect();

    let outcome = channel.take(10).expect("take should succeed");

    assert_eq!(outcome, ReadOutcome::EndOfStream(Vec::new()));
}

#[rstest]
fn disconnect_is_idempotent(channel: Arc<ByteChannel>) {
    channel.disconnect();
    channel.disconnect();

    assert!(channel.is_disconnected());
    assert!(channel.take(1).expect("take").is_end_of_stream());
}

#[rstest]
fn blocked_take_is_released_by_disconnect(channel: Arc<ByteChannel>) {
    let receiver = take_on_thread(&channel, 8);
    thread::sleep(SETTLE);
    assert!(
        receiver.try_recv().is_err(),
        "take should block until input or disconnect"
    );

    assert!(channel.append(b"par"));
    thread::sleep(SETTLE);
    assert!(receiver.try_recv().is_err(), "three bytes must not satisfy eight");

    channel.disconnect();
    let outcome = receiver
        .recv_timeout(UNBLOCK_TIMEOUT)
        .expect("disconnect should release the reader")
        .expect("take should succeed");

    assert_eq!(outcome, ReadOutcome::EndOfStream(b"par".to_vec()));
}

#[rstest]
fn blocked_take_is_released_once_enough_bytes_arrive(channel: Arc<ByteChannel>) {
    let receiver = take_on_thread(&channel, 4);

    assert!(channel.append(b"pi"));
    assert!(channel.append(b"ng!"));

    let outcome = receiver
        .recv_timeout(UNBLOCK_TIMEOUT)
        .expect("append should release the reader")
        .expect("take should succeed");

    assert_eq!(outcome, ReadOutcome::Data(b"ping".to_vec()));
    assert_eq!(channel.buffered_len(), 1);
}

#[rstest]
#[case::zero(0)]
#[case::above_ceiling(TEST_CEILING + 1)]
fn rejects_invalid_lengths_without_blocking(channel: Arc<ByteChannel>, #[case] len: usize) {
    assert!(channel.append(b"abc"));

    match channel.take(len) {
        Err(TransportError::InvalidReadLength { requested, max }) => {
            assert_eq!(requested, len);
            assert_eq!(max, TEST_CEILING);
        }
        other => panic!("expected invalid length error, got {other:?}"),
    }
    assert_eq!(channel.buffered_len(), 3, "state must be untouched");
}

#[rstest]
fn accepts_the_ceiling_itself() {
    let channel = ByteChannel::new(4);
    assert!(channel.append(b"full"));

    assert_eq!(
        channel.take(4).expect("take"),
        ReadOutcome::Data(b"full".to_vec())
    );
}

#[rstest]
fn appends_after_disconnect_are_dropped(channel: Arc<ByteChannel>) {
    assert!(channel.append(b"kept"));
    channel.disconnect();

    assert!(!channel.append(b"lost"));
    assert_eq!(channel.buffered_len(), 4);
}

#[rstest]
fn reset_clears_bytes_and_disconnect(channel: Arc<ByteChannel>) {
    assert!(channel.append(b"stale"));
    channel.disconnect();

    channel.reset();

    assert!(!channel.is_disconnected());
    assert_eq!(channel.buffered_len(), 0);
    assert!(channel.append(b"fresh"));
    assert_eq!(
        channel.take(5).expect("take"),
        ReadOutcome::Data(b"fresh".to_vec())
    );
}

#[rstest]
fn reset_releases_reader_from_previous_generation(channel: Arc<ByteChannel>) {
    let receiver = take_on_thread(&channel, 4);
    thread::sleep(SETTLE);

    channel.reset();

    let outcome = receiver
        .recv_timeout(UNBLOCK_TIMEOUT)
        .expect("reset should release the reader")
        .expect("take should succeed");
    assert_eq!(outcome, ReadOutcome::EndOfStream(Vec::new()));
}

#[rstest]
fn stale_generation_read_ends_without_blocking(channel: Arc<ByteChannel>) {
    let generation = channel.generation();
    channel.reset();
    assert!(channel.append(b"next session"));

    assert_eq!(
        channel.take_from(generation, 4).expect("take"),
        ReadOutcome::EndOfStream(Vec::new())
    );
    assert_eq!(channel.buffered_len(), 12);
}

#[rstest]
fn current_generation_read_behaves_like_take(channel: Arc<ByteChannel>) {
    assert!(channel.append(b"abcdef"));

    let outcome = channel
        .take_from(channel.generation(), 4)
        .expect("take");

    assert_eq!(outcome, ReadOutcome::Data(b"abcd".to_vec()));
    assert_eq!(outcome.bytes(), b"abcd");
}
