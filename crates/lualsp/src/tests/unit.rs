//! Unit tests spanning the controller, the pump and the stub server.

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread;

use rstest::rstest;
use serde_json::Value;

use crate::pump::{HostInput, pump_input, spawn_pump};
use crate::stub_server::StubLanguageServer;
use crate::tests::support::{CapturedOutput, Script, ScriptedServer, frame};
use crate::transport::{Transport, TransportMode};
use crate::worker::{WorkerController, WorkerExit, WorkerState};

const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;
const SHUTDOWN: &str = r#"{"jsonrpc":"2.0","id":2,"method":"shutdown"}"#;
const EXIT: &str = r#"{"jsonrpc":"2.0","method":"exit"}"#;

fn lsp_session() -> Vec<u8> {
    [INITIALIZE, SHUTDOWN, EXIT]
        .into_iter()
        .flat_map(frame)
        .collect()
}

fn parse_frames(text: &str) -> Vec<Value> {
    text.split("Content-Length: ")
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            let (_, body) = chunk.split_once("\r\n\r\n").expect("frame header");
            serde_json::from_str(body).expect("frame body")
        })
        .collect()
}

#[rstest]
fn state_moves_through_the_lifecycle() {
    let output = CapturedOutput::default();
    let controller = WorkerController::init(["lualsp"], Some(output.sink()));
    assert_eq!(controller.state(), WorkerState::NotStarted);
    assert_eq!(controller.args(), ["lualsp".to_owned()]);

    controller
        .start(ScriptedServer::new(Script::PingPong))
        .expect("start");
    assert_ne!(controller.state(), WorkerState::NotStarted);

    controller.disconnect();
    assert_eq!(controller.join(), WorkerExit::EndOfInput);
    assert_eq!(controller.state(), WorkerState::Finished);
}

#[rstest]
fn join_is_idempotent_and_shareable() {
    let controller = Arc::new(WorkerController::init(["lualsp"], None));
    controller
        .start(ScriptedServer::new(Script::PingPong))
        .expect("start");

    let joiners: Vec<_> = (0..3)
        .map(|_| {
            let shared = Arc::clone(&controller);
            thread::spawn(move || shared.join())
        })
        .collect();
    controller.disconnect();

    for joiner in joiners {
        assert_eq!(joiner.join().expect("joiner"), WorkerExit::EndOfInput);
    }
    assert_eq!(controller.join(), WorkerExit::EndOfInput);
}

#[rstest]
fn concurrent_feeders_lose_no_bytes() {
    let output = CapturedOutput::default();
    let controller = Arc::new(WorkerController::init(["lualsp"], Some(output.sink())));
    controller
        .start(ScriptedServer::new(Script::PingPong))
        .expect("start");

    let feeders: Vec<_> = (0..4)
        .map(|_| {
            let input = controller.input();
            thread::spawn(move || {
                for _ in 0..25 {
                    assert!(input.feed_input(b"ping"));
                }
            })
        })
        .collect();
    for feeder in feeders {
        feeder.join().expect("feeder");
    }
    controller.disconnect();

    assert_eq!(controller.join(), WorkerExit::EndOfInput);
    assert_eq!(output.text(), "pong".repeat(100));
}

#[rstest]
fn pumped_lsp_session_shuts_down_cleanly() {
    let output = CapturedOutput::default();
    let controller = WorkerController::init(["lualsp"], Some(output.sink()));
    controller.start(StubLanguageServer::new()).expect("start");

    let summary = pump_input(Cursor::new(lsp_session()), &controller, 7).expect("pump");

    assert!(summary.forwarded > 0);
    assert_eq!(controller.join(), WorkerExit::ShutdownRequested);
    let responses = parse_frames(&output.text());
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "lualsp");
    assert_eq!(responses[1]["result"], Value::Null);
}

#[rstest]
fn pump_thread_ends_the_session_at_end_of_input() {
    let output = CapturedOutput::default();
    let controller = WorkerController::init(["lualsp"], Some(output.sink()));
    controller.start(StubLanguageServer::new()).expect("start");

    let pump = spawn_pump(Cursor::new(frame(INITIALIZE)), controller.input(), 4096)
        .expect("spawn pump");

    assert_eq!(controller.join(), WorkerExit::EndOfInput);
    let summary = pump.join().expect("pump thread").expect("pump");
    assert!(!summary.refused);
    assert_eq!(parse_frames(&output.text()).len(), 1);
}

#[rstest]
fn missing_resource_dir_fails_startup() {
    let controller = WorkerController::init(
        ["lualsp", "--resource-dir", "/definitely/not/here"],
        None,
    );
    controller.start(StubLanguageServer::new()).expect("start");

    let exit = controller.join();

    assert_eq!(exit, WorkerExit::StartupFailed);
    assert_eq!(exit.exit_code(), 1);
    assert!(!controller.feed_input(b"late"));
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[rstest]
fn stdio_session_serves_the_same_server() {
    let written = SharedBuffer::default();
    let transport = Transport::new(lualsp_config::DEFAULT_MAX_READ_LEN);
    transport.activate_streams(Cursor::new(lsp_session()), written.clone());
    let controller = WorkerController::with_transport(["lualsp"], Arc::new(transport));
    assert_eq!(controller.transport().mode(), TransportMode::Stdio);

    controller.start(StubLanguageServer::new()).expect("start");

    assert_eq!(controller.join(), WorkerExit::ShutdownRequested);
    let text = String::from_utf8(written.0.lock().expect("buffer lock").clone()).expect("utf8");
    assert_eq!(parse_frames(&text).len(), 2);
}

#[rstest]
#[case(WorkerExit::NeverStarted, 0)]
#[case(WorkerExit::EndOfInput, 0)]
#[case(WorkerExit::ShutdownRequested, 0)]
#[case(WorkerExit::Failed, 0)]
#[case(WorkerExit::Panicked, 0)]
#[case(WorkerExit::StartupFailed, 1)]
fn only_startup_failure_is_a_failing_exit(#[case] exit: WorkerExit, #[case] code: i32) {
    assert_eq!(exit.exit_code(), code);
}

#[rstest]
#[case(WorkerExit::EndOfInput, true)]
#[case(WorkerExit::ShutdownRequested, true)]
#[case(WorkerExit::StartupFailed, false)]
#[case(WorkerExit::Failed, false)]
#[case(WorkerExit::Panicked, false)]
fn only_designed_endings_are_clean(#[case] exit: WorkerExit, #[case] clean: bool) {
    assert_eq!(exit.is_clean(), clean);
}

#[rstest]
fn panicking_worker_is_absorbed_and_joined() {
    let controller = WorkerController::init(["lualsp"], None);
    controller
        .start(ScriptedServer::new(Script::Panics))
        .expect("start");
    assert!(controller.feed_input(&frame(INITIALIZE)));

    assert_eq!(controller.join(), WorkerExit::Panicked);
    assert_eq!(controller.state(), WorkerState::Finished);
}
