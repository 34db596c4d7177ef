#![cfg(all(unix, feature = "cli"))]

use std::io::Write;
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use bytes::BytesMut;
use serialmux::frame::{encode_frame, FrameReader};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/serialmux-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn serialmux() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_serialmux"));
    cmd.env_remove("SERIALMUX_DEVICE")
        .env_remove("SERIALMUX_BAUD")
        .args(["--log-level", "error"]);
    cmd
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

#[test]
fn encode_prints_wire_bytes() {
    let output = serialmux()
        .args(["--format", "json", "encode", "--data", "hi"])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["payload_size"], 2);
    assert_eq!(lines[0]["wire_size"], 4);
    assert_eq!(lines[0]["wire"], "03 68 69 00");
}

#[test]
fn encode_stuffs_embedded_zeros() {
    let output = serialmux()
        .args(["--format", "pretty", "encode", "--hex", "11 22 00 33"])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "03 11 22 02 33 00"
    );
}

#[test]
fn decode_lists_frames_and_flags_malformed_input() {
    let output = serialmux()
        .args(["--format", "json", "decode", "03 68 69 00 05 01 00"])
        .output()
        .expect("decode should run");

    assert_eq!(output.status.code(), Some(60));
    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["status"], "ok");
    assert_eq!(lines[0]["payload"], "hi");
    assert_eq!(lines[1]["status"], "malformed");
}

#[test]
fn decode_without_input_is_a_usage_error() {
    let output = serialmux()
        .arg("decode")
        .output()
        .expect("decode should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn send_writes_one_frame_to_the_link() {
    let dir = unique_temp_dir("send");
    let sock_path = dir.join("link.sock");
    let listener = UnixListener::bind(&sock_path).expect("listener should bind");

    let child = serialmux()
        .args(["--format", "json", "send"])
        .arg(&sock_path)
        .args(["--unix", "--break", "--data", "hello"])
        .stdout(Stdio::piped())
        .spawn()
        .expect("send should start");

    let (stream, _) = listener.accept().expect("send should connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("timeout should apply");
    let mut reader = FrameReader::new(stream);
    let frame = reader.read_frame().expect("frame should arrive");
    assert_eq!(&frame[..], b"hello");

    let output = child.wait_with_output().expect("send should exit");
    assert!(output.status.success());
    let lines = json_lines(&output.stdout);
    assert_eq!(lines[0]["payload_size"], 5);
    assert_eq!(lines[0]["wire_size"], 7);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn monitor_prints_received_frames_and_stats() {
    let dir = unique_temp_dir("monitor");
    let sock_path = dir.join("link.sock");
    let listener = UnixListener::bind(&sock_path).expect("listener should bind");

    let child = serialmux()
        .args(["--format", "json", "monitor"])
        .arg(&sock_path)
        .args(["--unix", "--count", "2", "--stats"])
        .stdout(Stdio::piped())
        .spawn()
        .expect("monitor should start");

    let (mut stream, _) = listener.accept().expect("monitor should connect");
    let mut wire = BytesMut::new();
    encode_frame(b"first", &mut wire);
    wire.extend_from_slice(&[0x05, 0x01, 0x00]);
    encode_frame(b"second", &mut wire);
    stream.write_all(&wire).expect("frames should write");

    let output = child.wait_with_output().expect("monitor should exit");
    assert!(output.status.success());

    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["payload"], "first");
    assert_eq!(lines[1]["payload"], "second");
    assert_eq!(lines[1]["index"], 1);
    assert_eq!(lines[2]["frames_received"], 2);
    assert_eq!(lines[2]["malformed_frames"], 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn monitor_exits_cleanly_when_the_peer_hangs_up() {
    let dir = unique_temp_dir("hangup");
    let sock_path = dir.join("link.sock");
    let listener = UnixListener::bind(&sock_path).expect("listener should bind");

    let child = serialmux()
        .args(["--format", "json", "monitor"])
        .arg(&sock_path)
        .arg("--unix")
        .stdout(Stdio::piped())
        .spawn()
        .expect("monitor should start");

    let (mut stream, _) = listener.accept().expect("monitor should connect");
    let mut wire = BytesMut::new();
    encode_frame(b"only", &mut wire);
    stream.write_all(&wire).expect("frame should write");
    drop(stream);

    let output = child.wait_with_output().expect("monitor should exit");
    assert!(output.status.success());
    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["payload"], "only");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn monitor_reports_a_missing_device() {
    let output = serialmux()
        .args(["monitor", "/nonexistent/serialmux-tty"])
        .output()
        .expect("monitor should run");
    assert_eq!(output.status.code(), Some(1));
}
