use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serialmux_channel::LinkStatsSnapshot;

use crate::hex;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One frame as seen by `decode` or `monitor`.
#[derive(Debug, Serialize)]
pub struct FrameRecord {
    pub index: usize,
    pub status: FrameStatus,
    pub size: usize,
    pub payload: String,
    pub hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    raw: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    Ok,
    Malformed,
}

impl FrameRecord {
    pub fn ok(index: usize, payload: &[u8]) -> Self {
        Self {
            index,
            status: FrameStatus::Ok,
            size: payload.len(),
            payload: payload_preview(payload),
            hex: hex::format(payload),
            error: None,
            raw: payload.to_vec(),
        }
    }

    pub fn malformed(index: usize, error: impl ToString) -> Self {
        Self {
            index,
            status: FrameStatus::Malformed,
            size: 0,
            payload: String::new(),
            hex: String::new(),
            error: Some(error.to_string()),
            raw: Vec::new(),
        }
    }
}

pub fn print_frames(records: &[FrameRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                print_json(record);
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                return;
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "STATUS", "SIZE", "PAYLOAD"]);
            for record in records {
                table.add_row(vec![
                    record.index.to_string(),
                    status_label(record.status).to_string(),
                    record.size.to_string(),
                    record
                        .error
                        .clone()
                        .unwrap_or_else(|| record.payload.clone()),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                match &record.error {
                    None => println!(
                        "#{} size={} hex=[{}] payload={}",
                        record.index, record.size, record.hex, record.payload
                    ),
                    Some(err) => println!("#{} malformed: {err}", record.index),
                }
            }
        }
        OutputFormat::Raw => {
            for record in records {
                print_raw(&record.raw);
            }
        }
    }
}

#[derive(Serialize)]
struct EncodedOutput {
    payload_size: usize,
    wire_size: usize,
    wire: String,
}

/// Print the wire form of one stuffed frame, delimiter included.
pub fn print_encoded(payload_size: usize, wire: &[u8], format: OutputFormat) {
    let out = EncodedOutput {
        payload_size,
        wire_size: wire.len(),
        wire: hex::format(wire),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PAYLOAD", "WIRE", "BYTES"])
                .add_row(vec![
                    out.payload_size.to_string(),
                    out.wire_size.to_string(),
                    out.wire,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", out.wire),
        OutputFormat::Raw => print_raw(wire),
    }
}

#[derive(Serialize)]
struct SentOutput<'a> {
    link: &'a str,
    payload_size: usize,
    wire_size: usize,
    timestamp: String,
}

pub fn print_sent(link: &str, payload_size: usize, wire_size: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SentOutput {
            link,
            payload_size,
            wire_size,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["LINK", "PAYLOAD", "WIRE"])
                .add_row(vec![
                    link.to_string(),
                    payload_size.to_string(),
                    wire_size.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("sent {payload_size} bytes ({wire_size} on the wire) to {link}")
        }
        OutputFormat::Raw => {}
    }
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    link: &'a str,
    timestamp: String,
    #[serde(flatten)]
    stats: LinkStatsSnapshot,
}

pub fn print_stats(link: &str, stats: LinkStatsSnapshot, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StatsOutput {
            link,
            timestamp: now_unix_seconds(),
            stats,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in stats_rows(&stats) {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line: Vec<String> = stats_rows(&stats)
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            println!("{link}: {}", line.join(" "));
        }
        // Raw output is payload bytes only.
        OutputFormat::Raw => {}
    }
}

fn stats_rows(stats: &LinkStatsSnapshot) -> [(&'static str, u64); 6] {
    [
        ("bytes_received", stats.bytes_received),
        ("bytes_sent", stats.bytes_sent),
        ("frames_received", stats.frames_received),
        ("frames_sent", stats.frames_sent),
        ("malformed_frames", stats.malformed_frames),
        ("oversized_frames", stats.oversized_frames),
    ]
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn status_label(status: FrameStatus) -> &'static str {
    match status {
        FrameStatus::Ok => "OK",
        FrameStatus::Malformed => "MALFORMED",
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
