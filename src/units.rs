// Human-readable byte counts and speeds, and bit/byte speed conversion.

use std::str::FromStr;

const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * KB;
const GB: f64 = 1024.0 * MB;

/// Byte count, 1024-based: "512 B", "1.50 KB", "2.00 GB".
pub fn format_bytes(bytes: u64) -> String {
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Bytes/sec as "0 B/s", "1.00 KB/s", ...
pub fn format_speed(bytes_per_sec: f64) -> String {
    if bytes_per_sec >= GB {
        format!("{:.2} GB/s", bytes_per_sec / GB)
    } else if bytes_per_sec >= MB {
        format!("{:.2} MB/s", bytes_per_sec / MB)
    } else if bytes_per_sec >= KB {
        format!("{:.2} KB/s", bytes_per_sec / KB)
    } else {
        format!("{:.0} B/s", bytes_per_sec)
    }
}

/// Speed units. Bit units are decimal (1 kbps = 1000 bit/s), byte units binary (1 KB/s = 1024 B/s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedUnit {
    Kbps,
    Mbps,
    Gbps,
    KBps,
    MBps,
    GBps,
}

impl SpeedUnit {
    fn bits_per_second(self) -> f64 {
        match self {
            SpeedUnit::Kbps => 1000.0,
            SpeedUnit::Mbps => 1000.0 * 1000.0,
            SpeedUnit::Gbps => 1000.0 * 1000.0 * 1000.0,
            SpeedUnit::KBps => KB * 8.0,
            SpeedUnit::MBps => MB * 8.0,
            SpeedUnit::GBps => GB * 8.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown speed unit {0:?} (expected kbps, Mbps, Gbps, KB/s, MB/s or GB/s)")]
pub struct UnknownUnit(String);

impl FromStr for SpeedUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Case matters: "Mb" is bits, "MB" is bytes.
        match s.trim() {
            "kbps" | "Kbps" | "kb/s" | "Kb/s" => Ok(SpeedUnit::Kbps),
            "mbps" | "Mbps" | "Mb/s" => Ok(SpeedUnit::Mbps),
            "gbps" | "Gbps" | "Gb/s" => Ok(SpeedUnit::Gbps),
            "KB/s" | "KBps" => Ok(SpeedUnit::KBps),
            "MB/s" | "MBps" => Ok(SpeedUnit::MBps),
            "GB/s" | "GBps" => Ok(SpeedUnit::GBps),
            other => Err(UnknownUnit(other.to_string())),
        }
    }
}

pub fn convert_speed(value: f64, from: SpeedUnit, to: SpeedUnit) -> f64 {
    value * from.bits_per_second() / to.bits_per_second()
}
