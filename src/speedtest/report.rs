//! The subset of `speedtest --format=json` output this plugin reads, and the
//! payload it forwards to downstream consumers.

use super::bytes_per_sec_to_mbps;
use serde::{Deserialize, Serialize};
use serde_json::Number;

#[derive(Debug, Deserialize)]
struct RawReport {
    download: RawBandwidth,
    upload: RawBandwidth,
    ping: RawPing,
    server: RawServer,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct RawBandwidth {
    bandwidth: f64,
}

#[derive(Debug, Deserialize)]
struct RawPing {
    latency: Number,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Bytes per second, as reported by the binary.
    pub download_bandwidth: f64,
    pub upload_bandwidth: f64,
    /// Forwarded as written, so `15` stays an integer in the payload.
    pub ping_latency: Number,
    pub server_name: String,
    pub timestamp: String,
}

impl Measurement {
    pub fn download_mbps(&self) -> f64 {
        bytes_per_sec_to_mbps(self.download_bandwidth)
    }

    pub fn upload_mbps(&self) -> f64 {
        bytes_per_sec_to_mbps(self.upload_bandwidth)
    }

    pub fn payload(&self) -> Payload<'_> {
        Payload {
            download: bits_per_sec(self.download_bandwidth),
            upload: bits_per_sec(self.upload_bandwidth),
            ping: &self.ping_latency,
            server: PayloadServer {
                name: &self.server_name,
            },
            timestamp: &self.timestamp,
        }
    }
}

/// Serialized field order is part of the contract with webhook consumers.
#[derive(Debug, Serialize)]
pub struct Payload<'a> {
    pub download: i64,
    pub upload: i64,
    pub ping: &'a Number,
    pub server: PayloadServer<'a>,
    pub timestamp: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PayloadServer<'a> {
    pub name: &'a str,
}

pub fn parse_report(stdout: &str) -> Result<Measurement, serde_json::Error> {
    let raw: RawReport = serde_json::from_str(stdout)?;
    Ok(Measurement {
        download_bandwidth: raw.download.bandwidth,
        upload_bandwidth: raw.upload.bandwidth,
        ping_latency: raw.ping.latency,
        server_name: raw.server.name,
        timestamp: raw.timestamp,
    })
}

fn bits_per_sec(bandwidth: f64) -> i64 {
    (bandwidth * 8.0).trunc() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trimmed from a real Ookla CLI run; extra fields must be ignored.
    const OOKLA_OUTPUT: &str = r#"{
        "type": "result",
        "timestamp": "2024-05-02T10:15:42Z",
        "ping": {"jitter": 0.41, "latency": 8.934, "low": 8.5, "high": 9.7},
        "download": {"bandwidth": 11681250, "bytes": 120000000, "elapsed": 10010},
        "upload": {"bandwidth": 4375000, "bytes": 40000000, "elapsed": 9500},
        "packetLoss": 0,
        "isp": "Example ISP",
        "interface": {"internalIp": "192.168.1.20", "name": "eth0", "isVpn": false},
        "server": {"id": 1234, "host": "speed.example.net", "port": 8080, "name": "Example Net", "location": "Berlin", "country": "Germany"},
        "result": {"id": "abc", "url": "https://www.speedtest.net/result/c/abc", "persisted": true}
    }"#;

    #[test]
    fn parses_ookla_result() {
        let m = parse_report(OOKLA_OUTPUT).unwrap();
        assert_eq!(m.download_bandwidth, 11_681_250.0);
        assert_eq!(m.upload_bandwidth, 4_375_000.0);
        assert_eq!(m.ping_latency.as_f64(), Some(8.934));
        assert_eq!(m.server_name, "Example Net");
        assert_eq!(m.timestamp, "2024-05-02T10:15:42Z");
        assert_eq!(m.download_mbps(), 93.45);
        assert_eq!(m.upload_mbps(), 35.0);
    }

    #[test]
    fn payload_uses_integer_bit_rates() {
        let m = parse_report(OOKLA_OUTPUT).unwrap();
        let payload = serde_json::to_value(m.payload()).unwrap();
        assert_eq!(payload["download"], 93_450_000);
        assert_eq!(payload["upload"], 35_000_000);
        assert_eq!(payload["ping"], 8.934);
        assert_eq!(payload["server"]["name"], "Example Net");
        assert_eq!(payload["timestamp"], "2024-05-02T10:15:42Z");
    }

    #[test]
    fn integer_latency_stays_integer() {
        let m = parse_report(
            r#"{"download":{"bandwidth":12500000},"upload":{"bandwidth":1250000},"ping":{"latency":15},"server":{"name":"X"},"timestamp":"t"}"#,
        )
        .unwrap();
        let payload = serde_json::to_string(&m.payload()).unwrap();
        assert!(payload.contains(r#""ping":15,"#));
    }

    #[test]
    fn fractional_bandwidth_truncates_bits() {
        assert_eq!(bits_per_sec(1.3), 10);
        assert_eq!(bits_per_sec(0.0), 0);
    }

    #[test]
    fn missing_key_is_an_error() {
        let err = parse_report(r#"{"download":{"bandwidth":1},"ping":{"latency":1.0},"server":{"name":"X"},"timestamp":"t"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("upload"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_report("not json").is_err());
        assert!(parse_report("").is_err());
        assert!(parse_report(r#"{"download":{"bandwidth":"fast"}}"#).is_err());
    }
}
