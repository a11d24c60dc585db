use std::time::Duration;

/// Orchestrator configuration, loaded from environment variables.
pub struct Config {
    /// Base URL of the recognition service.
    pub service_url: String,
    /// WebSocket URL of the chat gateway.
    pub gateway_url: String,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Sampling cadence of the capture scheduler.
    pub sample_interval: Duration,
    /// How long a chat query may wait for a gateway reply.
    pub chat_timeout: Duration,
    /// JPEG quality for frame snapshots (1-100).
    pub jpeg_quality: u8,
}

impl Config {
    /// Load configuration from `VISAVIS_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            service_url: std::env::var("VISAVIS_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            gateway_url: std::env::var("VISAVIS_GATEWAY_URL")
                .unwrap_or_else(|_| "ws://localhost:8080".to_string()),
            camera_device: std::env::var("VISAVIS_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            sample_interval: Duration::from_millis(env_u64("VISAVIS_SAMPLE_INTERVAL_MS", 1000)),
            chat_timeout: Duration::from_secs(env_u64("VISAVIS_CHAT_TIMEOUT_SECS", 30)),
            jpeg_quality: env_u64("VISAVIS_JPEG_QUALITY", 80).clamp(1, 100) as u8,
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
