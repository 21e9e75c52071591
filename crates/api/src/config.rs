/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for running the tool locally.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1`).
    pub host: String,
    /// First port to try (default: `5000`).
    pub port: u16,
    /// How many consecutive ports to try before giving up (default: `50`).
    pub port_attempts: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// Request timeout in seconds for the control routes (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on waiting for a running job during shutdown (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Engine executable (default: `ffuf`).
    pub engine_bin: String,
    /// Seconds a stopped engine gets before it is killed (default: `5`).
    pub stop_grace_secs: u64,
    /// Event bus capacity (default: `1024`).
    pub event_buffer: usize,
    /// Command printing a path chosen in an "open" dialog, if any.
    pub picker_open_cmd: Option<String>,
    /// Command printing a path chosen in a "save" dialog, if any.
    pub picker_save_cmd: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `127.0.0.1`             |
    /// | `PORT`                  | `5000`                  |
    /// | `PORT_ATTEMPTS`         | `50`                    |
    /// | `CORS_ORIGINS`          | `http://localhost:5000` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `10`                    |
    /// | `FFUF_BIN`              | `ffuf`                  |
    /// | `STOP_GRACE_SECS`       | `5`                     |
    /// | `EVENT_BUFFER`          | `1024`                  |
    /// | `PICKER_OPEN_CMD`       | unset                   |
    /// | `PICKER_SAVE_CMD`       | unset                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let port_attempts: u16 = std::env::var("PORT_ATTEMPTS")
            .unwrap_or_else(|_| "50".into())
            .parse()
            .expect("PORT_ATTEMPTS must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let engine_bin = std::env::var("FFUF_BIN").unwrap_or_else(|_| "ffuf".into());

        let stop_grace_secs: u64 = std::env::var("STOP_GRACE_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("STOP_GRACE_SECS must be a valid u64");

        let event_buffer: usize = std::env::var("EVENT_BUFFER")
            .unwrap_or_else(|_| "1024".into())
            .parse()
            .expect("EVENT_BUFFER must be a valid usize");

        let picker_open_cmd = non_empty_var("PICKER_OPEN_CMD");
        let picker_save_cmd = non_empty_var("PICKER_SAVE_CMD");

        Self {
            host,
            port,
            port_attempts,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            engine_bin,
            stop_grace_secs,
            event_buffer,
            picker_open_cmd,
            picker_save_cmd,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
