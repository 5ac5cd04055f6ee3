use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// MCP over standard input/output (for desktop clients that spawn the server)
    Stdio,
    /// MCP streamable HTTP
    Http,
}

/// Command-line configuration. Every flag can also come from a `LOCALFIND_*` variable.
#[derive(Debug, Parser)]
#[command(name = "localfind", version, about = "MCP server for local file index search and document reading")]
pub struct Config {
    /// Transport to serve MCP over
    #[arg(long, env = "LOCALFIND_TRANSPORT", value_enum, default_value_t = Transport::Stdio)]
    pub transport: Transport,

    /// Bind host for the HTTP transport
    #[arg(long, env = "LOCALFIND_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Bind port for the HTTP transport
    #[arg(long, env = "LOCALFIND_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Endpoint path of the MCP service in HTTP mode
    #[arg(long, env = "LOCALFIND_MCP_PATH", default_value = "/mcp")]
    pub mcp_path: String,

    /// Require `Authorization: Bearer <key>` on the MCP endpoint in HTTP mode
    #[arg(long, env = "LOCALFIND_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid --mcp-path '{0}': must start with '/' and name a sub-path other than /health")]
    InvalidMcpPath(String),

    #[error("--api-key must not be empty")]
    EmptyApiKey,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let path = self.mcp_endpoint();
        if !path.starts_with('/') || path.len() < 2 || path == "/health" {
            return Err(ConfigError::InvalidMcpPath(self.mcp_path.clone()));
        }
        if self.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(())
    }

    /// `--mcp-path` without trailing slashes.
    pub fn mcp_endpoint(&self) -> &str {
        self.mcp_path.trim_end_matches('/')
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
