//! Command-line configuration.

use std::net::SocketAddr;

use clap::Parser;
use sqlbook_core::DEFAULT_PAGE_SIZE;

#[derive(Parser, Debug)]
#[command(name = "sqlbook-server")]
#[command(about = "SQLBook server - JSON-RPC query sessions over HTTP")]
pub struct Args {
    /// SQLite database file, or :memory:
    #[arg(long, env = "SQLBOOK_DATABASE", default_value = ":memory:")]
    pub database: String,

    /// Address to listen on
    #[arg(long, env = "SQLBOOK_BIND", default_value = "127.0.0.1:1995")]
    pub bind: SocketAddr,

    /// Upper bound on rows per page
    #[arg(long, env = "SQLBOOK_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Log level
    #[arg(long, env = "SQLBOOK_LOG", default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["sqlbook-server"]).unwrap();
        assert_eq!(args.database, ":memory:");
        assert_eq!(args.bind.port(), 1995);
        assert_eq!(args.page_size, 100);
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "sqlbook-server",
            "--database",
            "books.db",
            "--bind",
            "0.0.0.0:8080",
            "--page-size",
            "25",
        ])
        .unwrap();
        assert_eq!(args.database, "books.db");
        assert_eq!(args.bind.port(), 8080);
        assert_eq!(args.page_size, 25);
    }
}
