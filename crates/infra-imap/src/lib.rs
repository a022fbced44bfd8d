mod adapter;

pub use adapter::{resolve_host, ImapConfig, ImapTransport, IMAP_TLS_PORT};
