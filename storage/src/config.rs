//! Storage server startup configuration. `root` is the local directory the
//! server serves files out of; `storage_port`/`command_port` may be `0` to
//! bind an ephemeral port, in which case the actual bound address is what
//! gets advertised to the naming server at registration.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "storage", about = "Storage server: local file data plus the naming server's Command interface")]
pub struct Cli {
    /// Local directory this server serves files out of.
    #[arg(long, default_value = "data")]
    pub root: String,

    #[arg(long, default_value_t = 0)]
    pub storage_port: u16,

    #[arg(long, default_value_t = 0)]
    pub command_port: u16,

    #[arg(long, default_value = "127.0.0.1:8091")]
    pub naming_registration_addr: String,

    /// Address other processes should use to reach this server; defaults to
    /// the loopback address the listener actually bound to.
    #[arg(long)]
    pub advertise_host: Option<String>,
}
