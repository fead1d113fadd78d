use std::net::{AddrParseError, IpAddr, SocketAddr};

use clap::Parser;
use log::info;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on. Defaults to the IPv4 loopback.
    #[arg(short, long)]
    address: Option<String>,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 8000, env = "PORT")]
    port: u16,
}

impl Args {
    fn addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.address
            .as_deref()
            .unwrap_or("127.0.0.1")
            .parse()
            .map(|addr: IpAddr| (addr, self.port).into())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let args = Args::parse();
    let addr = args.addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{addr}{}", mock_server::API_PREFIX);
    mock_server::run(listener).await?;
    Ok(())
}
