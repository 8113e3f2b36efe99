//! Serves the current directory on localhost and the local network.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin serve          # Port 8080
//! cargo run --bin serve -- 3000  # Custom port
//! ```

use std::{env, error::Error};

use daily_record_server::{parse_port, serve};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let port = parse_port(env::args().nth(1))?;

    serve(port).await
}
