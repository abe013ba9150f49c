//! The smallest microgate server: every request gets "hello world!".
//!
//! Set `MICROGATE_PORT`, `MICROGATE_INTERFACE` or `MICROGATE_DEBUG` to
//! change the defaults, and `RUST_LOG=debug` to see connection events.

use microgate::{from_fn, HttpResponse, HttpServer, ServerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ServerConfig::default().with_env_overrides()?;
    let app = from_fn(|_environ, responder| HttpResponse::from("hello world!").respond(responder));

    HttpServer::new(config, app).run_blocking()?;
    Ok(())
}
