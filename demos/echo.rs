//! Echo the request back to the client.
//!
//! `GET /environ` returns the request variables as JSON; any other request
//! has its body streamed back in chunks, without a `Content-Length`, so the
//! connection closes after the response.

use std::io::Write;
use microgate::{body, from_fn, HttpResponse, HttpServer, ServerConfig, StatusCode};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ServerConfig::default().with_env_overrides()?;

    let app = from_fn(|environ, responder| {
        if environ.path == "/environ" {
            return HttpResponse::new(StatusCode::Ok)
                .with_json(environ.vars())?
                .respond(responder);
        }

        let input = environ.read_input()?;
        if input.is_empty() {
            writeln!(environ.errors, "{} {} sent no body", environ.method, environ.target)?;
        }
        let content_type = environ
            .var("CONTENT_TYPE")
            .unwrap_or("application/octet-stream")
            .to_string();
        responder.start("200 OK", vec![("Content-Type".to_string(), content_type)])?;

        let chunks: Vec<Vec<u8>> = input.chunks(16).map(<[u8]>::to_vec).collect();
        Ok(body::from_chunks(chunks))
    });

    let server = HttpServer::new(config, app);
    server.start().await?;
    Ok(())
}
