use beacon::config::Config;
use beacon::http::request::Request;
use beacon::http::response::Response;
use beacon::server::{EchoSocket, Routes, listener};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let routes = Routes::new()
        .get("/", |_req: &Request<'_>| Response::ok("beacon is up\n"))
        .post("/echo", |req: &Request<'_>| Response::ok(req.body.to_vec()))
        .get("/ws", EchoSocket);

    tokio::select! {
        res = listener::run(&cfg, &routes) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
