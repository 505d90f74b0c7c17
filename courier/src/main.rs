use std::{io::Write, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use courier_core::http::{Body, RequestHandler};
use courier_services::{ErrorResponder, RouterKernelFactory};
use http::{Method, Request};
use service_async::MakeService;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;

mod config;
mod demo;

/// Dispatches a single request through the router kernel and prints the
/// response.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path of the config file; the demo routes are used when absent
    #[clap(short, long, value_parser)]
    config: Option<String>,

    #[clap(short = 'X', long, default_value = "GET")]
    method: String,

    /// Extra request header, as `name: value`
    #[clap(short = 'H', long = "header")]
    headers: Vec<String>,

    #[clap(short, long)]
    body: Option<String>,

    url: String,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::demo(),
    };
    let kernel = RouterKernelFactory::new(&config, Arc::new(demo::container()))
        .make()
        .context("failed to build the route table")?;
    let kernel = ErrorResponder(kernel);

    let request = build_request(&args)?;
    let response = kernel.handle(request)?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "{:?} {}", response.version(), response.status())?;
    for (name, value) in response.headers() {
        writeln!(out, "{name}: {}", value.to_str().unwrap_or("<binary>"))?;
    }
    writeln!(out)?;
    out.write_all(&response.into_body().into_bytes()?)?;
    writeln!(out)?;
    Ok(())
}

fn build_request(args: &Args) -> Result<Request<Body>> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method {}", args.method))?;
    let mut builder = Request::builder().method(method).uri(&args.url);
    for header in &args.headers {
        let Some((name, value)) = header.split_once(':') else {
            bail!("malformed header {header:?}, expected `name: value`");
        };
        builder = builder.header(name.trim(), value.trim());
    }
    let body = args.body.clone().map_or(Body::Empty, Body::from);
    Ok(builder.body(body)?)
}
