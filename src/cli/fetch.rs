//! Fetch a URL through the cache router

use colored::Colorize;
use reqwest::Url;
use serde::Serialize;

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::error::{FetchError, Result};
use crate::output::json::print_json;
use crate::output::table::format_fields;
use crate::router::{ResponseKind, RouteRequest, ServedFrom, Strategy, classify};

#[derive(Debug, Serialize)]
struct FetchReport {
    url: String,
    strategy: Strategy,
    status: u16,
    kind: ResponseKind,
    served_from: ServedFrom,
    content_type: Option<String>,
    bytes: usize,
    body: Option<String>,
}

pub async fn run(opts: &GlobalOptions, url: &str, navigate: bool, image: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let parsed =
        Url::parse(url).map_err(|e| FetchError::UnsupportedUri(format!("{} ({})", url, e)))?;

    let request = if navigate {
        RouteRequest::navigate(parsed)
    } else if image {
        RouteRequest::image(parsed)
    } else {
        RouteRequest::get(parsed)
    };

    let router = ctx.router()?;
    router.ensure_active().await?;
    let strategy = classify(&request, &ctx.origin()?);
    let response = router.handle(request).await;
    router.settle().await;

    let text = std::str::from_utf8(&response.body).ok().map(str::to_string);
    let report = FetchReport {
        url: url.to_string(),
        strategy,
        status: response.status,
        kind: response.kind,
        served_from: response.served_from,
        content_type: response.header("content-type").map(str::to_string),
        bytes: response.body.len(),
        body: if image { None } else { text },
    };

    if ctx.format.is_json() {
        return print_json(&report);
    }

    let mark = if response.kind == ResponseKind::Error || report.status >= 400 {
        "✗".red()
    } else {
        "✓".green()
    };
    println!("{} {} {}", mark, report.status, report.url);
    println!(
        "{}",
        format_fields(&[
            ("Strategy", format!("{:?}", report.strategy)),
            ("Kind", report.kind.as_str().to_string()),
            ("Served from", format!("{:?}", report.served_from).to_lowercase()),
            ("Bytes", report.bytes.to_string()),
        ])
    );
    if let Some(body) = &report.body
        && !body.is_empty()
    {
        println!("\n{}", body);
    }
    Ok(())
}
