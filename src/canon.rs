use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::telemetry::{self};
use crate::telemetry::ops::canon::Phase as CanonPhase;
use crate::util::url::{canonicalize, stable_id};

/// news-agent canon: show the canonical form and stable id of URLs
#[derive(Args)]
pub struct CanonCmd {
    #[arg(required = true)]
    pub urls: Vec<String>,
}

#[derive(Serialize)]
struct CanonRow {
    input: String,
    canonical: String,
    uid: String,
}

pub async fn run(args: CanonCmd) -> Result<()> {
    let log = telemetry::canon();
    let _g = log.root_span_kv([("urls", args.urls.len().to_string())]).entered();
    let _s = log.span(&CanonPhase::Canonicalize).entered();

    let rows: Vec<CanonRow> = args.urls.into_iter().map(row).collect();
    if telemetry::config::json_mode() {
        #[derive(Serialize)]
        struct CanonResult { urls: Vec<CanonRow> }
        log.result(&CanonResult { urls: rows })?;
    } else {
        for r in &rows {
            log.info(format!("{}  {}", r.uid, r.canonical));
        }
    }
    Ok(())
}

fn row(input: String) -> CanonRow {
    let canonical = canonicalize(input.trim());
    let uid = stable_id(&canonical);
    CanonRow { input, canonical, uid }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_variants_share_a_uid() {
        let a = row("https://example.com/post?utm_source=x".into());
        let b = row("  https://EXAMPLE.com/post/#top ".into());
        assert_eq!(a.canonical, "https://example.com/post");
        assert_eq!(a.uid, b.uid);
        assert_eq!(b.input, "  https://EXAMPLE.com/post/#top ");
    }
}
