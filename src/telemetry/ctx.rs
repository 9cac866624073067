use anyhow::Result;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::{info, debug, warn, Span};

use super::emit;
use crate::output::types::Meta;
use crate::pipeline::types::RunTotals;

pub trait PhaseSpan {
    fn name(&self) -> &'static str;
    fn span(&self) -> Span;
}

pub trait OpMarker {
    const NAME: &'static str;
    type Phase: PhaseSpan;
    fn root_span() -> Span;
}

pub struct LogCtx<O: OpMarker> {
    json: bool,
    _marker: PhantomData<O>,
}

impl<O: OpMarker> LogCtx<O> {
    pub fn new(json: bool) -> Self { Self { json, _marker: PhantomData } }

    fn op_name(&self) -> &'static str { O::NAME }

    pub fn root_span(&self) -> Span { O::root_span() }

    pub fn root_span_kv<'a, T>(&self, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.root_span();
        let details = kv_to_string(fields);
        if details.is_empty() {
            info!(op = %self.op_name(), "start");
        } else {
            info!(op = %self.op_name(), details = %details, "start");
        }
        span
    }

    pub fn span(&self, ph: &O::Phase) -> Span { ph.span() }

    pub fn span_kv<'a, T>(&self, ph: &O::Phase, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.span(ph);
        let details = kv_to_string(fields);
        if details.is_empty() {
            debug!(op = %self.op_name(), phase = ph.name(), "span_start");
        } else {
            debug!(op = %self.op_name(), phase = ph.name(), details = %details, "span_start");
        }
        span
    }

    pub fn info(&self, msg: impl AsRef<str>) { if self.json { info!(op = %self.op_name(), "{}", msg.as_ref()); } else { info!("{}", msg.as_ref()); } }
    pub fn warn(&self, msg: impl AsRef<str>) { if self.json { warn!(op = %self.op_name(), "{}", msg.as_ref()); } else { warn!("{}", msg.as_ref()); } }

    pub fn info_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        if self.json { let details = kv_to_string(kv); info!(op = %self.op_name(), details = %details, "{}", msg); }
        else { info!("{}", msg); }
    }

    pub fn warn_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        if self.json { let details = kv_to_string(kv); warn!(op = %self.op_name(), details = %details, "{}", msg); }
        else { warn!("{}", msg); }
    }

    pub fn plan<T: Serialize>(&self, plan: &T) -> Result<()> { emit::print_plan(self.op_name(), plan, None) }
    pub fn result<T: Serialize>(&self, result: &T) -> Result<()> { emit::print_result(self.op_name(), result, None) }
    pub fn result_meta<T: Serialize>(&self, result: &T, meta: Meta) -> Result<()> { emit::print_result(self.op_name(), result, Some(meta)) }
}

// Run-specific helpers
impl LogCtx<crate::telemetry::ops::run::Run> {
    pub fn feed_summary(&self, source: &str, received: usize, kept: usize) {
        if self.json { info!(op = %self.op_name(), source, received, kept, "feed_summary"); }
        else { info!("[FEED] {} — received={} kept={}", source, received, kept); }
    }

    pub fn item_outcome(&self, title: &str, outcome: &str, bullets: usize, tags: usize) {
        if self.json { info!(op = %self.op_name(), title, outcome, bullets, tags, "item"); }
        else if outcome == "created" { info!("+ {} | bullets: {} tags: {}", title, bullets, tags); }
        else { info!("= SKIP ({}) | {}", outcome, title); }
    }

    pub fn totals(&self, t: &RunTotals) {
        if self.json {
            info!(op = %self.op_name(), created = t.created, considered = t.considered, skipped_exists = t.skipped_exists,
                  skipped_uncertain = t.skipped_uncertain, errors = t.errors, cancelled = t.cancelled, "run_totals");
        } else {
            info!("Done. Added {}/{} items.", t.created, t.considered);
            info!("   exists={} uncertain={} errors={} cancelled={}", t.skipped_exists, t.skipped_uncertain, t.errors, t.cancelled);
        }
    }
}

fn kv_to_string<'a, T>(kv: T) -> String
where
    T: IntoIterator<Item = (&'a str, String)>,
{
    let mut parts: Vec<String> = Vec::new();
    for (k, v) in kv { parts.push(format!("{}={}", k, v)); }
    parts.join(" ")
}
