use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Run;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Plan, Feed, Item, Extract, Enrich, Publish }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Plan => "plan",
        Phase::Feed => "feed",
        Phase::Item => "item",
        Phase::Extract => "extract",
        Phase::Enrich => "enrich",
        Phase::Publish => "publish",
    }}
    fn span(&self) -> Span { match self {
        Phase::Plan => info_span!("plan"),
        Phase::Feed => info_span!("feed"),
        Phase::Item => info_span!("item"),
        Phase::Extract => info_span!("extract"),
        Phase::Enrich => info_span!("enrich"),
        Phase::Publish => info_span!("publish"),
    }}
}

impl OpMarker for Run {
    const NAME: &'static str = "run";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("run") }
}
