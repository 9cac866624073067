use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Cache;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Plan, List, Clear }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self { Phase::Plan => "plan", Phase::List => "list", Phase::Clear => "clear" } }
    fn span(&self) -> Span { match self { Phase::Plan => info_span!("plan"), Phase::List => info_span!("list"), Phase::Clear => info_span!("clear") } }
}

impl OpMarker for Cache {
    const NAME: &'static str = "cache";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("cache") }
}
