use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Canon;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Canonicalize }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self { Phase::Canonicalize => "canonicalize" } }
    fn span(&self) -> Span { match self { Phase::Canonicalize => info_span!("canonicalize") } }
}

impl OpMarker for Canon {
    const NAME: &'static str = "canon";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("canon") }
}
