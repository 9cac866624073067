use std::io::{self, Write};

use super::config::OutputConfig;
use super::types::Envelope;

/// Writes one envelope per call; compact JSON is a single line.
pub struct JsonPresenter { pub pretty: bool }

impl JsonPresenter {
    pub fn emit(&self, env: &Envelope, w: &mut dyn Write) -> io::Result<()> {
        if self.pretty { serde_json::to_writer_pretty(&mut *w, env)?; } else { serde_json::to_writer(&mut *w, env)?; }
        writeln!(w)
    }
}

pub struct Emitter {
    presenter: JsonPresenter,
}

impl Emitter {
    pub fn from_config(cfg: OutputConfig) -> Self {
        Emitter { presenter: JsonPresenter { pretty: cfg.pretty } }
    }

    pub fn emit(&self, env: &Envelope) -> io::Result<()> {
        let mut out = io::stdout();
        self.presenter.emit(env, &mut out)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compact_json_is_one_line() {
        let env = Envelope::result("canon", &json!({"urls": []}), None).unwrap();
        let mut buf = Vec::new();
        JsonPresenter { pretty: false }.emit(&env, &mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert_eq!(s.matches('\n').count(), 1);
        assert!(s.contains("\"op\":\"canon\""));
    }

    #[test]
    fn pretty_json_spans_lines_and_keeps_plan_body() {
        let env = Envelope::plan("run", &json!({"feeds": 2}), None).unwrap();
        let mut buf = Vec::new();
        JsonPresenter { pretty: true }.emit(&env, &mut buf).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v["op"], "run");
        assert_eq!(v["plan"]["feeds"], 2);
        assert!(buf.iter().filter(|b| **b == b'\n').count() > 1);
    }
}
