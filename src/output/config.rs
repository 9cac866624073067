use std::env;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    pub pretty: bool,
}

impl OutputConfig {
    /// NEWS_OUTPUT_PRETTY=1|true|yes indents the envelope.
    pub fn from_env() -> Self {
        Self::resolve(env::var("NEWS_OUTPUT_PRETTY").ok().as_deref())
    }

    fn resolve(pretty: Option<&str>) -> Self {
        let pretty = match pretty {
            Some(v) => v.eq_ignore_ascii_case("1") || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"),
            None => false,
        };
        OutputConfig { pretty }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_accepts_truthy_values() {
        assert!(OutputConfig::resolve(Some("YES")).pretty);
        assert!(OutputConfig::resolve(Some("1")).pretty);
        assert!(!OutputConfig::resolve(Some("0")).pretty);
        assert!(!OutputConfig::resolve(None).pretty);
    }
}
