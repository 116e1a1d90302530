//! `${name}` placeholders in configured replacement text

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::params::ParameterSet;

static VAR_REGEX: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("Invalid regex pattern"));

/// Values available to replacement text during one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables(HashMap<String, String>);

impl Variables {
    pub fn for_run(params: &ParameterSet, header: &str, header_full: &str) -> Self {
        let mut vars = HashMap::new();
        vars.insert("team".to_string(), params.team().to_string());
        vars.insert("rival".to_string(), params.rival().to_string());
        vars.insert("venue".to_string(), params.field().code().to_string());
        vars.insert("sample_size".to_string(), params.sample_size().to_string());
        vars.insert("season".to_string(), params.season().to_string());
        vars.insert("competition".to_string(), params.competition().to_string());
        vars.insert("header".to_string(), header.to_string());
        vars.insert("header_full".to_string(), header_full.to_string());
        Self(vars)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Substitute known placeholders; unknown ones are left as written
    pub fn expand(&self, text: &str) -> String {
        VAR_REGEX
            .replace_all(text, |caps: &regex::Captures<'_>| {
                self.get(caps[1].trim())
                    .map(str::to_string)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
