//! Page-level side channel for content that has no place inline in the
//! article tree: `<style>` blocks and `<script>` resources.

use log::{debug, info};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScriptSource {
    Src(String),
    Inline(String),
}

/// Receives side effects found during a transform pass.
pub trait HeadSink {
    fn inject_style(&mut self, css: &str);
    fn load_script(&mut self, script: ScriptSource);
}

/// Sink that drops everything. Handy when only the tree matters.
#[derive(Debug, Default)]
pub struct NullHead;

impl HeadSink for NullHead {
    fn inject_style(&mut self, _css: &str) {}
    fn load_script(&mut self, _script: ScriptSource) {}
}

/// Collected stylesheet blocks and registered scripts for the whole app.
///
/// Transform passes run again on every change, so the same block is seen many
/// times. Each distinct block is kept once. Entries live for the session:
/// closing a pane keeps what its article contributed, and reopening it adds
/// nothing new. There is no script engine in a
/// terminal: with loading enabled a script is registered and logged, never run.
#[derive(Debug, Default)]
pub struct PageHead {
    styles: Vec<String>,
    seen_styles: HashSet<String>,
    scripts: Vec<ScriptSource>,
    seen_scripts: HashSet<ScriptSource>,
    load_scripts: bool,
}

impl PageHead {
    pub fn new(load_scripts: bool) -> Self {
        Self {
            load_scripts,
            ..Self::default()
        }
    }

    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    pub fn scripts(&self) -> &[ScriptSource] {
        &self.scripts
    }
}

impl HeadSink for PageHead {
    fn inject_style(&mut self, css: &str) {
        if css.trim().is_empty() || self.seen_styles.contains(css) {
            return;
        }
        debug!("Injecting stylesheet block ({} bytes)", css.len());
        self.seen_styles.insert(css.to_string());
        self.styles.push(css.to_string());
    }

    fn load_script(&mut self, script: ScriptSource) {
        if !self.load_scripts {
            debug!("Script loading disabled, skipping {script:?}");
            return;
        }
        if self.seen_scripts.contains(&script) {
            return;
        }
        match &script {
            ScriptSource::Src(url) => info!("Registered script resource {url}"),
            ScriptSource::Inline(text) => {
                info!("Registered inline script ({} bytes)", text.len())
            }
        }
        self.seen_scripts.insert(script.clone());
        self.scripts.push(script);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_blocks_are_kept_once() {
        let mut head = PageHead::new(false);
        head.inject_style(".a { color: red }");
        head.inject_style(".a { color: red }");
        head.inject_style(".b { color: blue }");
        head.inject_style("   ");

        assert_eq!(head.styles().len(), 2);
    }

    #[test]
    fn scripts_ignored_unless_enabled() {
        let mut head = PageHead::new(false);
        head.load_script(ScriptSource::Src("/x.js".into()));
        assert!(head.scripts().is_empty());

        let mut head = PageHead::new(true);
        head.load_script(ScriptSource::Src("/x.js".into()));
        head.load_script(ScriptSource::Src("/x.js".into()));
        head.load_script(ScriptSource::Inline("alert(1)".into()));
        assert_eq!(head.scripts().len(), 2);
    }
}
