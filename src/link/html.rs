//! Asset lists for HTML generation

use serde::{Deserialize, Serialize};

/// Script and stylesheet URLs a page loads, in load order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlAssets {
    pub js: Vec<String>,
    pub css: Vec<String>,
}

impl HtmlAssets {
    /// Put cached artifacts ahead of `existing`, so vendor code loads first
    pub fn prepend_artifacts(names: &[String], public_path: &str, existing: HtmlAssets) -> Self {
        let mut assets = Self::default();
        for name in names {
            match name.rsplit('.').next() {
                Some("js") => assets.js.push(join_url(public_path, name)),
                Some("css") => assets.css.push(join_url(public_path, name)),
                _ => {}
            }
        }
        assets.js.extend(existing.js);
        assets.css.extend(existing.css);
        assets
    }
}

/// Join a public path and an artifact name with exactly one `/`
pub fn join_url(public_path: &str, name: &str) -> String {
    if public_path.is_empty() {
        return name.to_string();
    }
    format!(
        "{}/{}",
        public_path.trim_end_matches('/'),
        name.trim_start_matches('/')
    )
}
