//! services/web/src/web/render.rs
//!
//! Thin wrapper around the template engine. Templates are compiled into the
//! binary and parsed once at startup.

use axum::response::Html;
use minijinja::Environment;
use serde::Serialize;

use crate::web::error::AppError;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("overview.html", include_str!("../../templates/overview.html")),
    ("destinations.html", include_str!("../../templates/destinations.html")),
    ("stories.html", include_str!("../../templates/stories.html")),
    ("tour.html", include_str!("../../templates/tour.html")),
    ("account.html", include_str!("../../templates/account.html")),
    ("info.html", include_str!("../../templates/info.html")),
    ("error.html", include_str!("../../templates/error.html")),
];

pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    /// Parses every page template; a syntax error fails startup.
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, template: &str, context: S) -> Result<Html<String>, AppError> {
        let html = self.env.get_template(template)?.render(context)?;
        Ok(Html(html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_template_compiles_and_escapes_input() {
        let renderer = Renderer::new().unwrap();
        let Html(html) = renderer
            .render("info.html", json!({ "title": "<About>", "page": "about" }))
            .unwrap();
        assert!(html.contains("&lt;About&gt;"));
    }

    #[test]
    fn unknown_templates_are_internal_errors() {
        let renderer = Renderer::new().unwrap();
        let err = renderer.render("missing.html", json!({})).unwrap_err();
        assert!(!err.is_operational());
    }
}
