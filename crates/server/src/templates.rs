use std::sync::Arc;

use tera::Tera;
use tracing::warn;

const TEMPLATE_GLOB: &str = "templates/**/*.html";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("dashboard/index.html", include_str!("../templates/dashboard/index.html")),
    ("email/new_request.html", include_str!("../templates/email/new_request.html")),
];

/// Loads templates from `./templates` when present; anything missing falls back to the
/// copies compiled into the binary.
pub fn load() -> Arc<Tera> {
    let mut tera = match Tera::new(TEMPLATE_GLOB) {
        Ok(tera) => tera,
        Err(error) => {
            warn!(
                event_name = "system.templates.fallback",
                error = %error,
                "failed to load templates from filesystem, using embedded copies"
            );
            Tera::default()
        }
    };

    for (name, source) in BUILTIN_TEMPLATES {
        if tera.get_template_names().any(|loaded| loaded == *name) {
            continue;
        }
        if let Err(error) = tera.add_raw_template(name, source) {
            warn!(
                event_name = "system.templates.invalid",
                template = name,
                error = %error,
                "embedded template failed to parse"
            );
        }
    }

    Arc::new(tera)
}
