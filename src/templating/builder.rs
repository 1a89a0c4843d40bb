use std::borrow;

use include_dir::{include_dir, Dir};
use liquid::Template;

use super::liquid_exts::{JsonFilterParser, TrimSlashesFilterParser};
use crate::errors::{ErrorLayer, Result, ToolError};

static TEMPLATE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/templates");

pub const COMPOSE_TEMPLATE: &str = "docker_compose.yaml.liquid";
pub const PROXY_BASE_TEMPLATE: &str = "nginx_base.liquid";
pub const PROXY_LOCATION_TEMPLATE: &str = "nginx_location.liquid";
pub const PROXY_CLIENTS_HEADER_TEMPLATE: &str = "nginx_clients_header.liquid";

/// Lets templates `{% include %}` any other file from the embedded
/// `templates/` directory.
#[derive(Default, Debug, Clone, Copy)]
struct StaticTemplateSource;

impl liquid::partials::PartialSource for StaticTemplateSource {
    fn contains(&self, name: &str) -> bool {
        TEMPLATE_DIR.get_file(name).is_some()
    }

    fn names(&self) -> Vec<&str> {
        TEMPLATE_DIR
            .files()
            .filter_map(|file| file.path().to_str())
            .collect()
    }

    fn try_get<'a>(&'a self, name: &str) -> Option<borrow::Cow<'a, str>> {
        match TEMPLATE_DIR.get_file(name) {
            Some(file) => file.contents_utf8().map(borrow::Cow::from),
            _ => None,
        }
    }
}

pub fn build_and_parse(s: &str) -> Result<Template> {
    let parser = liquid::ParserBuilder::with_stdlib()
        .filter(JsonFilterParser)
        .filter(TrimSlashesFilterParser)
        .partials(liquid::partials::LazyCompiler::<StaticTemplateSource>::empty())
        .build()?;
    Ok(parser.parse(s)?)
}

pub fn embedded_template_source(name: &str) -> Result<&'static str> {
    TEMPLATE_DIR
        .get_file(name)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| {
            ToolError::sticky(
                ErrorLayer::ConfigLayer,
                format!("No embedded template named '{}'", name),
            )
        })
}

pub fn build_and_parse_embedded(name: &str) -> Result<Template> {
    build_and_parse(embedded_template_source(name)?)
}

pub fn render(template: &Template, globals: &liquid::Object) -> Result<String> {
    Ok(template.render(globals)?)
}
