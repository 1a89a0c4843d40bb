use liquid_core::Result;
use liquid_core::Runtime;
use liquid_core::{Display_filter, Filter, FilterReflection, ParseFilter};
use liquid_core::{Value, ValueView};
use regex::Regex;
use serde_json::to_string;

#[derive(Clone, ParseFilter, FilterReflection)]
#[filter(
    name = "json",
    description = "Render the provided value as single-line JSON, which doubles as a safely quoted YAML scalar.",
    parsed(JsonFilter)
)]
pub struct JsonFilterParser;

#[derive(Debug, Default, Display_filter)]
#[name = "json"]
struct JsonFilter;

impl Filter for JsonFilter {
    fn evaluate(&self, input: &dyn ValueView, _runtime: &dyn Runtime) -> Result<Value> {
        let s = to_string(&input.to_value()).unwrap_or_else(|_e| "".to_string());
        Ok(Value::scalar(s))
    }
}

#[derive(Clone, ParseFilter, FilterReflection)]
#[filter(
    name = "trim_slashes",
    description = "Collapse repeated slashes in a URL path fragment and strip the leading/trailing ones",
    parsed(TrimSlashesFilter)
)]
pub struct TrimSlashesFilterParser;

#[derive(Debug, Default, Display_filter)]
#[name = "trim_slashes"]
struct TrimSlashesFilter;

impl Filter for TrimSlashesFilter {
    fn evaluate(&self, input: &dyn ValueView, _runtime: &dyn Runtime) -> Result<Value> {
        lazy_static! {
            static ref RE_REPEATED_SLASHES: Regex = Regex::new(r"/{2,}").unwrap();
        }

        let s = input.to_kstr();
        let collapsed = RE_REPEATED_SLASHES.replace_all(s.trim(), "/");
        Ok(Value::scalar(collapsed.trim_matches('/').to_string()))
    }
}
