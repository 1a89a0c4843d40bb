extern crate serde;
extern crate serde_json;

#[macro_use]
extern crate lazy_static;
extern crate liquid;
extern crate regex;
#[macro_use]
extern crate tracing;
extern crate tracing_subscriber;
extern crate uuid;

pub mod config;
pub mod deploy;
pub mod errors;
pub mod geo;
pub mod logging;
pub mod proxy_config;
pub mod runner;
pub mod schema;
pub mod scrape;
pub mod store;
pub mod templating;
pub mod utils;
