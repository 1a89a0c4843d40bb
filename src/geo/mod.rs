pub mod aggregate;
pub mod resolver;

pub use aggregate::{
    aggregate, group_locations, AggregateOptions, LocationAttributes, LocationGrouping,
    LocationPath, LocationRecord, KEY_SEPARATOR, UNKNOWN_PLACEHOLDER,
};
pub use resolver::{
    make_ipinfo_resolver, parse_identifier_list, resolve_all, IpInfoResolver, LocationResolver,
    DEFAULT_IPINFO_URL,
};
