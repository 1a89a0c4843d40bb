use async_trait::async_trait;
use serde::Deserialize;
use serde_json::from_str;
use url::Url;

use super::aggregate::{LocationAttributes, LocationRecord};
use crate::errors::{ErrorLayer, Result, ToolError};

pub const DEFAULT_IPINFO_URL: &str = "http://ipinfo.io/";

/// Something that can tell us where an identifier lives.
///
/// Resolution can't fail from the caller's point of view: when a lookup goes
/// wrong the implementation logs why and hands back
/// `LocationAttributes::unknown()`, which the aggregator files under the
/// placeholder path like any other record.
#[async_trait]
pub trait LocationResolver {
    async fn resolve(&self, identifier: &str) -> LocationAttributes;
}

/// The subset of the ipinfo.io `/{ip}/json` payload we care about.  Bogon
/// addresses come back without any of these fields.
#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    country: Option<String>,
    region: Option<String>,
    city: Option<String>,
}

#[derive(Debug)]
pub struct IpInfoResolver {
    base_url: Url,
    client: reqwest::Client,
}

impl IpInfoResolver {
    fn lookup_url(&self, ip: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ToolError::sticky(
                    ErrorLayer::BadInput,
                    format!("'{}' cannot be used as a base URL", self.base_url),
                )
            })?
            .pop_if_empty()
            .push(ip)
            .push("json");
        Ok(url)
    }

    /// Look up `ip`, surfacing every failure.  `resolve` is the forgiving
    /// wrapper most callers want.
    pub async fn lookup(&self, ip: &str) -> Result<LocationAttributes> {
        let url = self.lookup_url(ip)?;
        trace!(%url, "ipinfo lookup");
        let res = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !res.status().is_success() {
            let message = format!("ipinfo status of {} for {}", res.status(), ip);
            if res.status().is_server_error() {
                return Err(ToolError::transient(ErrorLayer::ExternalLayer, message));
            }
            return Err(ToolError::sticky(ErrorLayer::ExternalLayer, message));
        }

        let raw_str = res.text().await?;
        let parsed: IpInfoResponse = match from_str(&raw_str) {
            Ok(parsed) => parsed,
            Err(err) => {
                return Err(ToolError::sticky(
                    ErrorLayer::ExternalLayer,
                    format!("ipinfo returned unparseable JSON for {}: {}", ip, err),
                ));
            }
        };

        Ok(LocationAttributes {
            country: parsed.country,
            region: parsed.region,
            city: parsed.city,
        })
    }
}

#[async_trait]
impl LocationResolver for IpInfoResolver {
    async fn resolve(&self, identifier: &str) -> LocationAttributes {
        match self.lookup(identifier).await {
            Ok(attributes) => attributes,
            Err(err) => {
                warn!(identifier, error = %err, "location lookup failed, filing as unknown");
                LocationAttributes::unknown()
            }
        }
    }
}

pub fn make_ipinfo_resolver(base_url: &str) -> Result<IpInfoResolver> {
    Ok(IpInfoResolver {
        base_url: Url::parse(base_url)?,
        client: reqwest::Client::new(),
    })
}

/// Resolve each identifier in turn.  Requests are issued one at a time; the
/// lists we feed this are short and ipinfo rate limits anonymous callers.
pub async fn resolve_all<R>(resolver: &R, identifiers: &[String]) -> Vec<LocationRecord>
where
    R: LocationResolver + Sync + ?Sized,
{
    let mut records = Vec::with_capacity(identifiers.len());
    for identifier in identifiers {
        let attributes = resolver.resolve(identifier).await;
        records.push(LocationRecord::new(identifier.clone(), attributes));
    }
    records
}

/// Parse a list of identifiers, one per line.  Blank lines and `#` comments
/// are skipped.
pub fn parse_identifier_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| match line.find('#') {
            Some(offset) => &line[..offset],
            None => line,
        })
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
