//! Sentinel master group discovery
//!
//! Unlike the capability probes, discovery here is something the caller asked
//! for explicitly, so failures are surfaced. Two replies are rewritten into
//! dedicated errors: "unknown command" (this is not a sentinel) and ACL denials.

use futures::future::try_join_all;
use redis::Value;
use tracing::debug;

use super::models::{SentinelMasterGroup, SentinelMasterStatus};
use super::prober::args;
use crate::client::{CommandClient, Endpoint};
use crate::error::{CoreError, ReplyError, ReplyErrorKind, Result};
use crate::reply::{pair_field, value_as_array, value_as_i64, value_as_pairs, value_as_str};

fn discovery_error(err: ReplyError) -> CoreError {
    match err.kind() {
        ReplyErrorKind::UnknownCommand => CoreError::WrongDiscoveryTool(format!(
            "the endpoint is not a sentinel, connect to it directly instead ({})",
            err
        )),
        ReplyErrorKind::NoPermission => CoreError::Forbidden(err.to_string()),
        _ => CoreError::Reply(err),
    }
}

/// Every master group monitored by the sentinel behind `client`
pub async fn determine_sentinel_master_groups(
    client: &dyn CommandClient,
) -> Result<Vec<SentinelMasterGroup>> {
    let reply = client
        .send_command(&args(&["SENTINEL", "MASTERS"]))
        .await
        .map_err(discovery_error)?;

    let masters = value_as_array(&reply)
        .unwrap_or_default()
        .iter()
        .map(parse_master)
        .collect::<Result<Vec<_>>>()?;

    let groups = try_join_all(masters.into_iter().map(|master| async move {
        let endpoints = get_master_endpoints(client, &master.name).await?;
        Ok::<_, CoreError>(SentinelMasterGroup {
            name: master.name,
            host: master.host,
            port: master.port,
            status: master.status,
            endpoints,
            number_of_replicas: master.number_of_replicas,
        })
    }))
    .await?;

    debug!(count = groups.len(), "Discovered sentinel master groups");
    Ok(groups)
}

/// The probing sentinel plus every companion sentinel watching `master_name`
pub async fn get_master_endpoints(
    client: &dyn CommandClient,
    master_name: &str,
) -> Result<Vec<Endpoint>> {
    let reply = client
        .send_command(&args(&["SENTINEL", "SENTINELS", master_name]))
        .await
        .map_err(discovery_error)?;

    let mut endpoints = vec![client.endpoint()];
    for entry in value_as_array(&reply).unwrap_or_default() {
        endpoints.push(parse_address(entry)?);
    }
    Ok(endpoints)
}

struct MasterEntry {
    name: String,
    host: String,
    port: u16,
    status: SentinelMasterStatus,
    number_of_replicas: u32,
}

fn parse_master(entry: &Value) -> Result<MasterEntry> {
    let pairs = value_as_pairs(entry);
    let name = pair_field(&pairs, "name")
        .and_then(|v| value_as_str(&v))
        .ok_or_else(|| CoreError::Parse("sentinel master entry without a name".to_string()))?;
    let address = parse_address(entry)?;
    let flags = pair_field(&pairs, "flags")
        .and_then(|v| value_as_str(&v))
        .unwrap_or_default();
    let number_of_replicas = pair_field(&pairs, "num-slaves")
        .and_then(|v| value_as_i64(&v))
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0);

    Ok(MasterEntry {
        name,
        host: address.host,
        port: address.port,
        status: if flags == "master" {
            SentinelMasterStatus::Active
        } else {
            SentinelMasterStatus::Inactive
        },
        number_of_replicas,
    })
}

fn parse_address(entry: &Value) -> Result<Endpoint> {
    let pairs = value_as_pairs(entry);
    let host = pair_field(&pairs, "ip").and_then(|v| value_as_str(&v));
    let port = pair_field(&pairs, "port")
        .and_then(|v| value_as_i64(&v))
        .and_then(|p| u16::try_from(p).ok());
    match (host, port) {
        (Some(host), Some(port)) => Ok(Endpoint::new(host, port)),
        _ => Err(CoreError::Parse(
            "sentinel entry without a usable ip/port".to_string(),
        )),
    }
}
