//! Read-only cluster introspection
//!
//! Thin decoders over `/api/monitor` for the cluster FSID and the
//! monitor roster. Nothing here is reconciled; these are lookups.

use crate::error::Result;
use crate::session::Session;
use reqwest::Method;
use serde::Deserialize;

/// One monitor daemon as the monmap reports it
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Monitor {
    pub name: String,
    #[serde(default)]
    pub rank: i32,
    #[serde(default)]
    pub addr: String,
    #[serde(default)]
    pub public_addr: String,
}

#[derive(Debug, Deserialize)]
struct MonMap {
    #[serde(default)]
    fsid: String,
    #[serde(default)]
    mons: Vec<Monitor>,
}

#[derive(Debug, Deserialize)]
struct MonStatus {
    monmap: MonMap,
}

#[derive(Debug, Deserialize)]
struct MonitorResponse {
    mon_status: MonStatus,
}

async fn monitor_response(session: &Session) -> Result<MonitorResponse> {
    let body = session.execute(Method::GET, "/api/monitor", None).await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Fetch the cluster FSID
pub async fn cluster_fsid(session: &Session) -> Result<String> {
    Ok(monitor_response(session).await?.mon_status.monmap.fsid)
}

/// Fetch the monitor roster
pub async fn monitors(session: &Session) -> Result<Vec<Monitor>> {
    Ok(monitor_response(session).await?.mon_status.monmap.mons)
}
