// OS byte counters via sysinfo.

use super::{CounterError, CounterSource};
use serde::Serialize;
use sysinfo::Networks;

/// Which interfaces contribute to the totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterFilter {
    All,
    Named(String),
}

impl AdapterFilter {
    /// "All" (any case) or an empty string selects every interface.
    pub fn from_config(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            AdapterFilter::All
        } else {
            AdapterFilter::Named(value.to_string())
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            AdapterFilter::All => !is_loopback(name),
            AdapterFilter::Named(wanted) => wanted == name,
        }
    }
}

fn is_loopback(name: &str) -> bool {
    name == "lo" || name == "lo0" || name.starts_with("Loopback Pseudo-Interface")
}

pub struct SysinfoCounters {
    networks: Networks,
    filter: AdapterFilter,
}

impl SysinfoCounters {
    pub fn new(filter: AdapterFilter) -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            filter,
        }
    }
}

impl CounterSource for SysinfoCounters {
    fn read_totals(&mut self) -> Result<(u64, u64), CounterError> {
        self.networks.refresh(true);
        let mut seen = false;
        let mut sent: u64 = 0;
        let mut recv: u64 = 0;
        for (name, data) in self.networks.list() {
            if !self.filter.matches(name) {
                continue;
            }
            seen = true;
            sent = sent.saturating_add(data.total_transmitted());
            recv = recv.saturating_add(data.total_received());
        }
        if !seen {
            return Err(match &self.filter {
                AdapterFilter::All => CounterError::NoInterfaces,
                AdapterFilter::Named(name) => CounterError::AdapterNotFound(name.clone()),
            });
        }
        Ok((sent, recv))
    }
}

/// Interface as listed for adapter selection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterInfo {
    pub name: String,
    pub mac_address: String,
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
    pub total_sent: u64,
    pub total_recv: u64,
}

/// Non-loopback interfaces, sorted by name. Blocking; call from spawn_blocking.
pub fn list_adapters() -> Vec<AdapterInfo> {
    let networks = Networks::new_with_refreshed_list();
    let mut out: Vec<AdapterInfo> = networks
        .list()
        .iter()
        .filter(|(name, _)| !is_loopback(name))
        .map(|(name, data)| AdapterInfo {
            name: name.clone(),
            mac_address: data.mac_address().to_string(),
            ipv4: data
                .ip_networks()
                .iter()
                .filter(|n| n.addr.is_ipv4())
                .map(|n| n.addr.to_string())
                .collect(),
            ipv6: data
                .ip_networks()
                .iter()
                .filter(|n| n.addr.is_ipv6())
                .map(|n| n.addr.to_string())
                .collect(),
            total_sent: data.total_transmitted(),
            total_recv: data.total_received(),
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}
