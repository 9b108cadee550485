//! Master contract endpoint and the instrument directory built on it.

use std::collections::HashMap;

use crate::client::AntClient;
use crate::constants::{MASTER_CONTRACT_PATH, SEGMENT_FUTURES, SEGMENT_INDICES, SEGMENT_OPTIONS};
use crate::error::Result;
use crate::provider::InstrumentDirectory;
use crate::types::enums::Exchange;
use crate::types::instrument::{ContractEntry, Instrument};

/// Master contracts of one exchange, keyed by segment (e.g. `"NSE-OPT"`).
pub type MasterContracts = HashMap<String, Vec<ContractEntry>>;

impl AntClient {
    /// Download every tradable contract of an exchange.
    ///
    /// **Endpoint:** `GET /api/v2/contracts.json?exchanges={exchange}`
    pub async fn get_master_contracts(&self, exchange: Exchange) -> Result<MasterContracts> {
        self.get(MASTER_CONTRACT_PATH, &[("exchanges", exchange.as_str())])
            .await
    }
}

/// [`InstrumentDirectory`] backed by the master contract endpoint.
///
/// Loads the NSE indices plus the NFO options and futures whose symbol
/// starts with one of the configured underlyings.
#[derive(Debug, Clone)]
pub struct MasterContractDirectory {
    client: AntClient,
    underlyings: Vec<String>,
}

impl MasterContractDirectory {
    /// Directory for the `BANKNIFTY` and `NIFTY` derivatives.
    pub fn new(client: AntClient) -> Self {
        Self::with_underlyings(client, ["BANKNIFTY", "NIFTY"])
    }

    pub fn with_underlyings<I, S>(client: AntClient, underlyings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client,
            underlyings: underlyings.into_iter().map(Into::into).collect(),
        }
    }

    fn wanted(&self, entry: &ContractEntry) -> bool {
        self.underlyings
            .iter()
            .any(|u| entry.symbol.starts_with(u.as_str()))
    }
}

/// Convert entries, skipping the ones that do not describe an instrument.
fn collect_instruments<'a>(
    entries: impl Iterator<Item = &'a ContractEntry>,
    out: &mut Vec<Instrument>,
) {
    for entry in entries {
        match Instrument::from_contract(entry) {
            Ok(inst) => out.push(inst),
            Err(e) => tracing::debug!(symbol = %entry.symbol, error = %e, "Skipping contract"),
        }
    }
}

impl InstrumentDirectory for MasterContractDirectory {
    async fn instruments(&self) -> Result<Vec<Instrument>> {
        let nse = self.client.get_master_contracts(Exchange::NSE).await?;
        let nfo = self.client.get_master_contracts(Exchange::NFO).await?;

        let mut out = Vec::new();
        if let Some(indices) = nse.get(SEGMENT_INDICES) {
            collect_instruments(indices.iter(), &mut out);
        }
        for segment in [SEGMENT_OPTIONS, SEGMENT_FUTURES] {
            if let Some(entries) = nfo.get(segment) {
                collect_instruments(entries.iter().filter(|e| self.wanted(e)), &mut out);
            }
        }

        tracing::info!(count = out.len(), "Loaded master contracts");
        Ok(out)
    }
}
