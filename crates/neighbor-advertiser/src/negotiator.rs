//! Responder negotiation with the Ferret service
//!
//! Candidates are tried strictly in order. The first one that answers with a
//! responder address wins; every failure is logged and the next candidate is
//! tried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::dump::DiagnosticDump;
use crate::error::{AdvertiserError, Result, TransportFailure};
use crate::types::{NeighborAdvertiserSlice, NegotiationResult};

/// Default HTTP port of the Ferret service
pub const DEFAULT_FERRET_PORT: u16 = 85;

/// Default per-candidate request timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2000;

/// Resource path under which slices are posted
pub const SLICES_PATH: &str = "/Ferret/NeighborAdvertiser/Slices";

/// Builds the endpoint a slice for `switch_name` is posted to.
pub fn endpoint_url(host: &str, port: u16, switch_name: &str) -> String {
    format!("http://{host}:{port}{SLICES_PATH}/{switch_name}")
}

/// Splits a comma separated candidate list, dropping empty items.
pub fn parse_candidates(list: &str) -> Result<Vec<String>> {
    let candidates: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    if candidates.is_empty() {
        return Err(AdvertiserError::NoCandidates);
    }
    Ok(candidates)
}

/// Delivers a slice to one candidate endpoint.
#[async_trait]
pub trait SliceTransport: Send + Sync {
    async fn post_slice(
        &self,
        url: &str,
        slice: &NeighborAdvertiserSlice,
    ) -> std::result::Result<NegotiationResult, TransportFailure>;
}

/// reqwest backed transport
#[derive(Debug, Clone)]
pub struct HttpSliceTransport {
    client: Client,
}

impl HttpSliceTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdvertiserError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

fn request_failure(e: reqwest::Error) -> TransportFailure {
    if e.is_timeout() {
        TransportFailure::Timeout
    } else {
        TransportFailure::Request(e.to_string())
    }
}

#[async_trait]
impl SliceTransport for HttpSliceTransport {
    async fn post_slice(
        &self,
        url: &str,
        slice: &NeighborAdvertiserSlice,
    ) -> std::result::Result<NegotiationResult, TransportFailure> {
        let response = self
            .client
            .post(url)
            .json(slice)
            .send()
            .await
            .map_err(request_failure)?;

        let status = response.status();
        let body = response.text().await.map_err(request_failure)?;

        if !status.is_success() {
            return Err(TransportFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| TransportFailure::InvalidResponse(e.to_string()))
    }
}

/// A successful negotiation
#[derive(Debug, Clone, PartialEq)]
pub struct Negotiated {
    /// Candidate that produced the answer
    pub candidate: String,
    pub result: NegotiationResult,
}

impl Negotiated {
    /// Responder address in dotted form
    pub fn responder(&self) -> String {
        self.result.ipv4_addr.to_string()
    }
}

/// Sequential failover negotiator
pub struct Negotiator<'a> {
    transport: &'a dyn SliceTransport,
    port: u16,
    dump: DiagnosticDump,
}

impl<'a> Negotiator<'a> {
    pub fn new(transport: &'a dyn SliceTransport) -> Self {
        Self {
            transport,
            port: DEFAULT_FERRET_PORT,
            dump: DiagnosticDump::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_dump(mut self, dump: DiagnosticDump) -> Self {
        self.dump = dump;
        self
    }

    /// Obtains a responder address from the first candidate that answers.
    ///
    /// The request snapshot is written before the first attempt and the
    /// response snapshot after a success. Snapshot failures are logged and
    /// never abort the negotiation.
    pub async fn negotiate(
        &self,
        slice: &NeighborAdvertiserSlice,
        candidates: &[String],
    ) -> Result<Negotiated> {
        if candidates.is_empty() {
            return Err(AdvertiserError::NoCandidates);
        }

        if let Err(e) = self.dump.save_request(slice) {
            warn!("Could not save request snapshot: {}", e);
        }

        for candidate in candidates {
            match self.try_candidate(candidate, slice).await {
                Ok(result) => {
                    info!(
                        "Candidate {} assigned responder {}",
                        candidate, result.ipv4_addr
                    );
                    if let Err(e) = self.dump.save_response(&result) {
                        warn!("Could not save response snapshot: {}", e);
                    }
                    return Ok(Negotiated {
                        candidate: candidate.clone(),
                        result,
                    });
                }
                Err(e) => warn!("{}", e),
            }
        }

        Err(AdvertiserError::NegotiationFailed {
            attempted: candidates.len(),
        })
    }

    #[instrument(skip(self, slice))]
    async fn try_candidate(
        &self,
        candidate: &str,
        slice: &NeighborAdvertiserSlice,
    ) -> Result<NegotiationResult> {
        let url = endpoint_url(candidate, self.port, &slice.switch_info.name);
        debug!("Posting slice to {}", url);

        self.transport
            .post_slice(&url, slice)
            .await
            .map_err(|source| AdvertiserError::Transport {
                candidate: candidate.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RespondingSchemeConfig, SwitchInfo};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    type Reply = std::result::Result<NegotiationResult, TransportFailure>;

    /// Replays canned replies per host and records every URL it was asked for.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<HashMap<String, Reply>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn reply(self, host: &str, reply: Reply) -> Self {
            self.replies.lock().unwrap().insert(host.to_string(), reply);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SliceTransport for ScriptedTransport {
        async fn post_slice(&self, url: &str, _slice: &NeighborAdvertiserSlice) -> Reply {
            self.calls.lock().unwrap().push(url.to_string());
            let host = url
                .trim_start_matches("http://")
                .split(':')
                .next()
                .unwrap()
                .to_string();
            self.replies
                .lock()
                .unwrap()
                .remove(&host)
                .unwrap_or_else(|| Err(TransportFailure::Request("connection refused".into())))
        }
    }

    fn assigned(addr: Ipv4Addr) -> Reply {
        Ok(NegotiationResult {
            ipv4_addr: addr,
            extra: Default::default(),
        })
    }

    fn slice() -> NeighborAdvertiserSlice {
        NeighborAdvertiserSlice {
            switch_info: SwitchInfo {
                name: "sw1".to_string(),
                ipv4_addr: "10.0.0.1".to_string(),
                ipv6_addr: String::new(),
                hw_sku: "Force10-S6000".to_string(),
            },
            vlan_interfaces: vec![],
            responding_schemes: RespondingSchemeConfig::default(),
        }
    }

    fn hosts(list: &[&str]) -> Vec<String> {
        list.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("10.0.0.9", 85, "sw1"),
            "http://10.0.0.9:85/Ferret/NeighborAdvertiser/Slices/sw1"
        );
    }

    #[test]
    fn test_parse_candidates() {
        assert_eq!(
            parse_candidates(" 10.0.0.9, ,10.0.0.10,").unwrap(),
            hosts(&["10.0.0.9", "10.0.0.10"])
        );
        assert!(matches!(
            parse_candidates(" , "),
            Err(AdvertiserError::NoCandidates)
        ));
    }

    #[tokio::test]
    async fn test_first_success_stops_iteration() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::default()
            .reply(
                "a",
                Err(TransportFailure::Status {
                    status: 500,
                    body: String::new(),
                }),
            )
            .reply("b", assigned(Ipv4Addr::new(10, 64, 0, 7)))
            .reply("c", assigned(Ipv4Addr::new(10, 64, 0, 8)));

        let negotiator = Negotiator::new(&transport).with_dump(DiagnosticDump::new(tmp.path()));
        let out = negotiator
            .negotiate(&slice(), &hosts(&["a", "b", "c"]))
            .await
            .unwrap();

        assert_eq!(out.candidate, "b");
        assert_eq!(out.responder(), "10.64.0.7");
        assert_eq!(
            transport.calls(),
            vec![
                "http://a:85/Ferret/NeighborAdvertiser/Slices/sw1".to_string(),
                "http://b:85/Ferret/NeighborAdvertiser/Slices/sw1".to_string(),
            ]
        );
        assert!(tmp.path().join("request_slice.json").exists());
        assert!(tmp.path().join("response.json").exists());
    }

    #[tokio::test]
    async fn test_all_candidates_fail() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::default().reply("b", Err(TransportFailure::Timeout));

        let negotiator = Negotiator::new(&transport)
            .with_port(8085)
            .with_dump(DiagnosticDump::new(tmp.path()));
        let err = negotiator
            .negotiate(&slice(), &hosts(&["a", "b", "c"]))
            .await
            .unwrap_err();

        assert!(matches!(err, AdvertiserError::NegotiationFailed { attempted: 3 }));
        assert_eq!(transport.calls().len(), 3);
        assert!(transport.calls()[0].starts_with("http://a:8085/"));
        // Request snapshot is written even though nothing succeeded
        assert!(tmp.path().join("request_slice.json").exists());
        assert!(!tmp.path().join("response.json").exists());
    }

    #[tokio::test]
    async fn test_invalid_response_moves_to_next_candidate() {
        let tmp = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::default()
            .reply(
                "a",
                Err(TransportFailure::InvalidResponse(
                    "missing field `ipv4Addr`".to_string(),
                )),
            )
            .reply("b", assigned(Ipv4Addr::new(10, 64, 0, 9)));

        let negotiator = Negotiator::new(&transport).with_dump(DiagnosticDump::new(tmp.path()));
        let out = negotiator
            .negotiate(&slice(), &hosts(&["a", "b"]))
            .await
            .unwrap();
        assert_eq!(out.candidate, "b");
        assert_eq!(out.responder(), "10.64.0.9");
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let transport = ScriptedTransport::default();
        let err = Negotiator::new(&transport)
            .negotiate(&slice(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AdvertiserError::NoCandidates));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dump_failure_does_not_abort() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let transport =
            ScriptedTransport::default().reply("a", assigned(Ipv4Addr::new(10, 64, 0, 7)));
        let out = Negotiator::new(&transport)
            .with_dump(DiagnosticDump::new(&blocker))
            .negotiate(&slice(), &hosts(&["a"]))
            .await
            .unwrap();
        assert_eq!(out.responder(), "10.64.0.7");
    }
}
