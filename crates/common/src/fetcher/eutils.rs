//! NCBI E-utilities `elink` client
//!
//! Small id sets go out as one GET with repeated `id` parameters. Larger
//! sets are POSTed as form data in fixed-size batches, each batch waiting
//! the configured delay and a rate-limiter permit before it is sent.

use super::{BatchProgress, CitationFetcher};
use crate::config::EutilsConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::model::{AdjacencyMap, PaperId};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// HTTP method chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
        }
    }
}

/// E-utilities citation fetcher
pub struct EutilsFetcher {
    client: reqwest::Client,
    config: EutilsConfig,
    limiter: DefaultDirectRateLimiter,
}

impl EutilsFetcher {
    /// Create a new fetcher
    pub fn new(config: EutilsConfig) -> Result<Self> {
        let per_second = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
            AppError::Configuration {
                message: "eutils.requests_per_second must be at least 1".to_string(),
            }
        })?;

        // No request timeout: a request that never answers stalls the caller
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            config,
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    /// Method used for a request carrying `id_count` ids
    pub fn method_for(&self, id_count: usize) -> RequestMethod {
        if id_count <= self.config.get_threshold {
            RequestMethod::Get
        } else {
            RequestMethod::Post
        }
    }

    fn params<'a>(&'a self, ids: &'a [PaperId]) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![
            ("dbfrom", self.config.dbfrom.as_str()),
            ("db", self.config.db.as_str()),
            ("linkname", self.config.linkname.as_str()),
            ("retmode", "json"),
        ];
        params.extend(ids.iter().map(|id| ("id", id.as_str())));
        params
    }

    /// Issue one request and parse its body
    async fn request(&self, ids: &[PaperId], method: RequestMethod) -> Result<AdjacencyMap> {
        self.limiter.until_ready().await;

        let start = Instant::now();
        let params = self.params(ids);
        let request = match method {
            RequestMethod::Get => self.client.get(&self.config.base_url).query(&params),
            RequestMethod::Post => self.client.post(&self.config.base_url).form(&params),
        };

        let outcome = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(AppError::Upstream {
                    status: status.as_u16(),
                    ids: ids.len(),
                });
            }
            Ok::<String, AppError>(response.text().await?)
        }
        .await;

        metrics::record_fetch(
            start.elapsed().as_secs_f64(),
            method.as_str(),
            ids.len(),
            outcome.is_ok(),
        );

        let body = outcome.map_err(|e| {
            warn!(error = %e, ids = ids.len(), method = method.as_str(), "Citation request failed");
            e
        })?;

        Ok(parse_elink_response(&body, &self.config.linkname))
    }
}

#[async_trait]
impl CitationFetcher for EutilsFetcher {
    #[instrument(skip(self, ids, progress), fields(ids = ids.len()))]
    async fn fetch_citations(&self, ids: &[PaperId], progress: &BatchProgress) -> Result<AdjacencyMap> {
        if ids.is_empty() {
            return Ok(AdjacencyMap::new());
        }

        let method = self.method_for(ids.len());
        if method == RequestMethod::Get {
            debug!(ids = ids.len(), "Requesting citations via GET");
            let links = self.request(ids, method).await?;
            progress.report(1.0);
            return Ok(links);
        }

        let batches: Vec<&[PaperId]> = ids.chunks(self.config.batch_size).collect();
        let total = batches.len();
        let mut all_links = AdjacencyMap::new();

        for (index, batch) in batches.into_iter().enumerate() {
            tokio::time::sleep(self.config.batch_delay()).await;
            debug!(batch = index + 1, total, size = batch.len(), "Requesting citation batch via POST");

            for (id, citing) in self.request(batch, method).await? {
                all_links.union_entry(id, citing);
            }
            progress.report((index + 1) as f64 / total as f64);
        }

        Ok(all_links)
    }

    fn name(&self) -> &str {
        "eutils"
    }
}

#[derive(Debug, Default, Deserialize)]
struct ElinkResponse {
    #[serde(default)]
    linksets: Option<Vec<LinkSet>>,
}

#[derive(Debug, Default, Deserialize)]
struct LinkSet {
    #[serde(default)]
    ids: Vec<IdToken>,
    #[serde(default)]
    linksetdbs: Vec<LinkSetDb>,
}

#[derive(Debug, Default, Deserialize)]
struct LinkSetDb {
    #[serde(default)]
    linkname: Option<String>,
    #[serde(default)]
    links: Vec<IdToken>,
}

/// Ids arrive as strings or bare numbers depending on the endpoint
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdToken {
    Text(String),
    Number(u64),
}

impl From<IdToken> for PaperId {
    fn from(token: IdToken) -> Self {
        match token {
            IdToken::Text(id) => PaperId::new(id),
            IdToken::Number(id) => PaperId::new(id.to_string()),
        }
    }
}

/// Turn an elink JSON body into `id → {citing ids}`.
///
/// Anything unexpected degrades to "no citations": an unparsable body or a
/// missing `linksets` yields an empty map, a linkset without `linksetdbs`
/// maps its id to an empty set.
pub fn parse_elink_response(body: &str, linkname: &str) -> AdjacencyMap {
    let response: ElinkResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            debug!(error = %e, "Unparsable elink response, treating as no citations");
            return AdjacencyMap::new();
        }
    };

    let Some(linksets) = response.linksets else {
        debug!("elink response without linksets, treating as no citations");
        return AdjacencyMap::new();
    };

    let mut links = AdjacencyMap::new();
    for linkset in linksets {
        let Some(id) = linkset.ids.into_iter().next() else {
            continue;
        };

        let mut dbs = linkset.linksetdbs;
        let position = dbs
            .iter()
            .position(|db| db.linkname.as_deref() == Some(linkname))
            .unwrap_or(0);
        let citing: BTreeSet<PaperId> = if position < dbs.len() {
            dbs.swap_remove(position)
                .links
                .into_iter()
                .map(PaperId::from)
                .collect()
        } else {
            BTreeSet::new()
        };

        links.union_entry(PaperId::from(id), citing);
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINKNAME: &str = "pubmed_pubmed_citedin";

    #[test]
    fn test_parse_single_linkset() {
        let body = r#"{
            "header": {"type": "elink", "version": "0.3"},
            "linksets": [{
                "dbfrom": "pubmed",
                "ids": ["100"],
                "linksetdbs": [{
                    "dbto": "pubmed",
                    "linkname": "pubmed_pubmed_citedin",
                    "links": ["200", "201"]
                }]
            }]
        }"#;

        let links = parse_elink_response(body, LINKNAME);

        assert_eq!(links, AdjacencyMap::from_lists([("100", vec!["200", "201"])]));
    }

    #[test]
    fn test_parse_numeric_ids_and_missing_linksetdbs() {
        let body = r#"{"linksets": [
            {"ids": [5], "linksetdbs": [{"linkname": "pubmed_pubmed_citedin", "links": [7, 8]}]},
            {"ids": [6]}
        ]}"#;

        let links = parse_elink_response(body, LINKNAME);

        assert_eq!(
            links,
            AdjacencyMap::from_lists([("5", vec!["7", "8"]), ("6", vec![])])
        );
    }

    #[test]
    fn test_parse_prefers_matching_linkname() {
        let body = r#"{"linksets": [{"ids": ["1"], "linksetdbs": [
            {"linkname": "pubmed_pubmed_refs", "links": ["9"]},
            {"linkname": "pubmed_pubmed_citedin", "links": ["2"]}
        ]}]}"#;

        let links = parse_elink_response(body, LINKNAME);

        assert_eq!(links, AdjacencyMap::from_lists([("1", vec!["2"])]));
    }

    #[test]
    fn test_malformed_response_is_no_data() {
        assert!(parse_elink_response("<html>busy</html>", LINKNAME).is_empty());
        assert!(parse_elink_response(r#"{"header": {}}"#, LINKNAME).is_empty());
        assert!(parse_elink_response(r#"{"linksets": [{"linksetdbs": []}]}"#, LINKNAME).is_empty());
    }

    #[test]
    fn test_method_selection() {
        let fetcher = EutilsFetcher::new(EutilsConfig::default()).unwrap();
        assert_eq!(fetcher.method_for(1), RequestMethod::Get);
        assert_eq!(fetcher.method_for(25), RequestMethod::Get);
        assert_eq!(fetcher.method_for(26), RequestMethod::Post);
    }

    #[test]
    fn test_request_params_repeat_id() {
        let fetcher = EutilsFetcher::new(EutilsConfig::default()).unwrap();
        let ids = vec![PaperId::from("1"), PaperId::from("2")];

        let params = fetcher.params(&ids);

        assert_eq!(params.iter().filter(|(k, _)| *k == "id").count(), 2);
        assert!(params.contains(&("linkname", "pubmed_pubmed_citedin")));
        assert!(params.contains(&("retmode", "json")));
    }

    #[tokio::test]
    async fn test_empty_input_skips_network() {
        let mut config = EutilsConfig::default();
        // Unroutable endpoint: any request would fail
        config.base_url = "http://127.0.0.1:9/elink.fcgi".to_string();
        let fetcher = EutilsFetcher::new(config).unwrap();

        let links = fetcher.fetch_citations(&[], &BatchProgress::silent()).await.unwrap();

        assert!(links.is_empty());
    }

    /// Fake elink endpoint answering `id → [id + "0"]` and logging every call
    mod fake_elink {
        use axum::extract::{RawQuery, State};
        use axum::http::{Method, StatusCode};
        use axum::routing::get;
        use axum::Router;
        use std::sync::{Arc, Mutex};

        pub type CallLog = Arc<Mutex<Vec<(Method, usize)>>>;

        fn ids(encoded: &str) -> Vec<String> {
            encoded
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .filter(|(key, _)| *key == "id")
                .map(|(_, value)| value.to_string())
                .collect()
        }

        async fn elink(
            State(log): State<CallLog>,
            method: Method,
            RawQuery(query): RawQuery,
            body: String,
        ) -> String {
            let ids = if method == Method::GET {
                ids(&query.unwrap_or_default())
            } else {
                ids(&body)
            };
            log.lock().unwrap().push((method, ids.len()));

            let linksets: Vec<_> = ids
                .iter()
                .map(|id| {
                    serde_json::json!({
                        "ids": [id],
                        "linksetdbs": [{"linkname": "pubmed_pubmed_citedin", "links": [format!("{id}0")]}]
                    })
                })
                .collect();
            serde_json::json!({ "linksets": linksets }).to_string()
        }

        async fn busy() -> StatusCode {
            StatusCode::SERVICE_UNAVAILABLE
        }

        /// Serve on an ephemeral port, returning the base address
        pub async fn start() -> (String, CallLog) {
            let log = CallLog::default();
            let app = Router::new()
                .route("/elink.fcgi", get(elink).post(elink))
                .route("/busy.fcgi", get(busy).post(busy))
                .with_state(log.clone());

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
            (format!("http://{addr}"), log)
        }
    }

    fn fake_config(base: &str, path: &str) -> EutilsConfig {
        EutilsConfig {
            base_url: format!("{base}/{path}"),
            get_threshold: 2,
            batch_size: 2,
            batch_delay_ms: 0,
            requests_per_second: 100,
            ..EutilsConfig::default()
        }
    }

    #[tokio::test]
    async fn test_small_request_uses_single_get() {
        let (base, log) = fake_elink::start().await;
        let fetcher = EutilsFetcher::new(fake_config(&base, "elink.fcgi")).unwrap();
        let ids = vec![PaperId::from("1"), PaperId::from("2")];

        let links = fetcher.fetch_citations(&ids, &BatchProgress::silent()).await.unwrap();

        assert_eq!(links, AdjacencyMap::from_lists([("1", vec!["10"]), ("2", vec!["20"])]));
        assert_eq!(*log.lock().unwrap(), vec![(axum::http::Method::GET, 2)]);
    }

    #[tokio::test]
    async fn test_large_request_posts_in_batches() {
        let (base, log) = fake_elink::start().await;
        let fetcher = EutilsFetcher::new(fake_config(&base, "elink.fcgi")).unwrap();
        let ids: Vec<PaperId> = (1..=5).map(|i| PaperId::from(i.to_string())).collect();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let links = fetcher.fetch_citations(&ids, &BatchProgress::channel(tx)).await.unwrap();

        assert_eq!(links.len(), 5);
        assert_eq!(links.get("5").map(|c| c.len()), Some(1));

        let calls = log.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(method, _)| *method == axum::http::Method::POST));
        assert_eq!(calls.iter().map(|(_, n)| n).sum::<usize>(), 5);

        let mut fractions = Vec::new();
        while let Ok(fraction) = rx.try_recv() {
            fractions.push(fraction);
        }
        assert_eq!(fractions.len(), 3);
        assert_eq!(fractions.last().copied(), Some(1.0));
    }

    #[tokio::test]
    async fn test_http_error_is_upstream_error() {
        let (base, _) = fake_elink::start().await;
        let fetcher = EutilsFetcher::new(fake_config(&base, "busy.fcgi")).unwrap();

        let err = fetcher
            .fetch_citations(&[PaperId::from("1")], &BatchProgress::silent())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Upstream { status: 503, ids: 1 }));
    }
}
