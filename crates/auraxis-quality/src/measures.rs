//! SonarCloud measures: ratings, API client and polling.

use crate::{QualityError, QualityResult, SonarConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Metrics that must all reach the target grade
pub const RATING_METRICS: [&str; 3] = ["reliability_rating", "security_rating", "sqale_rating"];

pub const MEASURES_PATH: &str = "/api/measures/component";

/// SonarCloud letter grade. The API reports these as `"1.0"` (A) to `"5.0"` (E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rating {
    A = 1,
    B = 2,
    C = 3,
    D = 4,
    E = 5,
}

impl Rating {
    fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Rating::A),
            2 => Some(Rating::B),
            3 => Some(Rating::C),
            4 => Some(Rating::D),
            5 => Some(Rating::E),
            _ => None,
        }
    }

    /// Value as the measures API reports it
    pub fn wire_value(self) -> String {
        format!("{}.0", self as u8)
    }
}

impl FromStr for Rating {
    type Err = String;

    /// Accepts API values (`"1.0"`, `"1"`) and letters (`"A"`, `"a"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let parsed = match raw.to_uppercase().as_str() {
            "A" => Some(Rating::A),
            "B" => Some(Rating::B),
            "C" => Some(Rating::C),
            "D" => Some(Rating::D),
            "E" => Some(Rating::E),
            _ => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.fract() == 0.0 && (1.0..=5.0).contains(n))
                .and_then(|n| Rating::from_number(n as u8)),
        };
        parsed.ok_or_else(|| format!("unrecognized rating '{}'", raw))
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Rating::A => "A",
            Rating::B => "B",
            Rating::C => "C",
            Rating::D => "D",
            Rating::E => "E",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Measure {
    pub metric: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeasuresResponse {
    pub component: MeasuresComponent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeasuresComponent {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub measures: Vec<Measure>,
}

fn measure_value<'a>(measures: &'a [Measure], metric: &str) -> Option<&'a str> {
    measures
        .iter()
        .find(|m| m.metric == metric)
        .and_then(|m| m.value.as_deref())
}

/// True once every rating metric has a value
pub fn has_all_ratings(measures: &[Measure]) -> bool {
    RATING_METRICS
        .iter()
        .all(|metric| measure_value(measures, metric).is_some())
}

/// Compare each rating metric with `target`, listing every miss
pub fn evaluate_ratings(measures: &[Measure], target: Rating) -> QualityResult<Vec<(String, Rating)>> {
    let mut ratings = Vec::with_capacity(RATING_METRICS.len());
    let mut problems = Vec::new();

    for metric in RATING_METRICS {
        match measure_value(measures, metric).map(str::parse::<Rating>) {
            None => problems.push(format!("{} missing", metric)),
            Some(Err(e)) => problems.push(format!("{} {}", metric, e)),
            Some(Ok(rating)) if rating != target => {
                problems.push(format!("{} is {} (expected {})", metric, rating, target))
            }
            Some(Ok(rating)) => ratings.push((metric.to_string(), rating)),
        }
    }

    if problems.is_empty() {
        Ok(ratings)
    } else {
        Err(QualityError::RatingsBelowTarget(problems))
    }
}

/// Read access to a project's measures
#[async_trait]
pub trait MeasuresSource: Send + Sync {
    async fn fetch(&self, project_key: &str) -> QualityResult<Vec<Measure>>;
}

/// SonarCloud Web API client
#[derive(Clone)]
pub struct SonarCloudClient {
    client: Client,
    host_url: String,
    token: String,
}

impl SonarCloudClient {
    pub fn new(host_url: impl Into<String>, token: impl Into<String>) -> QualityResult<Self> {
        let client = Client::builder()
            .user_agent(auraxis_core::user_agent())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| QualityError::api(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            host_url: host_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &SonarConfig) -> QualityResult<Self> {
        Self::new(config.host_url.clone(), config.token.clone())
    }

    /// Measures endpoint URL for `project_key`
    pub fn measures_url(&self, project_key: &str) -> QualityResult<url::Url> {
        let mut url = url::Url::parse(&format!("{}{}", self.host_url, MEASURES_PATH))
            .map_err(|e| QualityError::api(format!("invalid host URL '{}': {}", self.host_url, e)))?;
        url.query_pairs_mut()
            .append_pair("component", project_key)
            .append_pair("metricKeys", &RATING_METRICS.join(","));
        Ok(url)
    }
}

impl fmt::Debug for SonarCloudClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SonarCloudClient")
            .field("host_url", &self.host_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MeasuresSource for SonarCloudClient {
    async fn fetch(&self, project_key: &str) -> QualityResult<Vec<Measure>> {
        let url = self.measures_url(project_key)?;
        debug!(target: "auraxis::quality", %url, "requesting measures");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QualityError::api(format!(
                "GET {} returned {}: {}",
                MEASURES_PATH,
                status,
                body.trim()
            )));
        }

        let payload: MeasuresResponse = response.json().await?;
        Ok(payload.component.measures)
    }
}

/// Fetch measures until every rating is present or attempts run out.
///
/// Incomplete measures after the last attempt are returned as-is so the
/// evaluation can name what is missing; a request error on the last attempt
/// is returned.
pub async fn poll_ratings<M>(source: &M, project_key: &str, attempts: u32, interval: Duration) -> QualityResult<Vec<Measure>>
where
    M: MeasuresSource + ?Sized,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = source.fetch(project_key).await;
        match &result {
            Ok(measures) if has_all_ratings(measures) => {
                info!(target: "auraxis::quality", attempt, "ratings available");
                return result;
            }
            Ok(_) => debug!(target: "auraxis::quality", attempt, "ratings not computed yet"),
            Err(e) => warn!(target: "auraxis::quality", attempt, error = %e, "measures request failed"),
        }

        if attempt >= attempts {
            return result;
        }
        attempt += 1;
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn measure(metric: &str, value: &str) -> Measure {
        Measure {
            metric: metric.to_string(),
            value: Some(value.to_string()),
        }
    }

    fn all_a() -> Vec<Measure> {
        RATING_METRICS.iter().map(|m| measure(m, "1.0")).collect()
    }

    #[test]
    fn test_rating_parsing() {
        assert_eq!("1.0".parse::<Rating>().unwrap(), Rating::A);
        assert_eq!("3".parse::<Rating>().unwrap(), Rating::C);
        assert_eq!(" e ".parse::<Rating>().unwrap(), Rating::E);
        assert!("1.5".parse::<Rating>().is_err());
        assert!("6.0".parse::<Rating>().is_err());
        assert!("".parse::<Rating>().is_err());
        assert_eq!(Rating::B.wire_value(), "2.0");
        assert_eq!(Rating::D.to_string(), "D");
    }

    #[test]
    fn test_evaluate_all_at_target() {
        let ratings = evaluate_ratings(&all_a(), Rating::A).unwrap();
        assert_eq!(ratings.len(), 3);
        assert!(ratings.iter().all(|(_, r)| *r == Rating::A));
    }

    #[test]
    fn test_evaluate_lists_every_problem() {
        let measures = vec![
            measure("reliability_rating", "1.0"),
            measure("security_rating", "2.0"),
        ];
        match evaluate_ratings(&measures, Rating::A) {
            Err(QualityError::RatingsBelowTarget(problems)) => assert_eq!(
                problems,
                vec![
                    "security_rating is B (expected A)".to_string(),
                    "sqale_rating missing".to_string(),
                ]
            ),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_better_than_target_still_fails() {
        let result = evaluate_ratings(&all_a(), Rating::B);
        assert!(matches!(result, Err(QualityError::RatingsBelowTarget(p)) if p.len() == 3));
    }

    #[test]
    fn test_measures_response_shape() {
        let payload = r#"{"component": {"key": "auraxis_api", "measures": [
            {"metric": "security_rating", "value": "1.0", "bestValue": true},
            {"metric": "sqale_rating"}
        ]}}"#;
        let response: MeasuresResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response.component.key.as_deref(), Some("auraxis_api"));
        assert_eq!(response.component.measures.len(), 2);
        assert_eq!(response.component.measures[1].value, None);
        assert!(!has_all_ratings(&response.component.measures));
    }

    #[test]
    fn test_measures_url() {
        let client = SonarCloudClient::new("https://sonarcloud.io/", "token").unwrap();
        let url = client.measures_url("org_auraxis api").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sonarcloud.io/api/measures/component?component=org_auraxis+api&metricKeys=reliability_rating%2Csecurity_rating%2Csqale_rating"
        );
    }

    struct ScriptedSource {
        responses: Mutex<Vec<QualityResult<Vec<Measure>>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(mut responses: Vec<QualityResult<Vec<Measure>>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MeasuresSource for ScriptedSource {
        async fn fetch(&self, _project_key: &str) -> QualityResult<Vec<Measure>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .pop()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_waits_for_complete_ratings() {
        let source = ScriptedSource::new(vec![
            Err(QualityError::api("502")),
            Ok(vec![measure("security_rating", "1.0")]),
            Ok(all_a()),
        ]);
        let started = tokio::time::Instant::now();
        let measures = poll_ratings(&source, "auraxis_api", 5, Duration::from_secs(10))
            .await
            .unwrap();

        assert!(has_all_ratings(&measures));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(20) && waited < Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_returns_last_result_when_exhausted() {
        let source = ScriptedSource::new(vec![
            Ok(vec![]),
            Err(QualityError::api("503 Service Unavailable")),
        ]);
        let result = poll_ratings(&source, "auraxis_api", 2, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(QualityError::Api(_))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
