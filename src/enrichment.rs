use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::models::{Calories, DiningItem, EnrichedItem, Enrichment, DEFAULT_LABEL, GRADE_UNAVAILABLE};

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("no product matches {0:?}")]
    NotFound(String),
    #[error("enrichment disabled")]
    Disabled,
}

/// Where nutrition data for a dining item comes from.
#[async_trait]
pub trait EnrichmentSource: Send + Sync {
    async fn lookup(&self, name: &str) -> Result<Enrichment, EnrichmentError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    products: Option<Vec<ProductDoc>>,
}

#[derive(Debug, Default, Deserialize)]
struct ProductDoc {
    nutriscore_grade: Option<String>,
    nutriments: Option<Nutriments>,
    labels_tags_en: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct Nutriments {
    #[serde(rename = "energy-kcal_100g")]
    energy_kcal_100g: Option<Value>,
}

/// Open Food Facts product search.
pub struct FoodFactsSource {
    client: Client,
    endpoint: String,
}

impl FoodFactsSource {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    fn search_url(&self, name: &str) -> Result<Url, EnrichmentError> {
        let mut url =
            Url::parse(&self.endpoint).map_err(|err| EnrichmentError::Http(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("fields", "nutriscore_grade,nutriments,labels_tags_en")
            .append_pair("page_size", "1")
            .append_pair("sort_by", "popularity")
            .append_pair("search_terms", name);
        Ok(url)
    }
}

#[async_trait]
impl EnrichmentSource for FoodFactsSource {
    async fn lookup(&self, name: &str) -> Result<Enrichment, EnrichmentError> {
        let url = self.search_url(name)?;
        debug!(%url, "food facts lookup");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| EnrichmentError::Http(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| EnrichmentError::Http(err.to_string()))?;

        if !status.is_success() {
            return Err(EnrichmentError::Http(format!("status {status}")));
        }

        parse_search(name, &text)
    }
}

/// Stand-in source when lookups are switched off; every item gets the fallback.
pub struct DisabledSource;

#[async_trait]
impl EnrichmentSource for DisabledSource {
    async fn lookup(&self, _name: &str) -> Result<Enrichment, EnrichmentError> {
        Err(EnrichmentError::Disabled)
    }
}

fn parse_search(name: &str, body: &str) -> Result<Enrichment, EnrichmentError> {
    let payload: SearchResponse =
        serde_json::from_str(body).map_err(|err| EnrichmentError::Parse(err.to_string()))?;
    let product = payload
        .products
        .and_then(|list| list.into_iter().next())
        .ok_or_else(|| EnrichmentError::NotFound(name.to_string()))?;
    Ok(normalize(product))
}

fn normalize(product: ProductDoc) -> Enrichment {
    let grade = product
        .nutriscore_grade
        .map(|grade| grade.trim().to_uppercase())
        .filter(|grade| !grade.is_empty())
        .unwrap_or_else(|| GRADE_UNAVAILABLE.to_string());

    let kcal = product
        .nutriments
        .and_then(|n| n.energy_kcal_100g)
        .and_then(|value| match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        });
    let calories = match kcal {
        Some(kcal) if kcal.is_finite() && kcal != 0.0 => Calories::Known(kcal),
        _ => Calories::Unknown,
    };

    let labels = product
        .labels_tags_en
        .unwrap_or_default()
        .into_iter()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    let labels = if labels.is_empty() {
        DEFAULT_LABEL.to_string()
    } else {
        labels
    };

    Enrichment {
        grade,
        calories,
        labels,
    }
}

/// Per-session memo of enrichment lookups, keyed by exact item name.
///
/// The first request for a name performs the lookup; concurrent requests for
/// the same name wait on it. Failures resolve to [`Enrichment::fallback`] and
/// are cached like successes.
pub struct EnrichmentCache {
    source: Arc<dyn EnrichmentSource>,
    entries: Mutex<HashMap<String, Arc<OnceCell<Enrichment>>>>,
}

impl EnrichmentCache {
    pub fn new(source: Arc<dyn EnrichmentSource>) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, name: &str) -> Enrichment {
        let cell = {
            let mut guard = self.entries.lock().expect("enrichment cache poisoned");
            Arc::clone(guard.entry(name.to_string()).or_default())
        };

        cell.get_or_init(|| async {
            match self.source.lookup(name).await {
                Ok(enrichment) => enrichment,
                Err(err) => {
                    warn!(item = name, "enrichment lookup failed: {err}");
                    Enrichment::fallback()
                }
            }
        })
        .await
        .clone()
    }

    /// Resolves every item in list order, one lookup at a time.
    pub async fn enrich_all(&self, items: &[DiningItem]) -> Vec<EnrichedItem> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let enrichment = self.get(&item.name).await;
            out.push(EnrichedItem {
                item: item.clone(),
                enrichment,
            });
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("enrichment cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().expect("enrichment cache poisoned").clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::catalog;

    /// Counts lookups; names listed in `failing` error out.
    pub(crate) struct CountingSource {
        pub calls: AtomicUsize,
        pub failing: Vec<String>,
    }

    impl CountingSource {
        pub(crate) fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: Vec::new(),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EnrichmentSource for CountingSource {
        async fn lookup(&self, name: &str) -> Result<Enrichment, EnrichmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.failing.iter().any(|f| f == name) {
                return Err(EnrichmentError::Http("connection refused".to_string()));
            }
            Ok(Enrichment {
                grade: "B".to_string(),
                calories: Calories::Known(120.0),
                labels: format!("{name} label"),
            })
        }
    }

    #[tokio::test]
    async fn second_request_for_a_name_hits_the_cache() {
        let source = Arc::new(CountingSource::new());
        let cache = EnrichmentCache::new(source.clone());

        let first = cache.get("Oatmeal Bar").await;
        let second = cache.get("Oatmeal Bar").await;

        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn failures_yield_a_cached_fallback() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            failing: vec!["Mystery Meat".to_string()],
        });
        let cache = EnrichmentCache::new(source.clone());

        let first = cache.get("Mystery Meat").await;
        assert_eq!(first.grade, "N/A");
        assert_eq!(first.calories, Calories::Unknown);
        assert_eq!(first.labels, "General");

        let again = cache.get("Mystery Meat").await;
        assert_eq!(again, first);
        assert_eq!(source.calls(), 1, "a failed lookup must not be retried");
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_lookup() {
        let source = Arc::new(CountingSource::new());
        let cache = EnrichmentCache::new(source.clone());

        let (a, b, c) = tokio::join!(
            cache.get("Lentil Soup"),
            cache.get("Lentil Soup"),
            cache.get("Lentil Soup")
        );

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn enrich_all_preserves_order_and_deduplicates() {
        let source = Arc::new(CountingSource::new());
        let cache = EnrichmentCache::new(source.clone());
        let items = catalog::dining_items();
        let mut subset = items[..3].to_vec();
        subset.push(items[0].clone());

        let enriched = cache.enrich_all(&subset).await;

        let names: Vec<&str> = enriched.iter().map(|e| e.item.name.as_str()).collect();
        assert_eq!(names, vec!["Scrambled Eggs", "Bacon", "Hash Browns", "Scrambled Eggs"]);
        assert_eq!(source.calls(), 3);
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn clear_forgets_previous_lookups() {
        let source = Arc::new(CountingSource::new());
        let cache = EnrichmentCache::new(source.clone());
        cache.get("Muffin").await;
        cache.clear();
        assert!(cache.is_empty());
        cache.get("Muffin").await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn disabled_source_always_falls_back() {
        let cache = EnrichmentCache::new(Arc::new(DisabledSource));
        assert_eq!(cache.get("Bacon").await, Enrichment::fallback());
    }

    #[test]
    fn normalizes_a_full_product() {
        let body = r#"{"products":[{"nutriscore_grade":"c","nutriments":{"energy-kcal_100g":250.5},"labels_tags_en":["Organic","No preservatives"]}]}"#;
        let enrichment = parse_search("Muffin", body).expect("parse");
        assert_eq!(enrichment.grade, "C");
        assert_eq!(enrichment.calories, Calories::Known(250.5));
        assert_eq!(enrichment.labels, "Organic, No preservatives");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let body = r#"{"products":[{"nutriments":{}}]}"#;
        let enrichment = parse_search("Muffin", body).expect("parse");
        assert_eq!(enrichment, Enrichment::fallback());

        let zero = r#"{"products":[{"nutriscore_grade":"a","nutriments":{"energy-kcal_100g":"0"},"labels_tags_en":[]}]}"#;
        let enrichment = parse_search("Water", zero).expect("parse");
        assert_eq!(enrichment.grade, "A");
        assert_eq!(enrichment.calories, Calories::Unknown);
        assert_eq!(enrichment.labels, "General");
    }

    #[test]
    fn empty_or_malformed_results_are_errors() {
        assert!(matches!(
            parse_search("Nothing", r#"{"products":[]}"#),
            Err(EnrichmentError::NotFound(_))
        ));
        assert!(matches!(
            parse_search("Nothing", r#"{"count":0}"#),
            Err(EnrichmentError::NotFound(_))
        ));
        assert!(matches!(
            parse_search("Nothing", "<html>"),
            Err(EnrichmentError::Parse(_))
        ));
    }

    #[test]
    fn search_url_encodes_item_name() {
        let source = FoodFactsSource::new(
            "https://world.openfoodfacts.org/api/v2/search",
            "campus-life-test",
            Duration::from_secs(5),
        )
        .expect("client");
        let url = source.search_url("Bagel & Cream Cheese").expect("url");
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["search_terms"], "Bagel & Cream Cheese");
        assert_eq!(pairs["page_size"], "1");
        assert!(url.as_str().contains("search_terms=Bagel+%26+Cream+Cheese"));
    }
}
