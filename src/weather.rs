use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client};
use serde::Deserialize;

use crate::models::Forecast;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("forecast has no periods")]
    NoPeriods,
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self) -> Result<Forecast, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: Option<ForecastProperties>,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    #[serde(default)]
    periods: Vec<PeriodDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeriodDoc {
    name: String,
    short_forecast: String,
    temperature: i64,
    temperature_unit: String,
}

/// National Weather Service gridpoint forecast.
pub struct NwsWeather {
    client: Client,
    endpoint: String,
}

impl NwsWeather {
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
}

#[async_trait]
impl WeatherSource for NwsWeather {
    async fn current(&self) -> Result<Forecast, WeatherError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(ACCEPT, "application/geo+json")
            .send()
            .await
            .map_err(|err| WeatherError::Http(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| WeatherError::Http(err.to_string()))?;
        if !status.is_success() {
            return Err(WeatherError::Http(format!("status {status}")));
        }
        parse_forecast(&text)
    }
}

fn parse_forecast(body: &str) -> Result<Forecast, WeatherError> {
    let payload: ForecastResponse =
        serde_json::from_str(body).map_err(|err| WeatherError::Parse(err.to_string()))?;
    let period = payload
        .properties
        .and_then(|props| props.periods.into_iter().next())
        .ok_or(WeatherError::NoPeriods)?;
    Ok(Forecast {
        name: period.name,
        short_forecast: period.short_forecast,
        temperature: period.temperature,
        temperature_unit: period.temperature_unit,
    })
}
