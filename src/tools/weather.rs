//! Current weather for a free-text place name.
//!
//! Two steps: Nominatim turns the place into coordinates (first match
//! wins), then OpenWeather is queried by coordinates.

use super::params::{self, Params};
use super::{endpoint, Tool, ToolDescriptor, ToolError, ToolOutput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

static DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "weather",
    description: "Get current weather information for any location using precise coordinates",
    parameters: &[(
        "location",
        "string - The city or location name (e.g., 'London', 'New York', 'Tokyo, Japan')",
    )],
};

/// Normalized weather report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub location: String,
    pub country: String,
    pub coordinates: Coordinates,
    /// Degrees Celsius, rounded.
    pub temperature: i64,
    pub feels_like: i64,
    pub description: String,
    pub humidity: u32,
    /// Metres per second, one decimal.
    pub wind_speed: f64,
    pub pressure: u32,
    pub icon: String,
    pub full_location_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

// -- Upstream payloads -------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct WeatherPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    sys: SysPayload,
    main: MainPayload,
    #[serde(default)]
    weather: Vec<ConditionPayload>,
    #[serde(default)]
    wind: WindPayload,
}

#[derive(Debug, Default, Deserialize)]
struct SysPayload {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct MainPayload {
    temp: f64,
    feels_like: f64,
    humidity: u32,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct ConditionPayload {
    description: String,
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct WindPayload {
    #[serde(default)]
    speed: f64,
}

/// Weather tool backed by Nominatim + OpenWeather.
pub struct WeatherTool {
    http: reqwest::Client,
    api_key: String,
    geocoding_url: String,
    weather_url: String,
    user_agent: String,
}

impl WeatherTool {
    pub fn new(
        http: reqwest::Client,
        api_key: &str,
        geocoding_url: &str,
        weather_url: &str,
        user_agent: &str,
    ) -> Self {
        Self {
            http,
            api_key: api_key.trim().to_string(),
            geocoding_url: geocoding_url.to_string(),
            weather_url: weather_url.to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    async fn geocode(&self, location: &str) -> Result<GeocodeHit, ToolError> {
        let url = endpoint(&self.geocoding_url, &["search"])?;
        let resp = self
            .http
            .get(url)
            .query(&[
                ("format", "json"),
                ("q", location),
                ("limit", "3"),
                ("addressdetails", "1"),
            ])
            // Nominatim rejects anonymous clients.
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ToolError::Upstream("Geocoding service unavailable".into()));
        }

        let hits: Vec<GeocodeHit> = resp
            .json()
            .await
            .map_err(|e| ToolError::Upstream(format!("Unreadable geocoding response: {}", e)))?;

        hits.into_iter()
            .next()
            .ok_or_else(|| ToolError::NotFound(format!("Location \"{}\" not found", location)))
    }

    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherPayload, ToolError> {
        let url = endpoint(&self.weather_url, &["data", "2.5", "weather"])?;
        let resp = self
            .http
            .get(url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ToolError::Upstream(format!(
                "Weather API request failed ({})",
                resp.status().as_u16()
            )));
        }

        resp.json()
            .await
            .map_err(|e| ToolError::Upstream(format!("Unreadable weather response: {}", e)))
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &DESCRIPTOR
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn execute(&self, params: &Params) -> Result<ToolOutput, ToolError> {
        if self.api_key.is_empty() {
            return Err(ToolError::NotConfigured("OpenWeather API key"));
        }
        let location = params::required_string(params, "location")?;

        let hit = self.geocode(&location).await?;
        let lat: f64 = hit
            .lat
            .parse()
            .map_err(|_| ToolError::Upstream(format!("Bad latitude from geocoder: {}", hit.lat)))?;
        let lon: f64 = hit
            .lon
            .parse()
            .map_err(|_| ToolError::Upstream(format!("Bad longitude from geocoder: {}", hit.lon)))?;
        debug!("Geocoded '{}' to {},{} ({})", location, lat, lon, hit.display_name);

        let weather = self.current_weather(lat, lon).await?;
        let condition = weather
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| ToolError::Upstream("Weather API returned no conditions".into()))?;

        let place = if weather.name.is_empty() {
            hit.display_name
                .split(',')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        } else {
            weather.name
        };

        info!("Weather for {}: {:.1}°C", place, weather.main.temp);

        Ok(ToolOutput::Weather(WeatherReport {
            location: place,
            country: weather.sys.country,
            coordinates: Coordinates { lat, lon },
            temperature: weather.main.temp.round() as i64,
            feels_like: weather.main.feels_like.round() as i64,
            description: condition.description,
            humidity: weather.main.humidity,
            wind_speed: (weather.wind.speed * 10.0).round() / 10.0,
            pressure: weather.main.pressure,
            icon: condition.icon,
            full_location_name: hit.display_name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{any, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool(server: &MockServer, key: &str) -> WeatherTool {
        WeatherTool::new(
            reqwest::Client::new(),
            key,
            &server.uri(),
            &server.uri(),
            "AlooChat-test",
        )
    }

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    async fn mount_paris(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Paris"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"lat": "48.8589", "lon": "2.3200", "display_name": "Paris, Île-de-France, France"},
                {"lat": "33.66", "lon": "-95.55", "display_name": "Paris, Texas, USA"}
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn geocodes_then_reports_weather() {
        let server = MockServer::start().await;
        mount_paris(&server).await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("lat", "48.8589"))
            .and(query_param("appid", "ow-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Paris",
                "sys": {"country": "FR"},
                "main": {"temp": 17.6, "feels_like": 16.4, "humidity": 60, "pressure": 1012},
                "weather": [{"description": "light rain", "icon": "10d"}],
                "wind": {"speed": 3.46}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = tool(&server, "ow-key")
            .execute(&params(json!({"location": "Paris"})))
            .await
            .unwrap();

        let ToolOutput::Weather(report) = out else {
            panic!("expected weather output");
        };
        assert_eq!(report.location, "Paris");
        assert_eq!(report.country, "FR");
        assert_eq!(report.temperature, 18);
        assert_eq!(report.feels_like, 16);
        assert_eq!(report.wind_speed, 3.5);
        assert_eq!(report.coordinates, Coordinates { lat: 48.8589, lon: 2.32 });
        assert_eq!(report.full_location_name, "Paris, Île-de-France, France");
    }

    #[tokio::test]
    async fn missing_key_is_reported_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = tool(&server, "  ")
            .execute(&params(json!({"location": "Paris"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotConfigured(_)));
        assert_eq!(err.to_string(), "OpenWeather API key not configured");
    }

    #[tokio::test]
    async fn unknown_place_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = tool(&server, "k")
            .execute(&params(json!({"location": "Atlantis"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
        assert_eq!(err.to_string(), "Location \"Atlantis\" not found");
    }

    #[tokio::test]
    async fn weather_failure_is_distinct_from_configuration() {
        let server = MockServer::start().await;
        mount_paris(&server).await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = tool(&server, "bad-key")
            .execute(&params(json!({"location": "Paris"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
        assert!(err.to_string().starts_with("Weather API request failed"));
    }

    #[tokio::test]
    async fn location_must_be_present() {
        let server = MockServer::start().await;
        let err = tool(&server, "k")
            .execute(&params(json!({"location": ["Paris"]})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}
