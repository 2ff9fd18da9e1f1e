use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;

use super::{
    AiCollaborator, AiError, AiResult, AthleteRiskProfile, InjuryRiskAssessment, Recommendation,
};
use crate::db::models::user::SkillMetrics;
use crate::util::env::{Env, EnvResult};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// Every call is bounded by the configured timeout; an unset API key turns
/// the client into a permanently-disabled collaborator rather than an
/// error at construction.
pub struct AiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl AiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            timeout,
        }
    }

    pub async fn from_env() -> EnvResult<Self> {
        let env = Env::get().await?;

        Ok(Self::new(
            env.openai_base_url.clone(),
            env.openai_api_key.clone(),
            env.openai_model.clone(),
            Duration::from_millis(env.ai_timeout_ms),
        ))
    }

    /// Run one JSON-mode chat exchange and parse the message content as
    /// JSON.
    #[instrument(skip(self, system, prompt))]
    async fn chat_json(&self, system: &str, prompt: &str) -> AiResult<Value> {
        let api_key = self.api_key.as_ref().ok_or(AiError::Disabled)?;

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "response_format": { "type": "json_object" },
        });

        let request = self
            .http
            .post(format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH))
            .bearer_auth(api_key)
            .json(&body)
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| AiError::Timeout(self.timeout.as_millis() as u64))??;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(code = %status, "non-success response from ai collaborator");
            return Err(AiError::Status(status));
        }

        let envelope: Value = response.json().await?;
        let content = envelope["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AiError::Malformed(String::from("missing message content")))?;

        serde_json::from_str(content)
            .map_err(|e| AiError::Malformed(format!("content is not valid json: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct RecommendationsPayload {
    #[serde(default)]
    recommendations: Vec<Recommendation>,
}

#[async_trait]
impl AiCollaborator for AiClient {
    #[instrument(skip(self, metrics, history))]
    async fn generate_task_recommendations(
        &self,
        sport: &str,
        metrics: &SkillMetrics,
        skill_level: &str,
        history: &[String],
    ) -> AiResult<Vec<Recommendation>> {
        let prompt = format!(
            "You are an AI sports coach. Generate 5 personalized training \
             recommendations for an athlete with the following profile:\n\n\
             Sport: {sport}\n\
             Current Metrics (out of 10): Speed: {}, Strength: {}, Stamina: {}, Technique: {}\n\
             Skill Level: {skill_level}\n\
             Recent Performance: {}\n\n\
             Provide recommendations that target their weakest areas while \
             maintaining their strengths. Respond with a JSON object holding a \
             `recommendations` array; each entry has `title`, `description` \
             (2-3 sentences), `difficulty` (easy, medium, hard), `category` \
             (training, nutrition, recovery, analysis), `points` (10-50) and \
             `estimatedDuration`.",
            metrics.speed,
            metrics.strength,
            metrics.stamina,
            metrics.technique,
            serde_json::to_string(history).unwrap_or_else(|_| String::from("[]")),
        );

        let payload = self
            .chat_json(
                "You are an expert AI sports coach. Always respond with valid JSON.",
                &prompt,
            )
            .await?;

        let parsed: RecommendationsPayload = serde_json::from_value(payload)
            .map_err(|e| AiError::Malformed(format!("unexpected recommendations shape: {e}")))?;

        tracing::debug!(count = parsed.recommendations.len(), "recommendations generated");
        Ok(parsed.recommendations)
    }

    #[instrument(skip(self, athlete))]
    async fn analyze_injury_risk(
        &self,
        athlete: &AthleteRiskProfile,
    ) -> AiResult<InjuryRiskAssessment> {
        let previous = if athlete.previous_injuries.is_empty() {
            String::from("None")
        } else {
            athlete.previous_injuries.join(", ")
        };

        let prompt = format!(
            "Analyze injury risk for this athlete:\n\n\
             Age: {}\n\
             Sport: {}\n\
             Recent Metrics: {}\n\
             Training Load: {}\n\
             Previous Injuries: {previous}\n\n\
             Respond with JSON in this format:\n\
             {{ \"riskLevel\": \"low|medium|high|critical\", \"bodyParts\": [...], \
             \"recommendations\": [...], \"confidence\": 0.0 }}",
            athlete.age,
            athlete.sport,
            serde_json::to_string(&athlete.recent_metrics)
                .unwrap_or_else(|_| String::from("[]")),
            athlete.training_load,
        );

        let payload = self
            .chat_json(
                "You are an AI sports medicine expert specializing in injury prevention.",
                &prompt,
            )
            .await?;

        serde_json::from_value(payload)
            .map_err(|e| AiError::Malformed(format!("unexpected analysis shape: {e}")))
    }

    fn enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_response(content: Value) -> Value {
        json!({
            "choices": [
                { "message": { "role": "assistant", "content": content.to_string() } }
            ]
        })
    }

    fn client_for(server: &MockServer) -> AiClient {
        AiClient::new(
            server.uri(),
            Some(String::from("test-key")),
            "test-model",
            Duration::from_millis(500),
        )
    }

    #[tokio::test]
    async fn parses_recommendations_from_chat_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(json!({
                "recommendations": [
                    {
                        "title": "Interval sprints",
                        "description": "Six rounds of 200m at race pace.",
                        "points": 30,
                        "category": "training",
                        "difficulty": "hard",
                        "estimatedDuration": "45 minutes"
                    },
                    {
                        "title": "Hydration log",
                        "description": "Track fluid intake for the day.",
                        "points": 10,
                        "category": "nutrition",
                        "difficulty": "easy"
                    }
                ]
            }))))
            .mount(&server)
            .await;

        let recs = client_for(&server)
            .generate_task_recommendations("sprint", &SkillMetrics::baseline(), "intermediate", &[])
            .await
            .unwrap();

        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].title, "Interval sprints");
        assert_eq!(recs[0].points, 30);
    }

    #[tokio::test]
    async fn missing_recommendations_key_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_COMPLETIONS_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_response(json!({ "noise": true }))),
            )
            .mount(&server)
            .await;

        let recs = client_for(&server)
            .generate_task_recommendations("sprint", &SkillMetrics::baseline(), "beginner", &[])
            .await
            .unwrap();
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn analysis_defaults_fill_absent_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(json!({
                "riskLevel": "high",
                "bodyParts": ["knee"]
            }))))
            .mount(&server)
            .await;

        let profile = AthleteRiskProfile {
            age: 24,
            sport: String::from("football"),
            recent_metrics: Vec::new(),
            training_load: String::from("high"),
            previous_injuries: vec![String::from("ACL tear")],
        };

        let assessment = client_for(&server)
            .analyze_injury_risk(&profile)
            .await
            .unwrap();
        assert_eq!(assessment.risk_level, crate::db::models::alert::RiskLevel::High);
        assert_eq!(assessment.body_parts, vec!["knee"]);
        assert!(assessment.recommendations.is_empty());
        assert_eq!(assessment.confidence, 0.5);
    }

    #[tokio::test]
    async fn unconfigured_key_is_disabled() {
        let client = AiClient::new(
            "http://localhost:9",
            None,
            "test-model",
            Duration::from_millis(100),
        );
        assert!(!client.enabled());

        let err = client
            .generate_task_recommendations("sprint", &SkillMetrics::baseline(), "beginner", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Disabled));
    }

    #[tokio::test]
    async fn server_errors_surface_as_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_task_recommendations("sprint", &SkillMetrics::baseline(), "beginner", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Status(_)));
    }

    #[tokio::test]
    async fn slow_responses_hit_the_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_COMPLETIONS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_response(json!({ "recommendations": [] })))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_task_recommendations("sprint", &SkillMetrics::baseline(), "beginner", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Timeout(_)));
    }
}
