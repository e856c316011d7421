use std::{fmt::Write as _, time::Duration};

use serde::Deserialize;
use serde_json::json;

use super::{NarrativeAssessor, NarrativeError, NarrativeOutput, NarrativeRequest};
use crate::config::NarrativeConfig;

const SYSTEM_PROMPT: &str = "You are an energy consumption analyst. \
Reply with a single JSON object with the keys pace_status, analysis and projected_usage.";

/// Most recent chart points included in the prompt.
const MAX_HISTORY_POINTS: usize = 12;

/// Narrative assessor talking to an OpenAI-compatible chat completions
/// endpoint. One request per call, no retries.
pub struct HttpNarrativeAssessor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpNarrativeAssessor {
    pub fn new(cfg: &NarrativeConfig) -> Result<Self, NarrativeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()?;

        let api_key = cfg.api_key_env.as_deref().and_then(|var| match std::env::var(var) {
            Ok(key) => Some(key),
            Err(_) => {
                tracing::warn!(var, "narrative API key variable not set; calling without credentials");
                None
            }
        });

        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key,
        })
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub(crate) fn build_prompt(req: &NarrativeRequest) -> String {
    let mut prompt = format!(
        "Assess the electricity usage pace of a household. Assume a {cycle}-day billing cycle.\n\
         \n\
         Current situation:\n\
         - Monthly Goal: {goal} units\n\
         - Current Usage this cycle: {usage} units\n\
         - Days elapsed in the cycle: {days}\n",
        goal = req.monthly_goal,
        usage = req.current_usage,
        days = req.days_elapsed,
        cycle = req.cycle_length_days,
    );

    if !req.historical.is_empty() {
        prompt.push_str("\nRecent meter readings (date, cumulative units):\n");
        let skip = req.historical.len().saturating_sub(MAX_HISTORY_POINTS);
        for point in req.historical.iter().skip(skip) {
            let date = point.date.date();
            let _ = writeln!(prompt, "- {date}: {}", point.value);
        }
    }

    let _ = write!(
        prompt,
        "\nProvide:\n\
         1. pace_status: one of 'On Track' (projected usage at most 100% of the goal), \
         'Slightly High' (over 100% up to 120%) or 'High' (over 120%).\n\
         2. analysis: one short sentence.\n\
         3. projected_usage: projected total for the {cycle}-day cycle at the current average daily usage.\n",
        cycle = req.cycle_length_days,
    );
    prompt
}

/// Parse the model's reply, tolerating a fenced ```json block.
pub(crate) fn parse_output(content: &str) -> Result<NarrativeOutput, NarrativeError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let output: NarrativeOutput =
        serde_json::from_str(body).map_err(|e| NarrativeError::InvalidOutput(format!("not valid JSON: {e}")))?;

    if !output.projected_usage.is_finite() {
        return Err(NarrativeError::InvalidOutput("projected_usage is not a finite number".into()));
    }
    Ok(output)
}

#[async_trait::async_trait]
impl NarrativeAssessor for HttpNarrativeAssessor {
    async fn assess(&self, request: &NarrativeRequest) -> Result<NarrativeOutput, NarrativeError> {
        metrics::counter!("narrative_requests_total").increment(1);

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(request) },
            ],
            "response_format": { "type": "json_object" },
        });

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NarrativeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = resp.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| NarrativeError::InvalidOutput("no message content in response".into()))?;

        parse_output(&content)
    }
}
