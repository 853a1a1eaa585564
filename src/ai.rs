//! Outbound calls to the hosted language model.
//!
//! Everything here is a recoverable collaborator: callers commit their own
//! writes first and treat an [`AiError`] as something to report, not undo.

use crate::coaching::CoachingMessageType;
use crate::dates::DateKey;
use crate::habits::HabitStore;
use crate::journal::{Journal, SentimentLabel};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum AiError {
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no text in API response")]
    EmptyResponse,
    #[error("failed to parse AI response as JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid AI response: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 1.0,
        }
    }
}

/// Text in, text out.
pub trait LanguageModel: Send + Sync {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        options: CompletionOptions,
    ) -> BoxFuture<'a, Result<String, AiError>>;
}

/// Anthropic Messages API client.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl AnthropicClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self, AiError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
            endpoint: MESSAGES_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(&self, prompt: &str, options: CompletionOptions) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingApiKey)?;
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Status { status, body });
        }

        let api_resp: serde_json::Value = resp.json().await?;
        api_resp["content"]
            .as_array()
            .and_then(|blocks| blocks.first())
            .and_then(|block| block["text"].as_str())
            .map(str::to_string)
            .ok_or(AiError::EmptyResponse)
    }
}

impl LanguageModel for AnthropicClient {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        options: CompletionOptions,
    ) -> BoxFuture<'a, Result<String, AiError>> {
        Box::pin(self.send(prompt, options))
    }
}

/// Strip a surrounding markdown code fence, if any.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

pub async fn complete_json<T: DeserializeOwned>(
    model: &dyn LanguageModel,
    prompt: &str,
    options: CompletionOptions,
) -> Result<T, AiError> {
    let text = model.complete(prompt, options).await?;
    serde_json::from_str(extract_json(&text)).map_err(|err| {
        debug!(response = %text, "unparseable AI response");
        AiError::Parse(err)
    })
}

/// Structured sentiment judgment of a piece of free text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentJudgment {
    pub score: u8,
    pub label: SentimentLabel,
    pub confidence: f64,
    pub themes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSentiment {
    score: f64,
    label: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    themes: Option<Vec<String>>,
}

fn parse_label(label: &str) -> Option<SentimentLabel> {
    match label {
        "very-negative" => Some(SentimentLabel::VeryNegative),
        "negative" => Some(SentimentLabel::Negative),
        "neutral" => Some(SentimentLabel::Neutral),
        "positive" => Some(SentimentLabel::Positive),
        "very-positive" => Some(SentimentLabel::VeryPositive),
        _ => None,
    }
}

impl TryFrom<RawSentiment> for SentimentJudgment {
    type Error = AiError;

    fn try_from(raw: RawSentiment) -> Result<Self, Self::Error> {
        if !(1.0..=5.0).contains(&raw.score) || raw.score.fract() != 0.0 {
            return Err(AiError::Invalid(format!("score {} out of range", raw.score)));
        }
        let label = parse_label(&raw.label)
            .ok_or_else(|| AiError::Invalid(format!("unknown label '{}'", raw.label)))?;
        // range-checked above
        let score = raw.score as u8;
        Ok(Self {
            score,
            label,
            confidence: raw.confidence.clamp(0.0, 1.0),
            themes: raw.themes.unwrap_or_default(),
        })
    }
}

pub fn sentiment_prompt(text: &str) -> String {
    format!(
        r#"Analyze the emotional tone and sentiment of this journal entry.

Journal Entry:
"{text}"

Please provide your analysis in the following JSON format:
{{
  "score": <number between 1-5, where 1 is very negative and 5 is very positive>,
  "label": "<one of: very-negative, negative, neutral, positive, very-positive>",
  "confidence": <number between 0-1 indicating confidence in the analysis>,
  "themes": [<array of 2-3 key themes or topics mentioned in the entry>]
}}

Guidelines:
- Score 1 (very-negative): deep distress, hopelessness, severe anxiety
- Score 2 (negative): frustration, sadness, disappointment, mild anxiety
- Score 3 (neutral): balanced, matter-of-fact, mixed emotions
- Score 4 (positive): contentment, happiness, accomplishment, optimism
- Score 5 (very-positive): joy, excitement, gratitude, peak experiences
- Themes should be concise (1-3 words each)
- Confidence reflects how clear the emotional tone is (1.0 = very clear, 0.5 = ambiguous)

Return ONLY the JSON object, no additional text."#
    )
}

pub async fn analyze_sentiment(
    model: &dyn LanguageModel,
    text: &str,
) -> Result<SentimentJudgment, AiError> {
    let options = CompletionOptions {
        max_tokens: 512,
        temperature: 0.3,
    };
    let raw: RawSentiment = complete_json(model, &sentiment_prompt(text), options).await?;
    SentimentJudgment::try_from(raw)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitSummary {
    pub id: String,
    pub name: String,
    pub category: String,
    pub current_streak: u32,
    /// Share of the last seven days completed, 0..=100.
    pub completion_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalSummary {
    pub date: DateKey,
    pub sentiment: Option<String>,
}

/// What the coach gets to see.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoachingContext {
    pub habits: Vec<HabitSummary>,
    pub journal: Vec<JournalSummary>,
}

impl CoachingContext {
    pub fn gather(store: &HabitStore, journal: &Journal, today: DateKey) -> Self {
        let week_start = today.add_days(-6);
        let habits = store
            .active_habits()
            .map(|habit| {
                let completed = store
                    .check_ins_for(&habit.id)
                    .filter(|record| {
                        record.completed && record.date >= week_start && record.date <= today
                    })
                    .count();
                HabitSummary {
                    id: habit.id.clone(),
                    name: habit.name.clone(),
                    category: serde_json::to_value(habit.category)
                        .ok()
                        .and_then(|value| value.as_str().map(str::to_string))
                        .unwrap_or_default(),
                    current_streak: store
                        .streak(&habit.id)
                        .map_or(0, |streak| streak.current_streak),
                    completion_rate: u32::try_from(completed * 100 / 7).unwrap_or(100),
                }
            })
            .collect();

        let journal = journal
            .recent(3)
            .into_iter()
            .map(|entry| JournalSummary {
                date: entry.date,
                sentiment: entry.sentiment.as_ref().map(|sentiment| {
                    let themes = if sentiment.themes.is_empty() {
                        "no themes".to_string()
                    } else {
                        sentiment.themes.join(", ")
                    };
                    format!("{} ({themes})", sentiment.label.as_str())
                }),
            })
            .collect();

        Self { habits, journal }
    }

    pub fn habit_ids(&self) -> impl Iterator<Item = &str> {
        self.habits.iter().map(|habit| habit.id.as_str())
    }
}

pub fn coaching_prompt(context: &CoachingContext) -> String {
    let habits = if context.habits.is_empty() {
        "No habits tracked yet".to_string()
    } else {
        context
            .habits
            .iter()
            .map(|habit| {
                format!(
                    "- [{}] {} ({}): {} day streak, {}% completion rate",
                    habit.id,
                    habit.name,
                    habit.category,
                    habit.current_streak,
                    habit.completion_rate
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let journal = if context.journal.is_empty() {
        "No journal entries yet".to_string()
    } else {
        context
            .journal
            .iter()
            .map(|entry| {
                format!(
                    "- {}: {}",
                    entry.date,
                    entry.sentiment.as_deref().unwrap_or("not analyzed")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are a supportive and empathetic habit coach.
Based on the user's recent data, generate a brief, encouraging message.

User's Habits:
{habits}

Recent Journal Entries:
{journal}

Generate a coaching message that:
1. Acknowledges their progress or current situation
2. Provides a specific insight or observation about their patterns
3. Offers gentle motivation or a helpful suggestion
4. Keeps it under 100 words
5. Is warm, personal, and conversational

Return your response in this JSON format:
{{
  "message": "<your coaching message>",
  "type": "<one of: motivation, insight, suggestion, celebration>",
  "relatedHabitIds": [<habit IDs in square brackets above if relevant, otherwise empty>]
}}

Return ONLY the JSON object, no additional text."#
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingReply {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: CoachingMessageType,
    pub related_habit_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoaching {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    related_habit_ids: Option<Vec<String>>,
}

pub async fn generate_coaching(
    model: &dyn LanguageModel,
    context: &CoachingContext,
) -> Result<CoachingReply, AiError> {
    let options = CompletionOptions {
        max_tokens: 512,
        temperature: 0.7,
    };
    let raw: RawCoaching = complete_json(model, &coaching_prompt(context), options).await?;

    let message = raw.message.trim().to_string();
    if message.is_empty() {
        return Err(AiError::Invalid("empty coaching message".into()));
    }
    let kind = match raw.kind.as_str() {
        "motivation" => CoachingMessageType::Motivation,
        "insight" => CoachingMessageType::Insight,
        "suggestion" => CoachingMessageType::Suggestion,
        "celebration" => CoachingMessageType::Celebration,
        other => return Err(AiError::Invalid(format!("unknown message type '{other}'"))),
    };
    // Only keep references to habits the coach was actually shown.
    let related_habit_ids = raw
        .related_habit_ids
        .unwrap_or_default()
        .into_iter()
        .filter(|id| context.habit_ids().any(|known| known == id.as_str()))
        .collect();

    Ok(CoachingReply {
        message,
        kind,
        related_habit_ids,
    })
}

/// Short celebration text for a streak milestone. Never fails.
pub async fn milestone_message(model: &dyn LanguageModel, habit_name: &str, days: u32) -> String {
    let prompt = format!(
        "Generate a brief, enthusiastic celebration message for someone who just reached a \
         {days}-day streak on their \"{habit_name}\" habit. Keep it under 50 words, warm and \
         congratulatory. Return ONLY the message text, no JSON."
    );
    let options = CompletionOptions {
        max_tokens: 256,
        temperature: 0.8,
    };
    match model.complete(&prompt, options).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => format!("Congratulations on your {days}-day streak!"),
        Err(err) => {
            warn!("milestone message generation failed: {err}");
            format!("Amazing! {days} days of {habit_name}! Keep up the incredible work!")
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Replays canned responses in order; errors once they run out.
    #[derive(Default)]
    pub struct ScriptedModel {
        responses: Mutex<Vec<String>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(responses: I) -> Self {
            let mut responses: Vec<String> = responses.into_iter().map(Into::into).collect();
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl LanguageModel for ScriptedModel {
        fn complete<'a>(
            &'a self,
            prompt: &'a str,
            _options: CompletionOptions,
        ) -> BoxFuture<'a, Result<String, AiError>> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let next = self.responses.lock().unwrap().pop();
            Box::pin(async move { next.ok_or(AiError::EmptyResponse) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedModel;
    use super::*;
    use crate::habits::{Category, Frequency, NewHabit};
    use chrono::{TimeZone, Utc};

    #[test]
    fn extract_json_strips_fences() {
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json("  {\"a\":1} "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn sentiment_is_validated() {
        let model = ScriptedModel::new([
            concat!(
                "```json\n",
                "{\"score\": 4, \"label\": \"positive\", \"confidence\": 1.4, ",
                "\"themes\": [\"work\"]}\n```",
            ),
            "{\"score\": 7, \"label\": \"positive\", \"confidence\": 0.5}",
            "{\"score\": 2, \"label\": \"gloomy\", \"confidence\": 0.5}",
            "not json at all",
        ]);

        let judgment = analyze_sentiment(&model, "Shipped the release today").await.unwrap();
        assert_eq!(judgment.score, 4);
        assert_eq!(judgment.label, SentimentLabel::Positive);
        assert_eq!(judgment.confidence, 1.0);
        assert_eq!(judgment.themes, vec!["work".to_string()]);

        assert!(matches!(analyze_sentiment(&model, "x").await, Err(AiError::Invalid(_))));
        assert!(matches!(analyze_sentiment(&model, "x").await, Err(AiError::Invalid(_))));
        assert!(matches!(analyze_sentiment(&model, "x").await, Err(AiError::Parse(_))));
        assert!(matches!(analyze_sentiment(&model, "x").await, Err(AiError::EmptyResponse)));
    }

    #[tokio::test]
    async fn coaching_reply_filters_unknown_habits() {
        let mut store = HabitStore::default();
        let created = Utc.with_ymd_and_hms(2023, 12, 1, 12, 0, 0).unwrap();
        let habit = store
            .add_habit(
                NewHabit {
                    name: "Meditate".into(),
                    description: None,
                    category: Category::Mindfulness,
                    frequency: Frequency::Daily,
                    target_days: None,
                    color: "#8b5cf6".into(),
                    icon: None,
                },
                created,
            )
            .unwrap();
        let today: DateKey = "2024-01-07".parse().unwrap();
        for offset in 0..7 {
            store.toggle_check_in(&habit.id, today.add_days(-offset), created, today);
        }

        let context = CoachingContext::gather(&store, &Journal::default(), today);
        assert_eq!(context.habits[0].completion_rate, 100);
        assert_eq!(context.habits[0].current_streak, 7);
        assert_eq!(context.habits[0].category, "mindfulness");

        let reply = format!(
            concat!(
                "{{\"message\": \"Great week!\", \"type\": \"celebration\", ",
                "\"relatedHabitIds\": [\"{}\", \"ghost\"]}}",
            ),
            habit.id
        );
        let model = ScriptedModel::new([reply]);
        let coaching = generate_coaching(&model, &context).await.unwrap();
        assert_eq!(coaching.kind, CoachingMessageType::Celebration);
        assert_eq!(coaching.related_habit_ids, vec![habit.id.clone()]);
        assert!(model.prompts.lock().unwrap()[0].contains("Meditate (mindfulness): 7 day streak"));
    }

    #[tokio::test]
    async fn coaching_rejects_unknown_type() {
        let model = ScriptedModel::new(["{\"message\": \"hi\", \"type\": \"rant\"}"]);
        let result = generate_coaching(&model, &CoachingContext::default()).await;
        assert!(matches!(result, Err(AiError::Invalid(_))));
    }

    #[tokio::test]
    async fn milestone_message_falls_back() {
        let model = ScriptedModel::new(Vec::<String>::new());
        let text = milestone_message(&model, "Reading", 30).await;
        assert!(text.contains("30 days of Reading"));

        let model = ScriptedModel::new(["  You did it!  "]);
        assert_eq!(milestone_message(&model, "Reading", 30).await, "You did it!");
    }

    #[tokio::test]
    async fn client_without_key_fails_fast() {
        let client = AnthropicClient::new(None, DEFAULT_MODEL).unwrap();
        assert!(!client.has_api_key());
        let result = client.complete("hello", CompletionOptions::default()).await;
        assert!(matches!(result, Err(AiError::MissingApiKey)));
    }
}
