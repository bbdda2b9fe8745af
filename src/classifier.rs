//! Free-text triage
//!
//! Maps a user's free-text search onto one of the five [`Category`] values
//! plus a short message. Three strategies sit behind the [`Classifier`]
//! trait:
//!
//! - [`SemanticClassifier`]: asks an external [`LanguageModel`]; on any
//!   failure it degrades to a substring search and an apology message.
//! - [`KeywordClassifier`]: ordered keyword groups, first match wins; no
//!   message.
//! - [`PassthroughClassifier`]: never resolves a category, so every search
//!   is a substring search.
//!
//! A result with no category tells the query layer to match the search text
//! against resource titles and descriptions instead.

use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{DirectoryError, Result};
use crate::model::{GeminiConfig, GeminiModel, LanguageModel};
use crate::resource::Category;

/// Message returned when the external model could not be used
pub const FALLBACK_MESSAGE: &str =
    "I'm having trouble connecting to my AI brain, but here are some search results.";

/// Keyword groups, checked in order against the lower-cased input
const KEYWORD_RULES: &[(Category, &[&str])] = &[
    (Category::Anxiety, &["anxi", "worr", "panic"]),
    (Category::Depression, &["depress", "sad", "hopeless"]),
    (Category::Stress, &["stress", "overwhelm", "burnout"]),
    (Category::Crisis, &["crisis", "suicid", "emergency", "kill"]),
];

/// Outcome of classifying one search
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Resolved category; `None` means "fall back to a text match"
    pub category: Option<Category>,
    /// Short human-readable reply, possibly empty
    pub message: String,
}

impl ClassificationResult {
    pub fn resolved(category: Category, message: impl Into<String>) -> Self {
        Self {
            category: Some(category),
            message: message.into(),
        }
    }

    pub fn text_match(message: impl Into<String>) -> Self {
        Self {
            category: None,
            message: message.into(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.category.is_some()
    }
}

/// Maps free text to a category. Implementations never fail: problems are
/// absorbed into a text-match result.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Strategy name, for logs and the health endpoint
    fn name(&self) -> &'static str;

    async fn classify(&self, text: &str) -> ClassificationResult;
}

/// Deterministic keyword rules
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// First keyword group contained in `text`, case-insensitively
    pub fn resolve(&self, text: &str) -> Option<Category> {
        let lower = text.to_lowercase();
        KEYWORD_RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(category, _)| *category)
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn classify(&self, text: &str) -> ClassificationResult {
        match self.resolve(text) {
            Some(category) => ClassificationResult::resolved(category, ""),
            None => ClassificationResult::text_match(""),
        }
    }
}

/// Skips classification entirely
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughClassifier;

#[async_trait]
impl Classifier for PassthroughClassifier {
    fn name(&self) -> &'static str {
        "off"
    }

    async fn classify(&self, _text: &str) -> ClassificationResult {
        ClassificationResult::text_match("")
    }
}

/// What the semantic classifier does when the model call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Substring search over title/description
    #[default]
    TextMatch,
    /// Run the keyword rules, then substring search if none match
    Keyword,
}

/// Classification backed by an external language model
pub struct SemanticClassifier {
    model: Arc<dyn LanguageModel>,
    keywords: KeywordClassifier,
    fallback: FallbackPolicy,
    cache: Option<Mutex<LruCache<String, ClassificationResult>>>,
}

impl SemanticClassifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            keywords: KeywordClassifier,
            fallback: FallbackPolicy::default(),
            cache: None,
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Memoise successful classifications; 0 disables the cache
    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        self
    }

    /// Ask the model, without any fallback
    pub async fn try_classify(&self, text: &str) -> Result<ClassificationResult> {
        let key = text.trim().to_lowercase();
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.lock().await.get(&key) {
                debug!("Classification cache hit for {:?}", key);
                return Ok(hit.clone());
            }
        }

        let prompt = build_prompt(text);
        let raw = self.model.generate(&prompt).await?;
        let result = parse_model_reply(&raw)?;

        if let Some(cache) = &self.cache {
            cache.lock().await.put(key, result.clone());
        }

        Ok(result)
    }

    fn degraded(&self, text: &str) -> ClassificationResult {
        match self.fallback {
            FallbackPolicy::TextMatch => ClassificationResult::text_match(FALLBACK_MESSAGE),
            FallbackPolicy::Keyword => ClassificationResult {
                category: self.keywords.resolve(text),
                message: FALLBACK_MESSAGE.to_string(),
            },
        }
    }
}

#[async_trait]
impl Classifier for SemanticClassifier {
    fn name(&self) -> &'static str {
        "semantic"
    }

    async fn classify(&self, text: &str) -> ClassificationResult {
        match self.try_classify(text).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    "Model {} could not classify search, falling back: {}",
                    self.model.id(),
                    e
                );
                self.degraded(text)
            }
        }
    }
}

/// Instruction prompt sent to the model; the user text is embedded verbatim
pub fn build_prompt(text: &str) -> String {
    let categories = Category::ALL
        .iter()
        .map(Category::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a mental health triage assistant.\n\
         User Input: \"{text}\"\n\
         \n\
         Task 1: Classify this input into EXACTLY one of these categories: {categories}.\n\
         Task 2: Write a short, empathetic, 1-sentence response to the user.\n\
         \n\
         Return JSON format only: {{ \"category\": \"...\", \"message\": \"...\" }}\n"
    )
}

/// Remove a surrounding markdown code fence (optionally tagged `json`)
pub fn strip_code_fence(raw: &str) -> &str {
    let mut body = raw.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    category: String,
    #[serde(default)]
    message: String,
}

/// Parse the model's reply. A category outside the five known values is an
/// error, so the caller takes the fallback path.
pub fn parse_model_reply(raw: &str) -> Result<ClassificationResult> {
    let reply: ModelReply = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| DirectoryError::Classifier(format!("unparsable model reply: {}", e)))?;

    let category = Category::from_str(reply.category.trim()).map_err(|_| {
        DirectoryError::Classifier(format!(
            "model returned unknown category `{}`",
            reply.category
        ))
    })?;

    Ok(ClassificationResult::resolved(category, reply.message.trim()))
}

/// Which strategy to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// External model, degrading to substring search on failure
    #[default]
    Semantic,
    /// Keyword rules only
    Keyword,
    /// No classification; plain substring search
    Off,
}

/// Classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub mode: ClassifierMode,
    pub model: GeminiConfig,
    /// Capacity of the semantic result cache (0 disables)
    pub cache_size: usize,
    pub fallback: FallbackPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode: ClassifierMode::Semantic,
            model: GeminiConfig::default(),
            cache_size: 256,
            fallback: FallbackPolicy::TextMatch,
        }
    }
}

impl ClassifierConfig {
    /// Keyword rules only
    pub fn keyword() -> Self {
        Self {
            mode: ClassifierMode::Keyword,
            ..Default::default()
        }
    }
}

/// Build the configured classifier. Semantic mode without an API key runs
/// the keyword rules instead.
pub fn build_classifier(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>> {
    let classifier: Arc<dyn Classifier> = match config.mode {
        ClassifierMode::Semantic if config.model.has_api_key() => {
            let model = GeminiModel::new(&config.model)?;
            Arc::new(
                SemanticClassifier::new(Arc::new(model))
                    .with_fallback(config.fallback)
                    .with_cache(config.cache_size),
            )
        }
        ClassifierMode::Semantic => {
            warn!("No model API key configured; using keyword classification");
            Arc::new(KeywordClassifier)
        }
        ClassifierMode::Keyword => Arc::new(KeywordClassifier),
        ClassifierMode::Off => Arc::new(PassthroughClassifier),
    };

    info!("Search classifier: {}", classifier.name());
    Ok(classifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedModel {
        reply: Result<String>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(DirectoryError::Classifier("connection refused".into())),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        fn id(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(DirectoryError::Classifier(e.to_string())),
            }
        }
    }

    #[test]
    fn test_keyword_rules() {
        let k = KeywordClassifier::new();
        assert_eq!(k.resolve("I keep WORRYING"), Some(Category::Anxiety));
        assert_eq!(k.resolve("feeling sad lately"), Some(Category::Depression));
        assert_eq!(k.resolve("work burnout"), Some(Category::Stress));
        assert_eq!(k.resolve("this is an emergency"), Some(Category::Crisis));
        assert_eq!(k.resolve("weekend retreat"), None);
    }

    #[test]
    fn test_keyword_first_group_wins() {
        let k = KeywordClassifier::new();
        // Both Anxiety and Crisis keywords present; Anxiety is checked first.
        assert_eq!(k.resolve("panic emergency"), Some(Category::Anxiety));
        assert_eq!(k.resolve("stressed and sad"), Some(Category::Depression));
    }

    #[test]
    fn test_panic_always_anxiety() {
        let k = KeywordClassifier::new();
        for input in ["panic", "PANIC!!", "x-Panic-y 123", "suicidal panic", "sad panic"] {
            assert_eq!(k.resolve(input), Some(Category::Anxiety), "{}", input);
        }
    }

    #[tokio::test]
    async fn test_keyword_classify_has_no_message() {
        let result = KeywordClassifier.classify("so anxious").await;
        assert_eq!(result, ClassificationResult::resolved(Category::Anxiety, ""));

        let result = KeywordClassifier.classify("retreat").await;
        assert!(!result.is_resolved());
        assert!(result.message.is_empty());
    }

    #[tokio::test]
    async fn test_passthrough_never_resolves() {
        let result = PassthroughClassifier.classify("panic attack").await;
        assert_eq!(result, ClassificationResult::text_match(""));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_model_reply() {
        let result = parse_model_reply(
            "```json\n{ \"category\": \"Stress\", \"message\": \"That sounds like a lot.\" }\n```",
        )
        .unwrap();
        assert_eq!(
            result,
            ClassificationResult::resolved(Category::Stress, "That sounds like a lot.")
        );
    }

    #[test]
    fn test_parse_model_reply_rejects_bad_output() {
        assert!(parse_model_reply("I think it's anxiety").is_err());
        assert!(parse_model_reply("{\"message\":\"hi\"}").is_err());
        assert!(parse_model_reply("{\"category\":\"Grief\",\"message\":\"hi\"}").is_err());
    }

    #[test]
    fn test_prompt_embeds_text_and_categories() {
        let prompt = build_prompt("I can't sleep");
        assert!(prompt.contains("User Input: \"I can't sleep\""));
        assert!(prompt.contains("Anxiety, Depression, Stress, Crisis"));
        assert!(prompt.contains("\"category\""));
    }

    #[tokio::test]
    async fn test_semantic_success() {
        let model = Arc::new(ScriptedModel::replying(
            "{\"category\":\"Depression\",\"message\":\"You are not alone.\"}",
        ));
        let classifier = SemanticClassifier::new(model);
        let result = classifier.classify("everything feels grey").await;
        assert_eq!(
            result,
            ClassificationResult::resolved(Category::Depression, "You are not alone.")
        );
    }

    #[tokio::test]
    async fn test_semantic_failure_falls_back_to_text_match() {
        let classifier = SemanticClassifier::new(Arc::new(ScriptedModel::failing()));
        let result = classifier.classify("I feel anxious").await;
        assert_eq!(result, ClassificationResult::text_match(FALLBACK_MESSAGE));
    }

    #[tokio::test]
    async fn test_semantic_unknown_category_falls_back() {
        let model = Arc::new(ScriptedModel::replying(
            "{\"category\":\"Loneliness\",\"message\":\"hi\"}",
        ));
        let result = SemanticClassifier::new(model).classify("lonely").await;
        assert!(!result.is_resolved());
        assert_eq!(result.message, FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn test_semantic_keyword_fallback_policy() {
        let classifier = SemanticClassifier::new(Arc::new(ScriptedModel::failing()))
            .with_fallback(FallbackPolicy::Keyword);
        let result = classifier.classify("I feel anxious").await;
        assert_eq!(
            result,
            ClassificationResult::resolved(Category::Anxiety, FALLBACK_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_cache_skips_repeat_calls() {
        let model = Arc::new(ScriptedModel::replying(
            "{\"category\":\"Stress\",\"message\":\"Take a breath.\"}",
        ));
        let classifier = SemanticClassifier::new(model.clone()).with_cache(8);

        classifier.classify("Too much work").await;
        classifier.classify("  too much WORK ").await;
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let model = Arc::new(ScriptedModel::failing());
        let classifier = SemanticClassifier::new(model.clone()).with_cache(8);

        classifier.classify("help").await;
        classifier.classify("help").await;
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_build_classifier_modes() {
        let semantic_without_key = build_classifier(&ClassifierConfig::default()).unwrap();
        assert_eq!(semantic_without_key.name(), "keyword");

        let off = build_classifier(&ClassifierConfig {
            mode: ClassifierMode::Off,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(off.name(), "off");

        let mut config = ClassifierConfig::default();
        config.model.api_key = Some("test-key".into());
        assert_eq!(build_classifier(&config).unwrap().name(), "semantic");
    }
}
