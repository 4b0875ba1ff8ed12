// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::domain::models::parser_config::ParserParameters;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// 按顺序返回预设结果的推理服务
struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ParserParameters, InferenceError>>>,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<ParserParameters, InferenceError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl InferenceProvider for ScriptedProvider {
    async fn generate(&self, request: &InferenceRequest) -> Result<ParserParameters, InferenceError> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(InferenceError::InvalidOutput("script exhausted".to_string())))
    }
}

/// 样本数超过上限时报告上下文溢出的推理服务
struct OverflowProvider {
    max_samples: usize,
    seen: Mutex<Vec<usize>>,
    last_input: Mutex<String>,
}

impl OverflowProvider {
    fn new(max_samples: usize) -> Self {
        Self {
            max_samples,
            seen: Mutex::new(Vec::new()),
            last_input: Mutex::new(String::new()),
        }
    }
}

#[async_trait]
impl InferenceProvider for OverflowProvider {
    async fn generate(&self, request: &InferenceRequest) -> Result<ParserParameters, InferenceError> {
        let samples = request.input.matches("<main>").count();
        self.seen.lock().push(samples);
        *self.last_input.lock() = request.input.clone();
        if samples > self.max_samples {
            return Err(InferenceError::ContextOverflow(
                "Your input exceeds the context window of this model".to_string(),
            ));
        }
        Ok(main_only())
    }
}

fn main_only() -> ParserParameters {
    ParserParameters::new(vec!["main"], vec![], vec!["script"], vec![])
}

fn synthesis_config(error_prompt: Option<&str>, reflection_prompt: Option<&str>) -> SynthesisConfig {
    SynthesisConfig {
        config_name: "test".to_string(),
        model: "test-model".to_string(),
        reasoning_level: "low".to_string(),
        instructions_prompt: "Base instructions".to_string(),
        input_prompt_template:
            "{html_content}\n{previous_parser_config}\n{parsed_content}\n{error_message}".to_string(),
        error_prompt: error_prompt.map(str::to_string),
        reflection_prompt: reflection_prompt.map(str::to_string),
    }
}

fn prefix_with_samples(count: usize) -> UrlPrefix {
    let mut prefix = UrlPrefix::new("https://example.com/docs");
    for i in 1..=count {
        prefix.add_sample(SampleUrl::new(
            format!("https://example.com/docs/{}", i),
            format!(
                "<html><body><nav>menu</nav><main><p>Sample {}</p></main></body></html>",
                i
            ),
        ));
    }
    prefix
}

#[tokio::test]
async fn test_context_overflow_degrades_sample_count() {
    let provider = Arc::new(OverflowProvider::new(2));
    let synthesizer = ParserSynthesizer::new(provider.clone(), synthesis_config(None, None));

    let parser = synthesizer
        .generate_parser(&prefix_with_samples(5))
        .await
        .unwrap();

    assert_eq!(*provider.seen.lock(), vec![5, 4, 3, 2]);
    let last_input = provider.last_input.lock().clone();
    assert!(last_input.contains("Sample 1"));
    assert!(last_input.contains("Sample 2"));
    assert!(!last_input.contains("Sample 3"));
    assert_eq!(parser.config.prefix_name, "https://example.com/docs");
    assert!(parser.config.parameters.root.contains("main"));
}

#[tokio::test]
async fn test_context_exhausted_when_no_sample_fits() {
    let provider = Arc::new(OverflowProvider::new(0));
    let synthesizer = ParserSynthesizer::new(provider.clone(), synthesis_config(None, None));

    let result = synthesizer.generate_parser(&prefix_with_samples(3)).await;

    assert!(matches!(result, Err(SynthesisError::ContextExhausted)));
    assert_eq!(*provider.seen.lock(), vec![3, 2, 1]);
}

#[tokio::test]
async fn test_no_usable_samples() {
    let mut prefix = UrlPrefix::new("https://example.com/docs");
    prefix.sample_urls.push(SampleUrl {
        url: "https://example.com/docs/a".to_string(),
        raw_content: None,
        label: None,
    });
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let synthesizer = ParserSynthesizer::new(provider.clone(), synthesis_config(None, None));

    let result = synthesizer.generate_parser(&prefix).await;

    assert!(matches!(result, Err(SynthesisError::NoSamples)));
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn test_validation_failure_is_repaired_once() {
    let broken = ParserParameters::new(vec!["main"], vec![], vec!["div["], vec![]);
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(broken), Ok(main_only())]));
    let synthesizer = ParserSynthesizer::new(
        provider.clone(),
        synthesis_config(Some("Fix the selectors."), None),
    );

    let parser = synthesizer
        .generate_parser(&prefix_with_samples(2))
        .await
        .unwrap();

    assert_eq!(&parser.config.parameters, &main_only());
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].reasoning_effort, "low");
    assert_eq!(requests[1].instructions, "Base instructions\nFix the selectors.");
    assert_eq!(requests[1].reasoning_effort, "minimal");
    assert!(requests[1].input.contains("Here is the error message:"));
    assert!(requests[1].input.contains("Here is the previous parser config:"));
    assert_eq!(requests[1].input.matches("<main>").count(), 1);
}

#[tokio::test]
async fn test_failed_repair_is_terminal() {
    let broken = ParserParameters::new(vec![], vec![], vec!["div["], vec![]);
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(broken.clone()), Ok(broken)]));
    let synthesizer = ParserSynthesizer::new(
        provider.clone(),
        synthesis_config(Some("Fix the selectors."), None),
    );

    let result = synthesizer.generate_parser(&prefix_with_samples(2)).await;

    assert!(matches!(result, Err(SynthesisError::ValidationFailed { .. })));
    assert_eq!(provider.requests().len(), 2);
}

#[tokio::test]
async fn test_validation_failure_without_error_prompt() {
    let broken = ParserParameters::new(vec!["main["], vec![], vec![], vec![]);
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(broken)]));
    let synthesizer = ParserSynthesizer::new(provider.clone(), synthesis_config(None, None));

    let result = synthesizer.generate_parser(&prefix_with_samples(1)).await;

    match result {
        Err(SynthesisError::ValidationFailed { url, .. }) => {
            assert_eq!(url, "https://example.com/docs/1");
        }
        other => panic!("unexpected result: {:?}", other.map(|p| p.config)),
    }
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn test_reflection_merges_per_sample_configs() {
    let first = ParserParameters::new(vec!["main"], vec![], vec![], vec![]);
    let reflected_a = ParserParameters::new(vec!["main"], vec![], vec!["nav"], vec![]);
    let reflected_b = ParserParameters::new(vec!["main"], vec![], vec!["footer"], vec![]);
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(first),
        Ok(reflected_a),
        Ok(reflected_b),
    ]));
    let synthesizer = ParserSynthesizer::new(
        provider.clone(),
        synthesis_config(None, Some("Check the output.")),
    );

    let parser = synthesizer
        .generate_parser(&prefix_with_samples(2))
        .await
        .unwrap();

    let expected = ParserParameters::new(vec!["main"], vec![], vec!["footer", "nav"], vec![]);
    assert_eq!(&parser.config.parameters, &expected);

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].instructions, "Base instructions\nCheck the output.");
    assert!(requests[1]
        .input
        .contains("Here is the parsed content based on the previous parser config: Sample 1"));
    assert!(requests[2].input.contains("Sample 2"));
}

#[tokio::test]
async fn test_other_provider_errors_propagate() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(InferenceError::Api {
        status: 500,
        code: None,
        message: "boom".to_string(),
    })]));
    let synthesizer = ParserSynthesizer::new(provider.clone(), synthesis_config(None, None));

    let result = synthesizer.generate_parser(&prefix_with_samples(3)).await;

    assert!(matches!(
        result,
        Err(SynthesisError::Inference(InferenceError::Api { status: 500, .. }))
    ));
    assert_eq!(provider.requests().len(), 1);
}

#[test]
fn test_fill_template() {
    let filled = fill_template(
        "A={a} B={b} {{literal}} {unknown} }}",
        &[("a", "1"), ("b", "{a}")],
    );
    assert_eq!(filled, "A=1 B={a} {literal} {unknown} }");
}
