//! Contract tests run against every adapter: the uniform capability set must
//! hold regardless of vendor wire shape.

use serde_json::json;

use taskforge_providers::{create_adapter, ChatTurn, ProviderAdapter, PROVIDERS};

fn adapters() -> Vec<Box<dyn ProviderAdapter>> {
    PROVIDERS
        .iter()
        .map(|(name, _)| create_adapter(name).unwrap())
        .collect()
}

/// Wrap plan text in each vendor's response envelope.
fn envelope_for(adapter_name: &str, text: &str) -> String {
    let envelope = match adapter_name {
        "anthropic" => json!({"content": [{"type": "text", "text": text}]}),
        "gemini" => json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}),
        "openai" | "mistral" => {
            json!({"choices": [{"message": {"role": "assistant", "content": text}}]})
        }
        other => panic!("unknown adapter {}", other),
    };
    envelope.to_string()
}

#[test]
fn test_names_match_detection_table() {
    for ((expected, env_var), adapter) in PROVIDERS.iter().zip(adapters()) {
        assert_eq!(adapter.name(), *expected);
        assert_eq!(adapter.api_key_env_var(), *env_var);
        assert!(!adapter.default_model().is_empty());
    }
}

#[test]
fn test_full_url_is_https_everywhere() {
    for adapter in adapters() {
        let url = adapter.full_url("test-key", adapter.default_model());
        assert!(url.starts_with("https://"), "{}: {}", adapter.name(), url);
    }
}

#[test]
fn test_only_gemini_puts_the_key_in_the_url() {
    for adapter in adapters() {
        let url = adapter.full_url("sekrit", adapter.default_model());
        if adapter.name() == "gemini" {
            assert!(url.contains("key=sekrit"));
        } else {
            assert!(!url.contains("sekrit"), "{} leaks the key", adapter.name());
        }
    }
}

#[test]
fn test_key_bearing_adapters_put_the_key_in_a_header() {
    for adapter in adapters() {
        let headers = adapter.headers("sekrit");
        let in_header = headers.iter().any(|(_, value)| value.contains("sekrit"));
        if adapter.name() == "gemini" {
            assert!(!in_header);
        } else {
            assert!(in_header, "{} must carry the key in a header", adapter.name());
        }
    }
}

#[test]
fn test_plan_parses_through_every_envelope() {
    let plan_text = r#"{"command":"WriteFile","path":"src/app.py","content":"print('hi')"}"#;
    for adapter in adapters() {
        let body = envelope_for(adapter.name(), plan_text);
        let plan = adapter.parse_plan(&body).unwrap();
        assert_eq!(plan.command, "WriteFile", "{}", adapter.name());
        assert_eq!(plan.path, "src/app.py");
        assert_eq!(plan.content, "print('hi')");
        assert!(!plan.request_execution);
    }
}

#[test]
fn test_chat_parses_through_every_envelope() {
    for adapter in adapters() {
        let body = envelope_for(adapter.name(), "plain reply");
        assert_eq!(adapter.parse_chat(&body).unwrap(), "plain reply");
    }
}

#[test]
fn test_malformed_body_names_the_adapter() {
    for adapter in adapters() {
        let err = adapter.parse_plan("{}").unwrap_err();
        assert!(
            err.to_string().contains(adapter.name()),
            "error must name {}: {}",
            adapter.name(),
            err
        );
    }
}

#[test]
fn test_plan_with_missing_fields_fails_everywhere() {
    let incomplete = r#"{"command":"WriteFile"}"#;
    for adapter in adapters() {
        let body = envelope_for(adapter.name(), incomplete);
        assert!(adapter.parse_plan(&body).is_err(), "{}", adapter.name());
    }
}

#[test]
fn test_conversation_payload_carries_every_turn() {
    let history = vec![
        ChatTurn::new("user", "first"),
        ChatTurn::new("assistant", "second"),
        ChatTurn::new("user", "third"),
    ];

    for adapter in adapters() {
        let payload =
            adapter.build_conversation_payload("sys", &history, adapter.default_model());
        let rendered = payload.to_string();
        for content in ["first", "second", "third"] {
            assert!(
                rendered.contains(content),
                "{} dropped turn '{}'",
                adapter.name(),
                content
            );
        }
    }
}

#[test]
fn test_single_turn_payload_carries_system_and_user() {
    for adapter in adapters() {
        let payload = adapter.build_single_turn_payload(
            "system words",
            "user words",
            adapter.default_model(),
        );
        let rendered = payload.to_string();
        assert!(rendered.contains("system words"), "{}", adapter.name());
        assert!(rendered.contains("user words"), "{}", adapter.name());
    }
}
