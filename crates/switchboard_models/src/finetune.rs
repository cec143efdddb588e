//! Reply post-processing.

use regex::Regex;
use switchboard_core::FinetuneConfig;
use tracing::warn;

/// Post-processes a raw backend reply.
///
/// Steps run in order: echo the prompt, remove every `cutstrings` match,
/// keep the first capture of `extract_regex`, trim each `trim_space` prefix
/// then whitespace, trim each `trim_suffix` then whitespace. Invalid
/// patterns are skipped with a warning.
///
/// # Examples
///
/// ```
/// use switchboard_core::FinetuneConfig;
/// use switchboard_models::finetune;
///
/// let config = FinetuneConfig {
///     cutstrings: vec![r"<\|im_end\|>".to_string()],
///     trim_space: vec!["ASSISTANT:".to_string()],
///     ..Default::default()
/// };
/// assert_eq!(finetune(&config, "prompt", "ASSISTANT:  Hello<|im_end|>"), "Hello");
/// ```
pub fn finetune(config: &FinetuneConfig, prompt: &str, reply: &str) -> String {
    let mut reply = if config.echo {
        format!("{}{}", prompt, reply)
    } else {
        reply.to_string()
    };

    for pattern in &config.cutstrings {
        if let Some(re) = compile(pattern) {
            reply = re.replace_all(&reply, "").into_owned();
        }
    }

    if let Some(re) = config.extract_regex.as_deref().and_then(compile) {
        if let Some(extracted) = re.captures(&reply).and_then(|c| c.get(1)) {
            reply = extracted.as_str().to_string();
        }
    }

    for prefix in &config.trim_space {
        reply = reply
            .strip_prefix(prefix.as_str())
            .unwrap_or(&reply)
            .trim()
            .to_string();
    }

    for suffix in &config.trim_suffix {
        reply = reply
            .strip_suffix(suffix.as_str())
            .unwrap_or(&reply)
            .trim()
            .to_string();
    }

    reply
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "Invalid finetune pattern, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_and_extract() {
        let config = FinetuneConfig {
            echo: true,
            extract_regex: Some(r"Answer: (\w+)".to_string()),
            ..Default::default()
        };
        assert_eq!(finetune(&config, "Q? Answer: ", "yes."), "yes");
    }

    #[test]
    fn test_trim_suffix() {
        let config = FinetuneConfig {
            trim_suffix: vec!["</s>".to_string()],
            ..Default::default()
        };
        assert_eq!(finetune(&config, "", " done </s>"), "done");
    }

    #[test]
    fn test_invalid_pattern_is_ignored() {
        let config = FinetuneConfig {
            cutstrings: vec!["(".to_string()],
            ..Default::default()
        };
        assert_eq!(finetune(&config, "", "unchanged"), "unchanged");
    }

    #[test]
    fn test_default_config_is_identity() {
        assert_eq!(finetune(&FinetuneConfig::default(), "p", " raw "), " raw ");
    }
}
