//! Model config registry tests.

use std::fs;
use switchboard_core::{GenerationRequest, ToolChoice};
use switchboard_error::ConfigErrorKind;
use switchboard_interface::ConfigResolver;
use switchboard_server::ModelConfigLoader;

#[test]
fn test_load_from_path_registers_toml_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(
        dir.path().join("hermes.toml"),
        r#"
        model = "hermes-2-pro.gguf"
        system_prompt = "You are helpful."

        [parameters]
        n = 2
        max_tokens = 64
        "#,
    )?;
    fs::write(dir.path().join("mistral.toml"), "name = \"mistral-7b\"\n")?;
    fs::write(dir.path().join("hermes.tmpl"), "{{input}}")?;
    fs::write(dir.path().join("broken.toml"), "name = [")?;

    let loader = ModelConfigLoader::new();
    let loaded = loader.load_from_path(dir.path())?;

    assert_eq!(loaded, 2);
    assert_eq!(loader.list(), ["hermes", "mistral-7b"]);
    let hermes = loader.get("hermes").unwrap();
    assert_eq!(hermes.model, "hermes-2-pro.gguf");
    assert_eq!(hermes.parameters.n, 2);
    Ok(())
}

#[test]
fn test_load_file_reports_parse_errors() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bad.toml");
    fs::write(&path, "parameters = 3")?;

    let err = ModelConfigLoader::new().load_file(&path).unwrap_err();
    assert!(matches!(err.kind, ConfigErrorKind::Parse { .. }));

    let err = ModelConfigLoader::new()
        .load_file(&dir.path().join("absent.toml"))
        .unwrap_err();
    assert!(matches!(err.kind, ConfigErrorKind::FileRead { .. }));
    Ok(())
}

#[test]
fn test_request_overrides_are_layered_on_the_model() {
    let loader = ModelConfigLoader::new().with_default_n(4);

    let request = GenerationRequest::builder()
        .model("unregistered")
        .prompts(vec!["a".to_string(), "b".to_string()])
        .max_tokens(Some(16))
        .temperature(Some(0.2))
        .stop(vec!["\n".to_string()])
        .grammar(Some("root ::= \"a\"".to_string()))
        .tool_choice(ToolChoice::Function("get_time".into()))
        .build()
        .unwrap();

    let config = loader.resolve(&request).unwrap();
    assert_eq!(config.name, "unregistered");
    assert_eq!(config.parameters.n, 4);
    assert_eq!(config.prompt_strings.len(), 2);
    assert_eq!(config.parameters.max_tokens, Some(16));
    assert_eq!(config.parameters.temperature, Some(0.2));
    assert_eq!(config.parameters.stop, ["\n"]);
    assert_eq!(config.grammar.as_deref(), Some("root ::= \"a\""));
    assert_eq!(config.function_to_call(), Some("get_time"));

    let request = GenerationRequest::builder()
        .model("unregistered")
        .n(Some(1))
        .build()
        .unwrap();
    assert_eq!(loader.resolve(&request).unwrap().parameters.n, 1);
}

#[test]
fn test_empty_model_is_rejected() {
    let request = GenerationRequest::builder().model("").build().unwrap();
    let err = ModelConfigLoader::new().resolve(&request).unwrap_err();
    assert_eq!(err.kind, ConfigErrorKind::MissingModel);
}
