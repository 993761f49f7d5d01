use docqa_core::config::GenerationConfig;
use docqa_core::error::Error;
use docqa_llm::load_generator;

#[test]
fn missing_model_file_is_a_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = GenerationConfig {
        model_path: dir.path().join("mistral-7b.Q4_0.gguf"),
        tokenizer_path: dir.path().join("tokenizer.json"),
        ..GenerationConfig::default()
    };
    let err = load_generator(&cfg).err().expect("load must fail");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidConfig(_))), "got: {err}");
    assert!(err.to_string().contains("mistral-7b.Q4_0.gguf"));
}

#[test]
fn missing_tokenizer_is_reported_after_model() {
    let dir = tempfile::tempdir().expect("tempdir");
    let model = dir.path().join("model.gguf");
    std::fs::write(&model, b"not really gguf").expect("write");
    let cfg = GenerationConfig {
        model_path: model,
        tokenizer_path: dir.path().join("tokenizer.json"),
        ..GenerationConfig::default()
    };
    let err = load_generator(&cfg).err().expect("load must fail");
    assert!(err.to_string().contains("tokenizer file not found"), "got: {err}");
}
