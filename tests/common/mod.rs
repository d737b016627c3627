//! Tiny Llama artifacts written to temporary directories.
//!
//! Every projection is zero and every embedding is one, so the final hidden
//! state is constant and `lm_head` alone decides the next token: the row set
//! to ones always wins.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use candle_core::{DType, Device, Tensor};

pub const HIDDEN: usize = 8;
pub const INTERMEDIATE: usize = 16;
pub const VOCAB: usize = 32;

pub const EOS_ID: usize = 2;
pub const HIGH_ID: usize = 12;
pub const BLOOD_ID: usize = 13;

pub const TOKENIZER_JSON: &str = r#"{
    "version": "1.0",
    "truncation": null,
    "padding": null,
    "added_tokens": [
        {"id": 0, "content": "<unk>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
        {"id": 1, "content": "<s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
        {"id": 2, "content": "</s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
        {"id": 3, "content": "<|system|>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": false},
        {"id": 4, "content": "</|system|>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": false},
        {"id": 5, "content": "<|user|>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": false},
        {"id": 6, "content": "</|user|>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": false},
        {"id": 7, "content": "<|assistant|>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": false}
    ],
    "normalizer": {"type": "Lowercase"},
    "pre_tokenizer": {"type": "Whitespace"},
    "post_processor": null,
    "decoder": null,
    "model": {
        "type": "WordLevel",
        "vocab": {
            "<unk>": 0, "<s>": 1, "</s>": 2,
            "<|system|>": 3, "</|system|>": 4, "<|user|>": 5, "</|user|>": 6, "<|assistant|>": 7,
            "what": 8, "is": 9, "hypertension": 10, "?": 11,
            "high": 12, "blood": 13, "pressure": 14, "kira": 15
        },
        "unk_token": "<unk>"
    }
}"#;

pub fn llama_config() -> String {
    format!(
        r#"{{
            "architectures": ["LlamaForCausalLM"],
            "hidden_size": {HIDDEN},
            "intermediate_size": {INTERMEDIATE},
            "vocab_size": {VOCAB},
            "num_hidden_layers": 1,
            "num_attention_heads": 2,
            "num_key_value_heads": 2,
            "rms_norm_eps": 1e-5,
            "rope_theta": 10000.0,
            "max_position_embeddings": 512,
            "bos_token_id": 1,
            "eos_token_id": {EOS_ID},
            "tie_word_embeddings": false
        }}"#
    )
}

/// Write a complete model whose greedy continuation is always `favourite`
pub fn write_model(dir: &Path, favourite: usize) {
    let device = Device::Cpu;
    let zeros = |shape: &[usize]| Tensor::zeros(shape, DType::F32, &device).unwrap();
    let ones = |shape: &[usize]| Tensor::ones(shape, DType::F32, &device).unwrap();

    let mut lm_head = vec![0f32; VOCAB * HIDDEN];
    lm_head[favourite * HIDDEN..(favourite + 1) * HIDDEN].fill(1.0);

    let mut tensors = HashMap::new();
    tensors.insert("model.embed_tokens.weight".to_string(), ones(&[VOCAB, HIDDEN]));
    for proj in ["q_proj", "k_proj", "v_proj", "o_proj"] {
        tensors.insert(
            format!("model.layers.0.self_attn.{proj}.weight"),
            zeros(&[HIDDEN, HIDDEN]),
        );
    }
    tensors.insert(
        "model.layers.0.mlp.gate_proj.weight".to_string(),
        zeros(&[INTERMEDIATE, HIDDEN]),
    );
    tensors.insert(
        "model.layers.0.mlp.up_proj.weight".to_string(),
        zeros(&[INTERMEDIATE, HIDDEN]),
    );
    tensors.insert(
        "model.layers.0.mlp.down_proj.weight".to_string(),
        zeros(&[HIDDEN, INTERMEDIATE]),
    );
    tensors.insert("model.layers.0.input_layernorm.weight".to_string(), ones(&[HIDDEN]));
    tensors.insert(
        "model.layers.0.post_attention_layernorm.weight".to_string(),
        ones(&[HIDDEN]),
    );
    tensors.insert("model.norm.weight".to_string(), ones(&[HIDDEN]));
    tensors.insert(
        "lm_head.weight".to_string(),
        Tensor::from_vec(lm_head, (VOCAB, HIDDEN), &device).unwrap(),
    );

    candle_core::safetensors::save(&tensors, dir.join("model.safetensors")).unwrap();
    fs::write(dir.join("config.json"), llama_config()).unwrap();
    fs::write(dir.join("tokenizer.json"), TOKENIZER_JSON).unwrap();
}

/// Write a PEFT adapter targeting q_proj and v_proj with factors of rank `r`
pub fn write_adapter(dir: &Path, r: usize, b_rows: usize) {
    let device = Device::Cpu;
    let mut tensors = HashMap::new();
    for proj in ["q_proj", "v_proj"] {
        let key = format!("base_model.model.model.layers.0.self_attn.{proj}");
        tensors.insert(
            format!("{key}.lora_A.weight"),
            (Tensor::ones((r, HIDDEN), DType::F32, &device).unwrap() * 0.1).unwrap(),
        );
        tensors.insert(
            format!("{key}.lora_B.weight"),
            Tensor::ones((b_rows, r), DType::F32, &device).unwrap(),
        );
    }

    candle_core::safetensors::save(&tensors, dir.join("adapter_model.safetensors")).unwrap();
    fs::write(
        dir.join("adapter_config.json"),
        format!(
            r#"{{
                "r": {r},
                "lora_alpha": 16,
                "target_modules": ["q_proj", "v_proj"],
                "base_model_name_or_path": "TinyLlama/TinyLlama-1.1B-Chat-v1.0"
            }}"#
        ),
    )
    .unwrap();
    fs::write(dir.join("tokenizer.json"), TOKENIZER_JSON).unwrap();
}

/// Write a PEFT adapter on `lm_head` whose delta makes `promoted` win
pub fn write_lm_head_adapter(dir: &Path, promoted: usize) {
    let device = Device::Cpu;
    let mut b = vec![0f32; VOCAB];
    b[promoted] = 1.0;

    let mut tensors = HashMap::new();
    tensors.insert(
        "base_model.model.lm_head.lora_A.weight".to_string(),
        Tensor::ones((1, HIDDEN), DType::F32, &device).unwrap(),
    );
    tensors.insert(
        "base_model.model.lm_head.lora_B.weight".to_string(),
        Tensor::from_vec(b, (VOCAB, 1), &device).unwrap(),
    );

    candle_core::safetensors::save(&tensors, dir.join("adapter_model.safetensors")).unwrap();
    fs::write(
        dir.join("adapter_config.json"),
        r#"{"r": 1, "lora_alpha": 16, "target_modules": ["lm_head"]}"#,
    )
    .unwrap();
    fs::write(dir.join("tokenizer.json"), TOKENIZER_JSON).unwrap();
}
