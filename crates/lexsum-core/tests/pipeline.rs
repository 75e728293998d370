//! Properties of request preparation and end-to-end summarization, using a
//! character tokenizer and an echoing step model in place of real weights.

mod common;

use common::{CharTokenizer, EOS, FailingGenerator, PAD, RecordingGenerator, char_ids, echo_handle};
use lexsum_core::{
    Device, GenerationConfig, GenerationError, SummarizerConfig, prepare_request, summarize,
};

fn text_of_len(n: usize) -> String {
    "Whereas the parties agree. ".chars().cycle().take(n).collect()
}

#[test]
fn encoder_sequence_is_always_encoder_max_len() {
    let config = SummarizerConfig::default();
    for n in [0, 1, 99, 1000, 4094, 4095, 5000, 5001, 20_000] {
        let request = prepare_request(&text_of_len(n), &CharTokenizer, &config).unwrap();
        assert_eq!(request.input_ids.len(), 4096, "text length {}", n);
        assert_eq!(request.attention_mask.len(), 4096);
        assert_eq!(request.global_attention_mask.len(), 4096);
    }
}

#[test]
fn global_attention_marks_exactly_index_zero() {
    let config = SummarizerConfig {
        encoder_max_len: 64,
        ..Default::default()
    };
    for n in [0, 10, 500] {
        let request = prepare_request(&text_of_len(n), &CharTokenizer, &config).unwrap();
        assert_eq!(request.global_attention_mask[0], 1);
        assert_eq!(request.global_attention_mask.iter().sum::<u32>(), 1);
    }
}

#[test]
fn short_text_is_padded_with_pad_token() {
    let config = SummarizerConfig {
        encoder_max_len: 16,
        ..Default::default()
    };
    let request = prepare_request("abc", &CharTokenizer, &config).unwrap();
    assert_eq!(request.real_tokens(), 5);
    assert_eq!(&request.input_ids[1..4], char_ids("abc").as_slice());
    assert_eq!(request.input_ids[4], EOS);
    assert!(request.input_ids[5..].iter().all(|&id| id == PAD));
    assert!(request.attention_mask[5..].iter().all(|&m| m == 0));
}

#[test]
fn long_text_is_truncated_from_the_end() {
    let config = SummarizerConfig {
        encoder_max_len: 8,
        ..Default::default()
    };
    let request = prepare_request("abcdefghijklmnop", &CharTokenizer, &config).unwrap();
    assert_eq!(&request.input_ids[1..7], char_ids("abcdef").as_slice());
    assert_eq!(request.input_ids[7], EOS);
    assert_eq!(request.real_tokens(), 8);
}

#[test]
fn text_is_cut_to_max_input_chars_before_tokenizing() {
    let config = SummarizerConfig {
        encoder_max_len: 8192,
        ..Default::default()
    };
    let request = prepare_request(&text_of_len(6000), &CharTokenizer, &config).unwrap();
    // 5000 characters plus <s> and </s>
    assert_eq!(request.real_tokens(), 5002);
}

#[test]
fn request_is_placed_on_generator_device() {
    let generator = RecordingGenerator::new(Device::Cuda { ordinal: 1 }, vec![EOS, EOS]);
    let config = SummarizerConfig::default();
    summarize("some text", &CharTokenizer, &generator, &config).unwrap();

    let (request, gen_config) = generator.seen.lock().unwrap().take().unwrap();
    assert_eq!(request.device, Device::Cuda { ordinal: 1 });
    assert_eq!(gen_config, GenerationConfig::default());
}

#[test]
fn decoding_drops_special_tokens_and_whitespace() {
    let mut output = vec![EOS, 0];
    output.extend(char_ids("  The court held.\n"));
    output.push(EOS);
    let generator = RecordingGenerator::new(Device::Cpu, output);
    let summary =
        summarize("irrelevant", &CharTokenizer, &generator, &SummarizerConfig::default()).unwrap();
    assert_eq!(summary.text, "The court held.");
}

#[test]
fn generation_failure_propagates() {
    let err = summarize(
        "text",
        &CharTokenizer,
        &FailingGenerator,
        &SummarizerConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GenerationError::Inference(_)));
}

#[test]
fn tokenization_failure_propagates() {
    let generator = RecordingGenerator::new(Device::Cpu, vec![EOS]);
    let err = summarize("日本", &CharTokenizer, &generator, &SummarizerConfig::default()).unwrap_err();
    assert!(matches!(err, GenerationError::Tokenization(_)));
    assert!(generator.seen.lock().unwrap().is_none());
}

#[test]
fn generated_length_stays_within_bounds() {
    let handle = echo_handle(Device::Cpu);
    let config = SummarizerConfig::default();
    for n in [20, 300, 800] {
        let summary = handle.summarize(&text_of_len(n), &config).unwrap();
        assert!(
            summary.generated_tokens >= 128 && summary.generated_tokens <= 512,
            "{} tokens for input of {} chars",
            summary.generated_tokens,
            n
        );
        assert!(!summary.text.is_empty());
    }
}

#[test]
fn summarization_is_deterministic() {
    let handle = echo_handle(Device::Cpu);
    let config = SummarizerConfig {
        decoder_max_len: 96,
        generation: GenerationConfig {
            min_length: 16,
            ..Default::default()
        },
        ..Default::default()
    };
    let text = text_of_len(400);
    let first = handle.summarize(&text, &config).unwrap();
    let second = handle.summarize(&text, &config).unwrap();
    assert_eq!(first, second);
}
