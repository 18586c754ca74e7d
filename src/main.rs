use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing_subscriber::EnvFilter;

use cadence_interview::console::{ConsoleAnswerSource, ConsolePresenter};
use cadence_interview::corpus::{
    CategoryType, CorpusManager, CorpusStore, CsvCorpusStore, LlmQuestionGenerator,
    QuestionTemplate, UsedDefaults, default_questions,
};
use cadence_interview::extract::{KeywordHobbyExtractor, KeywordProfessionClassifier};
use cadence_interview::llm::{AnthropicClient, OfflineModel};
use cadence_interview::ports::{AnswerSource, LanguageModel, Presenter, QuestionGenerator};
use cadence_interview::voice::{
    AudioCapture, AudioPlayback, PLAYBACK_SAMPLE_RATE, SAMPLE_RATE, Speaker, SpeechToText,
    TextToSpeech, VoiceAnswerSource, VoicePresenter, calculate_energy, load_wav,
};
use cadence_interview::willingness::{WillingnessEstimator, WillingnessTier};
use cadence_interview::{
    Collaborators, Config, Error, FileRecorder, FollowupUnit, Interviewer, SessionReport,
};

/// Cadence - an interviewer that adapts to how much you want to talk
#[derive(Parser)]
#[command(name = "cadence", version, about)]
struct Cli {
    /// Name of the person being interviewed; asked for when omitted
    #[arg(short, long)]
    name: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Type answers and read prompts instead of speaking
    #[arg(long)]
    text: bool,

    /// Seed question choice and the follow-up gate for a repeatable session
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Score the willingness of a recorded answer
    Estimate {
        /// WAV file to score
        path: PathBuf,
    },
    /// Generate and store a question dataset now
    Generate {
        /// main, subcategory or hobby
        category_type: CategoryType,
        /// Industry, profession or hobby name
        name: String,
    },
    /// List the questions a category would be served from
    Questions {
        /// main, subcategory or hobby
        category_type: CategoryType,
        /// Industry, profession or hobby name
        name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,cadence_interview=info",
        1 => "info,cadence_interview=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Handle subcommands
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&text).await,
            Command::Estimate { path } => estimate(&path),
            Command::Generate {
                category_type,
                name,
            } => generate(category_type, &name).await,
            Command::Questions {
                category_type,
                name,
            } => list_questions(category_type, &name),
        };
    }

    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    interview(config, cli.name, cli.text, cli.seed).await
}

/// Run one full interview
async fn interview(
    config: Config,
    name: Option<String>,
    text_mode: bool,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let mut seeds = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

    let llm = language_model(&config)?;
    let store = Arc::new(CsvCorpusStore::new(&config.paths.questions_dir)?);
    let generator = Arc::new(LlmQuestionGenerator::new(Arc::clone(&llm)));
    let corpus = CorpusManager::new(
        store,
        generator,
        UsedDefaults::new(),
        StdRng::seed_from_u64(seeds.next_u64()),
    );
    let followup = FollowupUnit::new(
        llm,
        config.interview.followup,
        StdRng::seed_from_u64(seeds.next_u64()),
    );

    let (presenter, source): (Box<dyn Presenter>, Box<dyn AnswerSource>) = if text_mode {
        tracing::info!("text mode: type your answers, one line each");
        (
            Box::new(ConsolePresenter::stdout()),
            Box::new(ConsoleAnswerSource::stdin()),
        )
    } else {
        voice_adapters(&config)?
    };

    let parts = Collaborators {
        corpus,
        followup,
        estimator: WillingnessEstimator::default(),
        hobbies: Box::new(KeywordHobbyExtractor::new()),
        presenter,
        source,
        sink: Box::new(FileRecorder::new(&config.paths.responses_dir)?),
    };
    let mut interviewer = Interviewer::new(
        parts,
        config.interview.session,
        StdRng::seed_from_u64(seeds.next_u64()),
    );

    let classifier = KeywordProfessionClassifier::new();
    let profile = match interviewer.intake(&classifier, name).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            tracing::info!("interview ended during introductions");
            return Ok(());
        }
        Err(Error::Terminated) => {
            tracing::info!("interrupted during introductions");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let report = interviewer.run(&profile).await?;
    print_report(&report);
    Ok(())
}

/// The configured language model, or an offline stand-in without a key
fn language_model(config: &Config) -> anyhow::Result<Arc<dyn LanguageModel>> {
    let Some(key) = config.api_keys.anthropic_secret() else {
        tracing::warn!("ANTHROPIC_API_KEY not set; follow-ups and question generation disabled");
        return Ok(Arc::new(OfflineModel));
    };

    let mut client = AnthropicClient::new(key)?;
    if let Some(model) = &config.llm_model {
        client = client.with_model(model.clone());
    }
    tracing::info!(model = client.model(), "language model ready");
    Ok(Arc::new(client))
}

/// Microphone and speaker adapters sharing one speaker
fn voice_adapters(config: &Config) -> anyhow::Result<(Box<dyn Presenter>, Box<dyn AnswerSource>)> {
    let voice = &config.voice;

    let tts_key = voice.tts_key(&config.api_keys).ok_or_else(|| {
        anyhow::anyhow!("no API key for {:?} text to speech", voice.tts_provider)
    })?;
    let mut tts = TextToSpeech::new(voice.tts_provider, tts_key)?.with_speed(voice.tts_speed);
    if let Some(model) = &voice.tts_model {
        tts = tts.with_model(model.clone());
    }
    if let Some(name) = &voice.tts_voice {
        tts = tts.with_voice(name.clone());
    }

    let stt_key = voice.stt_key(&config.api_keys).ok_or_else(|| {
        anyhow::anyhow!("no API key for {:?} speech to text", voice.stt_provider)
    })?;
    let stt = SpeechToText::new(voice.stt_provider, stt_key, voice.stt_model.clone())?
        .with_language(voice.language.clone());

    let playback = AudioPlayback::open(voice.output_device.as_deref())?;
    let capture = AudioCapture::open(voice.input_device.as_deref())?;
    let speaker = Arc::new(Speaker::new(tts, playback));

    let presenter = VoicePresenter::new(Arc::clone(&speaker))
        .with_recordings(config.paths.recordings_dir.clone());
    let source = VoiceAnswerSource::new(capture, stt, voice.segmenter)
        .with_speaker(speaker)
        .with_recordings(config.paths.recordings_dir.clone());

    Ok((Box::new(presenter), Box::new(source)))
}

fn print_report(report: &SessionReport) {
    println!("\n--- Session {} ---", report.state);
    if let Some(reason) = report.abort_reason {
        println!("Ended early: {reason:?}");
    }
    println!("Questions asked: {}", report.questions.len());
    if let Some(hobby) = &report.hobby {
        println!("Hobby explored: {hobby}");
    }
    println!(
        "Final willingness: {} ({:.3})",
        report.willingness.tier, report.willingness.score
    );
    if let Some(overall) = report.gaps.overall {
        println!(
            "Response-to-prompt gap: mean {:.2}s, min {:.2}s, max {:.2}s over {}",
            overall.mean, overall.min, overall.max, overall.count
        );
    }
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (PLAYBACK_SAMPLE_RATE as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!(
        "Playing {} samples at {} Hz...",
        samples.len(),
        PLAYBACK_SAMPLE_RATE
    );

    playback.play(samples).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Test TTS output through the configured provider
async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load()?;
    let voice = &config.voice;
    let key = voice.tts_key(&config.api_keys).ok_or_else(|| {
        anyhow::anyhow!("no API key for {:?} text to speech", voice.tts_provider)
    })?;

    let mut tts = TextToSpeech::new(voice.tts_provider, key)?.with_speed(voice.tts_speed);
    if let Some(name) = &voice.tts_voice {
        tts = tts.with_voice(name.clone());
    }
    println!("Voice: {}", tts.voice());

    let speaker = Speaker::new(tts, AudioPlayback::open(voice.output_device.as_deref())?);
    println!("Synthesizing and playing...");
    let (first_audible_at, mp3) = speaker.say(text).await?;
    println!("Got {} bytes of audio, audible at {first_audible_at}", mp3.len());

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// Score a recorded answer
fn estimate(path: &std::path::Path) -> anyhow::Result<()> {
    let (samples, sample_rate) = load_wav(path)?;
    let estimate = WillingnessEstimator::default().estimate(&samples, sample_rate);

    #[allow(clippy::cast_precision_loss)]
    let seconds = samples.len() as f64 / f64::from(sample_rate.max(1));
    println!("{}: {seconds:.1}s at {sample_rate} Hz", path.display());
    println!("Tier:  {}", estimate.tier);
    println!("Score: {:.3}", estimate.score);
    println!("  volume:          {:.3}", estimate.breakdown.volume);
    println!("  speech activity: {:.3}", estimate.breakdown.speech_activity);
    println!("  engagement:      {:.3}", estimate.breakdown.engagement);
    Ok(())
}

/// Generate and store a dataset for one category
async fn generate(category_type: CategoryType, name: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let key = config
        .api_keys
        .anthropic_secret()
        .ok_or_else(|| anyhow::anyhow!("ANTHROPIC_API_KEY is required to generate questions"))?;
    let mut client = AnthropicClient::new(key)?;
    if let Some(model) = &config.llm_model {
        client = client.with_model(model.clone());
    }

    let store = CsvCorpusStore::new(&config.paths.questions_dir)?;
    let generator = LlmQuestionGenerator::new(Arc::new(client));

    println!("Generating {category_type} questions for \"{name}\"...");
    let questions = generator.generate_batch(category_type, name).await?;
    store.save(category_type, name, &questions)?;

    print_by_tier(&questions);
    println!(
        "\nSaved {} questions to {}",
        questions.len(),
        store.path_for(category_type, name).display()
    );
    Ok(())
}

/// Show a stored dataset, or the defaults when none exists
fn list_questions(category_type: CategoryType, name: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = CsvCorpusStore::new(&config.paths.questions_dir)?;

    let questions = if store.exists(category_type, name) {
        println!("Stored dataset: {}", store.path_for(category_type, name).display());
        store.load(category_type, name)?
    } else {
        println!("No stored dataset; built-in defaults:");
        default_questions(category_type, name)
    };

    print_by_tier(&questions);
    Ok(())
}

fn print_by_tier(questions: &[QuestionTemplate]) {
    for tier in [
        WillingnessTier::Low,
        WillingnessTier::Medium,
        WillingnessTier::High,
    ] {
        let in_tier: Vec<_> = questions.iter().filter(|q| q.tier == tier).collect();
        if in_tier.is_empty() {
            continue;
        }
        println!("\n[{tier}] {} questions", in_tier.len());
        for question in in_tier {
            println!("  - {}", question.text);
        }
    }
}
