use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

use subtitle_qa::cli::parse_cli;
use subtitle_qa::output::OutputManager;
use subtitle_qa::pipeline::{AnalysisInput, analyze};
use subtitle_qa::settings::resolve_settings;
use subtitle_qa_providers::{
    NoopSpellChecker, RecordedSpellChecker, SpellChecker, parse_detection_payload,
    parse_transcription_payload,
};
use tokio::fs;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let (cli, sources) = parse_cli();
    let settings = resolve_settings(&cli, &sources)?;
    if let Some(path) = settings.config_path.as_ref() {
        info!(path = %path.display(), "loaded configuration");
    }

    let detections = parse_detection_payload(&read_input(&cli.ocr).await?)?;
    let transcription = parse_transcription_payload(&read_input(&cli.transcript).await?)?;
    let checker: Box<dyn SpellChecker> = match cli.spelling.as_ref() {
        Some(path) => {
            let recorded = RecordedSpellChecker::from_slice(&read_input(path).await?)?;
            if recorded.is_empty() {
                warn!(path = %path.display(), "spell-check recording has no responses");
            } else {
                info!(responses = recorded.len(), "loaded spell-check recording");
            }
            Box::new(recorded)
        }
        None => Box::new(NoopSpellChecker),
    };

    let input = AnalysisInput {
        detections,
        transcription,
        video_duration: settings.video_duration,
    };
    let output = analyze(&input, &settings.analysis, checker.as_ref());
    OutputManager::new(&settings.output).write(&output).await?;
    Ok(())
}

async fn read_input(path: &Path) -> Result<Vec<u8>, Box<dyn Error>> {
    fs::read(path)
        .await
        .map_err(|err| format!("failed to read {}: {err}", path.display()).into())
}
