//! `modelgen` -- terminal client for the modelgen gateway.
//!
//! Submits generation jobs over the same multipart endpoints the browser
//! dashboard uses, then watches them with the polling client until they
//! finish.
//!
//! ```text
//! modelgen face --prompt "young woman with green eyes"
//! modelgen video --image start.png --aspect-ratio 9:16
//! modelgen lipsync --video clip.mp4 --text "hello there" --voice male_deep
//! modelgen status <job-id>
//! modelgen watch <job-id>
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modelgen_core::types::{JobStatus, JobType};
use modelgen_poller::{HttpStatusClient, JobPoller, PollEvent, PollerConfig, StatusClient};

#[derive(Parser)]
#[command(name = "modelgen", about = "Submit and watch AI generation jobs")]
struct Cli {
    /// API base URL (the gateway's `/api` prefix).
    #[arg(long, global = true, default_value = "http://localhost:8000/api")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a face from a prompt.
    Face {
        #[arg(long)]
        prompt: String,
        /// Aspect ratio preset (auto, 1:1, 16:9, ...).
        #[arg(long)]
        aspect_ratio: Option<String>,
        /// Reference images (up to four).
        #[arg(long)]
        image: Vec<PathBuf>,
        /// Exit after submission instead of watching the job.
        #[arg(long)]
        no_watch: bool,
    },
    /// Animate an image into a video.
    Video {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        end_image: Option<PathBuf>,
        #[arg(long, default_value = "")]
        prompt: String,
        /// 16:9 or 9:16.
        #[arg(long)]
        aspect_ratio: Option<String>,
        /// Model-specific mode string.
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        no_watch: bool,
    },
    /// Add voice and lip sync to a video.
    Lipsync {
        #[arg(long)]
        video: PathBuf,
        #[arg(long)]
        text: String,
        /// Voice preset (female_young, male_deep, ...).
        #[arg(long)]
        voice: Option<String>,
        #[arg(long, default_value = "en")]
        language: String,
        #[arg(long)]
        no_watch: bool,
    },
    /// Print the current status of a job and exit.
    Status { job_id: String },
    /// Poll a job until it reaches a terminal state.
    Watch {
        job_id: String,
        /// Give up after this many seconds even if the job is still running.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

/// The slice of a submission response the CLI cares about.
#[derive(Debug, Deserialize)]
struct SubmittedJob {
    job_id: String,
    status: JobStatus,
    message: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modelgen_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let base_url = cli.base_url.trim_end_matches('/').to_string();
    let http = reqwest::Client::new();

    match cli.command {
        Command::Face {
            prompt,
            aspect_ratio,
            image,
            no_watch,
        } => {
            let mut form = reqwest::multipart::Form::new().text("prompt", prompt);
            if let Some(ratio) = aspect_ratio {
                form = form.text("aspect_ratio", ratio);
            }
            for path in &image {
                form = form.part("images", file_part(path).await?);
            }

            let job = submit(&http, &base_url, "/face/generate", form).await?;
            println!("submitted face job {} [{}] {}", job.job_id, job.status, job.message);
            if !no_watch {
                watch(&base_url, &job.job_id, JobType::Face, None).await?;
            }
        }

        Command::Video {
            image,
            end_image,
            prompt,
            aspect_ratio,
            mode,
            no_watch,
        } => {
            let mut form = reqwest::multipart::Form::new()
                .part("image", file_part(&image).await?)
                .text("prompt", prompt);
            if let Some(path) = end_image {
                form = form.part("end_image", file_part(&path).await?);
            }
            if let Some(ratio) = aspect_ratio {
                form = form.text("aspect_ratio", ratio);
            }
            if let Some(mode) = mode {
                form = form.text("mode", mode);
            }

            let job = submit(&http, &base_url, "/video/generate", form).await?;
            println!("submitted video job {} [{}] {}", job.job_id, job.status, job.message);
            if !no_watch {
                watch(&base_url, &job.job_id, JobType::Video, None).await?;
            }
        }

        Command::Lipsync {
            video,
            text,
            voice,
            language,
            no_watch,
        } => {
            let mut form = reqwest::multipart::Form::new()
                .part("video", file_part(&video).await?)
                .text("text", text)
                .text("language", language);
            if let Some(voice) = voice {
                form = form.text("voice_type", voice);
            }

            let job = submit(&http, &base_url, "/lipsync/generate", form).await?;
            println!("submitted lip sync job {} [{}] {}", job.job_id, job.status, job.message);
            if !no_watch {
                watch(&base_url, &job.job_id, JobType::Lipsync, None).await?;
            }
        }

        Command::Status { job_id } => {
            let client = HttpStatusClient::with_client(http, base_url.as_str());
            let job = client
                .fetch_status(&job_id)
                .await
                .context("status query failed")?;
            println!(
                "{} [{}] {} {}% - {}",
                job.job_id, job.job_type, job.status, job.progress, job.message
            );
            if let Some(url) = job.result_url {
                println!("result: {url}");
            }
            if let Some(error) = job.error {
                println!("error: {error}");
            }
        }

        Command::Watch {
            job_id,
            timeout_secs,
        } => {
            // The watched job's type is only used for logging; the status
            // endpoint serves every type.
            let client = HttpStatusClient::new(base_url.as_str());
            let job = client
                .fetch_status(&job_id)
                .await
                .context("status query failed")?;
            watch(&base_url, &job_id, job.job_type, timeout_secs).await?;
        }
    }

    Ok(())
}

/// Read a file into a multipart part, guessing the mime type from the
/// extension.
async fn file_part(path: &Path) -> anyhow::Result<reqwest::multipart::Part> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.bin".to_string());

    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    };

    Ok(reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime)?)
}

/// POST a multipart submission and parse the returned job identity.
async fn submit(
    http: &reqwest::Client,
    base_url: &str,
    endpoint: &str,
    form: reqwest::multipart::Form,
) -> anyhow::Result<SubmittedJob> {
    let response = http
        .post(format!("{base_url}{endpoint}"))
        .multipart(form)
        .send()
        .await
        .context("submission request failed")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["detail"].as_str().map(String::from))
            .unwrap_or(body);
        bail!("submission rejected ({status}): {detail}");
    }

    Ok(response.json().await.context("invalid submission response")?)
}

/// Poll a job until it finishes, printing each observed snapshot.
async fn watch(
    base_url: &str,
    job_id: &str,
    job_type: JobType,
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    let config = PollerConfig {
        max_duration: timeout_secs.map(Duration::from_secs),
        ..Default::default()
    };
    let poller = JobPoller::new(HttpStatusClient::new(base_url), config);
    let mut events = poller.subscribe();

    poller.start(job_id.to_string(), job_type);

    loop {
        match events.recv().await.context("poller channel closed")? {
            PollEvent::Update(obs) => {
                println!(
                    "[{:>4}s] {} {:>3}% - {}",
                    obs.elapsed.as_secs(),
                    obs.job.status,
                    obs.job.progress,
                    obs.job.message
                );
            }
            PollEvent::Terminal(obs) => {
                match obs.job.status {
                    JobStatus::Completed => {
                        println!(
                            "[{:>4}s] completed: {}",
                            obs.elapsed.as_secs(),
                            obs.job.result_url.as_deref().unwrap_or("(no result url)")
                        );
                    }
                    _ => {
                        println!(
                            "[{:>4}s] failed: {}",
                            obs.elapsed.as_secs(),
                            obs.job.error.as_deref().unwrap_or("(no cause reported)")
                        );
                    }
                }
                return Ok(());
            }
            PollEvent::TimedOut { elapsed, .. } => {
                bail!(
                    "gave up after {}s; the job may still be running remotely",
                    elapsed.as_secs()
                );
            }
        }
    }
}
