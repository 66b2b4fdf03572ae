use super::model::{ComicStatus, Panel};
use crate::common::files::extension_for;
use crate::infrastructure::imaging::{compose_comic_page, encode_png, load_font, PanelArt};
use crate::infrastructure::storage::local::ArtifactKind;
use crate::state::AppState;
use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Drives one job from prompt to finished comic. Errors never escape: they
/// mark the job failed and leave whatever was already written on disk.
pub async fn run(state: AppState, job_id: Uuid) {
    info!("🎨 Comic {} started", job_id);

    match execute(&state, job_id).await {
        Ok(()) => info!("✅ Comic {} completed", job_id),
        Err(e) => {
            let reason = format!("{:#}", e);
            error!("❌ Comic {} failed: {}", job_id, reason);

            if let Err(e) = state.jobs.fail(job_id, reason).await {
                warn!("Could not mark comic {} as failed: {}", job_id, e);
            }
            info!(
                "Project files preserved at {}",
                state.storage.project_dir(job_id).display()
            );
        }
    }
}

async fn execute(state: &AppState, job_id: Uuid) -> Result<()> {
    let prompt = state
        .jobs
        .get(job_id)
        .await
        .ok_or_else(|| anyhow!("Job {} not found", job_id))?
        .prompt;

    // 1. Story
    state
        .jobs
        .transition(job_id, ComicStatus::GeneratingStory, 1, "Generating story...")
        .await?;

    let story = state
        .openai
        .generate_story(&prompt.prompt, &prompt.style, prompt.character_names(), prompt.num_panels)
        .await
        .context("Failed to generate story")?;

    // 2. Panel script
    state
        .jobs
        .update(job_id, ComicStatus::BreakingStory, |job| {
            job.current_step = 2;
            job.message = "Breaking story into panels...".to_string();
            job.story = Some(story.clone());
        })
        .await?;

    let scripts = state
        .openai
        .break_story_into_panels(&story, prompt.num_panels)
        .await
        .context("Failed to break story into panels")?;

    let story_doc = json!({
        "prompt": &prompt,
        "generated_story": &story,
        "panels_data": &scripts,
    });
    state
        .storage
        .write(
            job_id,
            ArtifactKind::Output,
            "story.json",
            Bytes::from(serde_json::to_vec_pretty(&story_doc)?),
            "application/json",
        )
        .await?;

    // 3. Panel art
    let mut panels: Vec<Panel> = scripts
        .iter()
        .enumerate()
        .map(|(i, script)| Panel {
            panel_number: i as u32 + 1,
            image_description: script.image_description.clone(),
            panel_text: script.panel_text.clone(),
            image_url: None,
            remote_url: None,
        })
        .collect();

    let total = panels.len();
    state
        .jobs
        .update(job_id, ComicStatus::GeneratingImages, |job| {
            job.current_step = 3;
            job.message = "Generating panel images...".to_string();
            job.panels = panels.clone();
        })
        .await?;

    let mut arts = Vec::with_capacity(total);
    for i in 0..total {
        let number = i + 1;
        state
            .jobs
            .transition(
                job_id,
                ComicStatus::GeneratingImages,
                3,
                format!("Generating image for panel {}/{}...", number, total),
            )
            .await?;

        let data = state
            .openai
            .generate_panel_image(&panels[i].image_description)
            .await
            .with_context(|| format!("Failed to generate image for panel {}", number))?;

        let mime = image::guess_format(&data)
            .map(|f| f.to_mime_type())
            .unwrap_or("image/png");
        let filename = format!("panel_{}{}", number, extension_for(mime));

        let artifact = state
            .storage
            .write(job_id, ArtifactKind::Images, &filename, data.clone(), mime)
            .await?;

        panels[i].image_url = Some(artifact.url);
        panels[i].remote_url = artifact.remote_url;
        arts.push(PanelArt {
            image: Some(data.to_vec()),
            caption: panels[i].panel_text.clone(),
        });

        state
            .jobs
            .update(job_id, ComicStatus::GeneratingImages, |job| {
                job.message = format!("Generated image {} of {}...", number, total);
                job.panels = panels.clone();
            })
            .await?;
    }

    // 4. Page
    state
        .jobs
        .transition(job_id, ComicStatus::CreatingComic, 4, "Creating comic book...")
        .await?;

    let font_path = state.config.font_path.clone();
    let png = tokio::task::spawn_blocking(move || {
        let font = load_font(font_path.as_deref());
        encode_png(&compose_comic_page(&arts, font.as_ref()))
    })
    .await
    .context("Comic compositing task panicked")?
    .context("Failed to encode comic page")?;

    let comic = state
        .storage
        .write(job_id, ArtifactKind::Output, "comic.png", Bytes::from(png), "image/png")
        .await?;

    // 5. Narration
    state
        .jobs
        .update(job_id, ComicStatus::GeneratingAudio, |job| {
            job.current_step = 5;
            job.message = "Generating voice over...".to_string();
            job.comic = Some(comic.clone());
        })
        .await?;

    let audio_data = state
        .openai
        .generate_voiceover(&story)
        .await
        .context("Failed to generate voiceover")?;

    let audio = state
        .storage
        .write(job_id, ArtifactKind::Audio, "voiceover.mp3", audio_data, "audio/mpeg")
        .await?;

    // 6. Manifest
    state
        .jobs
        .update(job_id, ComicStatus::Finalizing, |job| {
            job.current_step = 6;
            job.message = "Creating final output...".to_string();
            job.audio = Some(audio.clone());
        })
        .await?;

    let manifest_doc = json!({
        "job_id": job_id,
        "panels": &panels,
        "comic": &comic,
        "audio": &audio,
    });
    let manifest = state
        .storage
        .write(
            job_id,
            ArtifactKind::Output,
            "final_output.json",
            Bytes::from(serde_json::to_vec_pretty(&manifest_doc)?),
            "application/json",
        )
        .await?;

    state
        .jobs
        .update(job_id, ComicStatus::Completed, |job| {
            job.message = "Comic generation completed!".to_string();
            job.manifest = Some(manifest);
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::imaging::solid_png;
    use crate::modules::comic::dto::StoryPrompt;
    use crate::modules::comic::model::ComicJob;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_happy_path(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "max_tokens": 1000 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "Pip the owl learned to fly." } }]
            })))
            .mount(server)
            .await;

        let breakdown = json!({
            "panels": [
                { "image_description": "an owlet on a branch", "panel_text": "Pip looked down." },
                { "image_description": "an owl in the sky", "panel_text": "Pip flew!" }
            ]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "response_format": { "type": "json_object" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": breakdown.to_string() } }]
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "b64_json": STANDARD.encode(solid_png(8, 8, [250, 200, 0])) }]
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 fake mp3".to_vec()))
            .mount(server)
            .await;
    }

    async fn queued_job(state: &AppState, num_panels: u32) -> Uuid {
        let prompt: StoryPrompt = serde_json::from_value(json!({
            "prompt": "an owl who is afraid of heights",
            "num_panels": num_panels
        }))
        .unwrap();
        let job = ComicJob::new(prompt);
        let id = job.id;
        state.storage.create_project_dirs(id).await.unwrap();
        state.jobs.insert(job).await;
        id
    }

    #[tokio::test]
    async fn successful_run_completes_with_artifacts() {
        let server = MockServer::start().await;
        mount_happy_path(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::for_tests(&server.uri(), dir.path());
        let id = queued_job(&state, 2).await;

        run(state.clone(), id).await;

        let job = state.jobs.get(id).await.unwrap();
        assert_eq!(job.status, ComicStatus::Completed, "error: {:?}", job.error);
        assert_eq!(job.current_step, 6);
        assert_eq!(job.story.as_deref(), Some("Pip the owl learned to fly."));
        assert_eq!(job.panels.len(), 2);
        assert_eq!(
            job.panels[1].image_url.as_deref(),
            Some(format!("/api/v1/comics/files/{}/images/panel_2.png", id).as_str())
        );

        let base = state.storage.project_dir(id);
        for file in [
            "images/panel_1.png",
            "images/panel_2.png",
            "output/comic.png",
            "output/story.json",
            "output/final_output.json",
            "audio/voiceover.mp3",
        ] {
            assert!(base.join(file).is_file(), "missing {file}");
        }

        let comic = image::open(base.join("output/comic.png")).unwrap();
        assert_eq!(comic.width(), crate::infrastructure::imaging::PAGE_WIDTH);
    }

    #[tokio::test]
    async fn configured_font_puts_captions_on_the_page() {
        use crate::infrastructure::imaging::{fixture_font_path, panel_origin, CAPTION_BAND, PANEL_HEIGHT, PANEL_WIDTH};

        let server = MockServer::start().await;
        mount_happy_path(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::for_tests(&server.uri(), dir.path());
        state.config.font_path = Some(fixture_font_path());
        let id = queued_job(&state, 2).await;

        run(state.clone(), id).await;

        let job = state.jobs.get(id).await.unwrap();
        assert_eq!(job.status, ComicStatus::Completed, "error: {:?}", job.error);

        let page = image::open(state.storage.project_dir(id).join("output/comic.png"))
            .unwrap()
            .to_rgb8();
        let (x, y) = panel_origin(0);
        let band = (y + PANEL_HEIGHT + 5)..(y + PANEL_HEIGHT + CAPTION_BAND);
        let inked = band
            .flat_map(|py| (x..x + PANEL_WIDTH).map(move |px| (px, py)))
            .any(|(px, py)| page.get_pixel(px, py).0 != [255, 255, 255]);
        assert!(inked, "caption band is blank");
    }

    #[tokio::test]
    async fn upstream_failure_marks_job_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::for_tests(&server.uri(), dir.path());
        let id = queued_job(&state, 3).await;

        run(state.clone(), id).await;

        let job = state.jobs.get(id).await.unwrap();
        assert_eq!(job.status, ComicStatus::Failed);
        assert_eq!(job.current_step, 1);
        let error = job.error.unwrap();
        assert!(error.contains("Failed to generate story"), "{error}");
        assert!(error.contains("Authentication failed"), "{error}");
    }

    #[tokio::test]
    async fn image_failure_keeps_earlier_files() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"error":{"code":"content_policy_violation","message":"nope"}}"#,
            ))
            .mount(&server)
            .await;
        mount_happy_path(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::for_tests(&server.uri(), dir.path());
        let id = queued_job(&state, 2).await;

        run(state.clone(), id).await;

        let job = state.jobs.get(id).await.unwrap();
        assert_eq!(job.status, ComicStatus::Failed);
        assert_eq!(job.current_step, 3);
        assert!(job.error.unwrap().contains("content policy"));
        assert!(state.storage.project_dir(id).join("output/story.json").is_file());
        assert!(job.comic.is_none());
    }
}
