use crate::app::App;
use anyhow::Result;
use colloquy_application::ExchangeOutcome;
use colloquy_core::context::ContextPatch;
use std::time::Duration;

/// Context flags given on the command line.
pub struct Selection {
    pub session: Option<String>,
    pub files: Vec<String>,
    pub prompt: Option<String>,
    pub channel: Option<String>,
}

impl Selection {
    fn into_patch(self) -> ContextPatch {
        let mut patch = ContextPatch::new();
        if !self.files.is_empty() {
            patch = patch.files(self.files);
        }
        if self.prompt.is_some() {
            patch = patch.prompt(self.prompt);
        }
        if self.channel.is_some() {
            patch = patch.channel(self.channel);
        }
        patch
    }
}

pub async fn run(app: &App, text: &str, mut selection: Selection) -> Result<()> {
    let service = app.service()?;

    if let Some(session_id) = selection.session.take() {
        service.switch_session(&session_id).await?;
    }
    let patch = selection.into_patch();
    if !patch.is_empty() {
        service.select_context(patch).await?;
    }

    let pending = service.submit(text).await?;
    let session_id = pending.session_id().to_string();

    let background = service.clone();
    let mut task = tokio::spawn(async move { background.complete(pending).await });
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;

    let outcome = loop {
        tokio::select! {
            joined = &mut task => break joined??,
            _ = ticker.tick() => {
                if let Some(elapsed) = service.awaiting_for() {
                    eprintln!("... still thinking ({}s)", elapsed.as_secs());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                service.cancel().await;
            }
        }
    };

    match outcome {
        ExchangeOutcome::Settled(message) => {
            println!("{}", message.content);
            for source in &message.sources {
                println!("  [source] {} (page {})", source.file_ref, source.page);
            }
            eprintln!("session: {}", session_id);
            Ok(())
        }
        ExchangeOutcome::Failed(err) => {
            eprintln!("Your message was saved in session {}.", session_id);
            Err(err.into())
        }
        ExchangeOutcome::Cancelled => {
            eprintln!("Cancelled. Your message was saved in session {}.", session_id);
            Ok(())
        }
    }
}
