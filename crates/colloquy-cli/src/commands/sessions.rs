use crate::app::App;
use anyhow::Result;
use colloquy_core::session::Sender;

pub async fn list(app: &App, query: Option<&str>) -> Result<()> {
    let service = app.service()?;
    let summaries = match query {
        Some(query) => service.search_sessions(query).await?,
        None => service.list_sessions().await?,
    };

    if summaries.is_empty() {
        println!("No sessions.");
        return Ok(());
    }

    for summary in summaries {
        println!(
            "{}  {}  {:>3} msg  {}",
            summary.id,
            summary.updated_at.format("%Y-%m-%d %H:%M"),
            summary.message_count,
            summary.title
        );
    }
    Ok(())
}

pub async fn show(app: &App, id: &str, json: bool) -> Result<()> {
    let session = app.service()?.get_session(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }

    println!("# {}", session.title);
    for message in &session.messages {
        let who = match message.sender {
            Sender::User => "you",
            Sender::Assistant => "assistant",
        };
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%H:%M:%S"),
            who,
            message.content
        );
        for source in &message.sources {
            println!("    [source] {} (page {})", source.file_ref, source.page);
        }
    }
    Ok(())
}

pub async fn rename(app: &App, id: &str, title: &str) -> Result<()> {
    app.service()?.rename_session(id, title).await?;
    println!("Renamed {}", id);
    Ok(())
}

pub async fn delete(app: &App, id: &str) -> Result<()> {
    app.service()?.delete_session(id).await?;
    println!("Deleted {}", id);
    Ok(())
}
