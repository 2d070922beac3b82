//! Command handlers for the blend binary

use anyhow::{Result, bail};
use std::path::Path;
use tracing::debug;

use blend_core::consolidate::consolidate;
use blend_core::dispatch::dispatch_all;
use blend_core::providers::HttpModelCaller;
use blend_core::settings::Settings;
use blend_core::types::{ChatRole, ModelResponse, Provider};
use blend_sessions::{ConversationSession, SessionStore, generate_session_title};

pub struct SendArgs {
    pub prompt: String,
    pub providers: Vec<Provider>,
    pub consolidate: bool,
    pub consolidator: Option<Provider>,
    pub new_session: bool,
    pub allow_missing_keys: bool,
}

/// Resolve which providers this send targets: the explicit flag, then
/// the session's previous selection, then every provider with a key
fn resolve_providers(
    args: &SendArgs,
    session: &ConversationSession,
    settings: &Settings,
) -> Result<Vec<Provider>> {
    if !args.providers.is_empty() {
        return Ok(args.providers.clone());
    }
    if !session.selected_providers.is_empty() {
        return Ok(session.selected_providers.clone());
    }
    let with_keys: Vec<Provider> = Provider::ALL
        .into_iter()
        .filter(|p| settings.api_key(*p).is_some())
        .collect();
    if with_keys.is_empty() {
        bail!(
            "No providers selected and no API keys configured. \
             Store one with `blend config set-key <provider> <key>`."
        );
    }
    Ok(with_keys)
}

pub async fn send(settings: &Settings, sessions: &SessionStore, args: SendArgs) -> Result<()> {
    let mut session = if args.new_session {
        ConversationSession::new()
    } else {
        sessions.active_session().unwrap_or_default()
    };

    let providers = resolve_providers(&args, &session, settings)?;

    // Abort the whole send when a selected provider has no key, unless
    // the user chose per-provider failures instead
    if !args.allow_missing_keys {
        let missing: Vec<&str> = providers
            .iter()
            .filter(|p| settings.api_key(**p).is_none())
            .map(|p| p.as_str())
            .collect();
        if !missing.is_empty() {
            bail!(
                "Missing API keys for: {}. Add them with `blend config set-key`, \
                 or pass --allow-missing-keys to let those providers fail individually.",
                missing.join(", ")
            );
        }
    }

    if session.messages.is_empty() {
        session.title = generate_session_title(&args.prompt);
    }
    session.append_message(ChatRole::User, &args.prompt);
    session.selected_providers = providers.clone();

    let descriptors: Vec<_> = providers.iter().map(|p| settings.descriptor(*p)).collect();
    let transcript = session.transcript();
    debug!(session = %session.id, models = descriptors.len(), "Sending prompt");
    let caller = HttpModelCaller::new(settings.clone());

    // Print each answer as it settles, in settlement order
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ModelResponse>();
    let printer = tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            print_response(&response);
        }
    });

    let batch = dispatch_all(&caller, &descriptors, &transcript, Some(tx)).await;
    let _ = printer.await;

    let keyed: Vec<(Provider, ModelResponse)> = providers
        .iter()
        .copied()
        .zip(batch.iter().cloned())
        .collect();
    session.record_responses(&keyed);

    let mut consolidated = None;
    if args.consolidate {
        let consolidator_provider = args.consolidator.unwrap_or(providers[0]);
        let consolidator = settings.descriptor(consolidator_provider);
        let template = settings.consolidation_template();
        match consolidate(&caller, &batch, &consolidator, &template).await {
            Ok(text) => {
                println!("\n=== Consolidated ({}) ===\n{text}", consolidator.id);
                consolidated = Some(text);
            }
            Err(e) => eprintln!("\nConsolidation failed: {e}"),
        }
    }
    session.consolidated_response = consolidated.clone();

    // Keep the transcript coherent for the next turn: the consolidated
    // answer when there is one, otherwise the first successful response
    let assistant_turn = consolidated.or_else(|| {
        batch
            .iter()
            .find(|r| r.is_success())
            .and_then(|r| r.content.clone())
    });
    if let Some(content) = assistant_turn {
        session.append_message(ChatRole::Assistant, content);
    }

    sessions.update(&session)?;
    sessions.set_active_session_id(&session.id)?;

    let succeeded = batch.iter().filter(|r| r.is_success()).count();
    println!("\n{succeeded}/{} models responded", batch.len());
    Ok(())
}

fn print_response(response: &ModelResponse) {
    match (&response.content, &response.error) {
        (Some(content), _) => {
            println!("\n=== {} ===\n{content}", response.model_name);
        }
        (None, Some(error)) => {
            println!("\n=== {} ===\n[error] {error}", response.model_name);
        }
        (None, None) => {}
    }
}

pub fn session_list(sessions: &SessionStore) -> Result<()> {
    let list = sessions.load();
    if list.is_empty() {
        println!("No sessions yet. Start one with `blend send \"...\"`.");
        return Ok(());
    }
    let active = sessions.active_session_id();
    for session in list {
        let marker = if active.as_deref() == Some(session.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {}  {}  ({} messages, {})",
            session.id,
            session.title,
            session.messages.len(),
            session.timestamp.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

pub fn session_new(sessions: &SessionStore) -> Result<()> {
    let session = ConversationSession::new();
    sessions.update(&session)?;
    sessions.set_active_session_id(&session.id)?;
    println!("Created session {}", session.id);
    Ok(())
}

pub fn session_show(sessions: &SessionStore, id: Option<&str>) -> Result<()> {
    let session = match id {
        Some(id) => sessions.load().into_iter().find(|s| s.id == id),
        None => sessions.active_session(),
    };
    let Some(session) = session else {
        bail!("Session not found");
    };

    println!("{}  {}", session.id, session.title);
    for message in &session.messages {
        println!("\n[{}] {}", message.role, message.content);
    }
    if let Some(responses) = &session.model_responses {
        println!("\nLast responses:");
        for (provider, response) in responses {
            match (&response.content, &response.error) {
                (Some(content), _) => println!("  {provider} ({}): {} chars", response.model_id, content.len()),
                (None, Some(error)) => {
                    println!("  {provider} ({}): error: {error}", response.model_id)
                }
                (None, None) => {}
            }
        }
    }
    if let Some(consolidated) = &session.consolidated_response {
        println!("\nConsolidated:\n{consolidated}");
    }
    Ok(())
}

pub fn session_rename(sessions: &SessionStore, id: &str, title: &str) -> Result<()> {
    sessions.rename(id, title)?;
    println!("Renamed session {id}");
    Ok(())
}

pub fn session_delete(sessions: &SessionStore, id: &str) -> Result<()> {
    sessions.delete(id)?;
    // Re-point the active session when we just deleted it; with no
    // sessions left the stale pointer is harmless, active_session()
    // validates before use
    if sessions.active_session_id().as_deref() == Some(id)
        && let Some(next) = sessions.load().first()
    {
        sessions.set_active_session_id(&next.id)?;
    }
    println!("Deleted session {id}");
    Ok(())
}

pub fn session_export(sessions: &SessionStore, id: &str, out: &Path) -> Result<()> {
    match sessions.export(id, out)? {
        Some(path) => println!("Exported to {}", path.display()),
        None => bail!("Session not found"),
    }
    Ok(())
}

pub fn config_show(settings: &Settings) -> Result<()> {
    for provider in Provider::ALL {
        let key = if settings.api_key(provider).is_some() {
            "key set"
        } else {
            "no key"
        };
        println!(
            "{provider:<10} {key:<8} model: {}",
            settings.configured_model(provider)
        );
    }
    println!("theme: {}", settings.theme().as_str());
    Ok(())
}
