//! 🚀 cpx-cli — the front door, the bouncer, the maitre d' of cpx.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that loads config, sets up
//! logging, runs one message through one flow, and shows you the receipts.
//! Like a manager. 🦆

use anyhow::{Context, Result};
use comfy_table::{Table, presets::UTF8_FULL};
use cpx::diagnostics::Attachment;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🚀 main() — where it all begins. The genesis. The big bang.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Parse args (or don't, we're not picky)
/// 3. Load config (the moment of truth)
/// 4. Run the flow (send it and pray 🙏)
/// 5. Print the message log, then the result or the tears
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 🎯 Grab the args like catching Pokémon — gotta get at least 1
    let args: Vec<String> = std::env::args().collect();
    let path_arg = args.get(1).map(String::as_str).unwrap_or("cpx.toml");

    // 🔒 Validate the config file exists before we get too emotionally attached
    let config_file = std::path::Path::new(path_arg);
    let validated_config_file = match config_file.try_exists()
        .context(format!("💀 Configuration file may not exist, couldn't find it. Double check that it exists, or maybe, it's an issue with pwd/cwd and relative paths. Was checking here: '{}'", config_file.display()))?
    {
        true => Some(config_file),
        false => None, // 💤 env vars only, then. Brave.
    };

    let app_config = cpx::app_config::load_config(validated_config_file)
        .context("💀 In cpx-cli, main, we couldn't load the config file, take a look at the file, make sure it's correct")?;

    let ctx = cpx::build_context(&app_config)?;
    let result = cpx::run(&app_config, &ctx).await;

    // 🧾 Receipts first, whatever happened. The log is the evidence.
    let attachments = ctx.log.attachments().await;
    if !attachments.is_empty() {
        println!("{}", attachment_table(&attachments));
    }

    match result {
        Ok(message) => {
            println!("{}", message.body);
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 peel the onion of sadness, one tear-jerking layer at a time
            let mut the_vibes_are_giving_connection_issues = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                let cause_str = cause.to_string();
                if cause_str.contains("error sending request")
                    || cause_str.contains("connection refused")
                    || cause_str.contains("Connection refused")
                    || cause_str.contains("tcp connect error")
                    || cause_str.contains("dns error")
                {
                    the_vibes_are_giving_connection_issues = true;
                }
            }

            if the_vibes_are_giving_connection_issues {
                error!(
                    "🔧 hint: looks like an endpoint isn't reachable. \
                    Double-check the URLs in the message headers/properties, \
                    and that whatever is behind them is actually up. ☕"
                );
            }

            // 🗑️ Exit with prejudice. Process exitus maximus.
            std::process::exit(1);
        }
    }
}

/// 🍽️ One row per attachment. Long payloads get trimmed, the full text is in the debug log.
fn attachment_table(attachments: &[Attachment]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Attachment", "MIME type", "Content"]);
    for attachment in attachments {
        table.add_row(vec![
            attachment.name.clone(),
            attachment.mime_type.clone(),
            preview(&attachment.content, 120),
        ]);
    }
    table
}

fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let cut: String = content.chars().take(max_chars).collect();
    format!("{cut}…")
}
