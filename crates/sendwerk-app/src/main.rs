// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sendwerk — native SMS bridge host.
//
// Entry point. Initialises logging, loads the dispatch config, builds the
// platform bridge, and answers one plugin call given on the command line:
//
//   sendwerk <phone> <message...>
//   sendwerk --call <method> '<json args>'

use sendwerk_core::human_errors::{humanize_error, humanize_outcome};
use sendwerk_core::types::{ErrorCode, Outcome, PluginReply};
use sendwerk_core::{DispatchConfig, SendwerkError};
use sendwerk_dispatch::Dispatcher;
use serde_json::{Value, json};

/// One plugin call parsed from the command line.
#[derive(Debug, PartialEq)]
struct Invocation {
    method: String,
    args: Value,
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    match args {
        [flag, method, raw] if flag == "--call" => {
            let args = serde_json::from_str(raw).map_err(|e| format!("invalid JSON args: {e}"))?;
            Ok(Invocation {
                method: method.clone(),
                args,
            })
        }
        [flag, ..] if flag == "--call" => Err("usage: sendwerk --call <method> '<json>'".into()),
        [phone, words @ ..] if !words.is_empty() => Ok(Invocation {
            method: sendwerk_dispatch::dispatcher::METHOD_SEND_SMS.into(),
            args: json!({ "phone": phone, "message": words.join(" ") }),
        }),
        _ => Err("usage: sendwerk <phone> <message...>".into()),
    }
}

/// Plain-English line for the operator, if the reply warrants one.
fn explain(reply: &PluginReply) -> Option<String> {
    let human = match reply {
        PluginReply::Success { confirmed: true, .. } | PluginReply::NotImplemented => return None,
        PluginReply::Success { confirmed: false, .. } => humanize_outcome(&Outcome::TimedOut)?,
        PluginReply::Error {
            code: ErrorCode::SendFail,
            message,
        } => humanize_outcome(&Outcome::Failure(message.clone()))?,
        PluginReply::Error { code, message } => {
            let err = match code {
                ErrorCode::BadArgs => SendwerkError::BadArguments(message.clone()),
                ErrorCode::NoPermission => {
                    SendwerkError::PermissionDenied(sendwerk_core::Permission::SendSms)
                }
                ErrorCode::SendFail => SendwerkError::Submission(message.clone()),
            };
            humanize_error(&err)
        }
    };
    Some(format!("{} {}", human.message, human.suggestion))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Invocation { method, args } = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(usage) => {
            eprintln!("{usage}");
            std::process::exit(2);
        }
    };

    let dir = DispatchConfig::default_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(path = %dir.display(), error = %e, "could not create data directory");
    }
    let config = DispatchConfig::load(&dir);
    tracing::info!(
        path = %dir.display(),
        timeout_secs = config.ack_timeout_secs,
        "Sendwerk starting"
    );

    let dispatcher = Dispatcher::from_platform(sendwerk_bridge::platform_bridge(), config);
    let reply = dispatcher.handle_call(&method, &args).await;

    match serde_json::to_string_pretty(&reply) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => tracing::error!(error = %e, "could not render reply"),
    }
    if let Some(line) = explain(&reply) {
        eprintln!("{line}");
    }

    let ok = matches!(reply, PluginReply::Success { .. });
    std::process::exit(if ok { 0 } else { 1 });
}
