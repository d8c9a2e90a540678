// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat command router: first-contact-wins owner registration, then
//! prefix-based parsing of the owner's commands. Anything that isn't a
//! recognized command is injected as an ad-hoc task.

use ouro_core::{
    classify_contact, ChatId, Effect, Event, IdGen, OwnerContact, OwnerId, Task, TaskId, TaskKind,
    UuidIdGen,
};
use ouro_storage::MaterializedState;
use parking_lot::Mutex;

/// Result of routing one inbound chat message. `restart_requested` is
/// surfaced separately because honoring it means running the (async,
/// multi-step) restart coordinator, which the dispatcher itself cannot do.
#[derive(Debug, Default)]
pub struct RouteOutcome {
    pub effects: Vec<Effect>,
    pub restart_requested: bool,
}

pub fn route(state: &Mutex<MaterializedState>, chat_id: ChatId, text: String, ts: u64) -> RouteOutcome {
    let mut out = RouteOutcome::default();

    let contact = {
        let s = state.lock();
        classify_contact(s.owner.as_ref().map(|o| &o.owner_chat_id), &chat_id)
    };
    match contact {
        OwnerContact::Ignored => return out,
        OwnerContact::NewOwner => {
            out.effects.push(Effect::Emit {
                event: Event::OwnerRegistered {
                    chat_id: chat_id.clone(),
                    owner_id: OwnerId::new(UuidIdGen.next()),
                    ts,
                },
            });
            // First contact consumes the message: the owner gets the
            // welcome, not a command parse of whatever they happened to
            // type.
            out.effects
                .push(reply(&chat_id, "\u{2705} Owner registered. Ouroboros online."));
            return out;
        }
        OwnerContact::Owner => {}
    }

    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();

    if lower == "/panic" {
        out.effects.push(Effect::Emit {
            event: Event::EmergencyStop { ts },
        });
        let worker_ids: Vec<_> = state.lock().workers.keys().cloned().collect();
        for id in worker_ids {
            out.effects.push(Effect::KillWorker { id });
        }
        out.effects
            .push(reply(&chat_id, "emergency stop: all tasks cancelled, workers killed"));
        // Last: `/panic` exits the process outright, not just clears the
        // queue. The reply above is best-effort — the chat transport send
        // may not land before the process dies.
        out.effects.push(Effect::ExitProcess { code: 1 });
        return out;
    }

    if lower == "/restart" {
        out.restart_requested = true;
        out.effects
            .push(reply(&chat_id, "restart requested, checking repository state\u{2026}"));
        return out;
    }

    if lower == "/review" {
        if state.lock().has_pending_review_task() {
            out.effects.push(reply(&chat_id, "a review task is already pending"));
        } else {
            let task = Task::new(
                TaskId::new(UuidIdGen.next()),
                TaskKind::Review,
                -1,
                String::new(),
                ts,
            );
            out.effects.push(Effect::EnqueueTask { task });
            out.effects.push(Effect::PersistQueueSnapshot {
                reason: "chat /review".into(),
            });
            out.effects.push(reply(&chat_id, "review task queued"));
        }
        return out;
    }

    if let Some(rest) = strip_command(&lower, "/evolve") {
        let enabled = match rest {
            "" | "on" => true,
            "off" => false,
            _ => {
                out.effects.push(reply(&chat_id, "usage: /evolve [on|off]"));
                return out;
            }
        };
        out.effects.push(Effect::Emit {
            event: Event::EvolutionModeSet { enabled, ts },
        });
        out.effects.push(reply(
            &chat_id,
            if enabled { "evolution mode on" } else { "evolution mode off" },
        ));
        return out;
    }

    if let Some(rest) = strip_command(&lower, "/bg") {
        match rest {
            "" | "start" => {
                out.effects.push(Effect::Emit {
                    event: Event::BackgroundModeSet { running: true, ts },
                });
                out.effects.push(reply(&chat_id, "background mode started"));
            }
            "stop" => {
                out.effects.push(Effect::Emit {
                    event: Event::BackgroundModeSet { running: false, ts },
                });
                out.effects.push(reply(&chat_id, "background mode stopped"));
            }
            "status" => {
                let running = state.lock().consciousness_running;
                out.effects.push(reply(
                    &chat_id,
                    if running { "background mode is running" } else { "background mode is stopped" },
                ));
            }
            _ => out.effects.push(reply(&chat_id, "usage: /bg [start|stop|status]")),
        }
        return out;
    }

    if lower == "/status" {
        out.effects.push(reply(&chat_id, &status_summary(state)));
        return out;
    }

    let task = Task::new(TaskId::new(UuidIdGen.next()), TaskKind::Adhoc, 0, text, ts);
    out.effects.push(Effect::EnqueueTask { task });
    out.effects.push(Effect::PersistQueueSnapshot {
        reason: "chat adhoc task".into(),
    });
    out
}

/// `/evolve` matches bare, `/evolve on`, `/evolve off`; same shape for `/bg`.
fn strip_command<'a>(lower: &'a str, command: &str) -> Option<&'a str> {
    let rest = lower.strip_prefix(command)?;
    if rest.is_empty() || rest.starts_with(' ') {
        Some(rest.trim())
    } else {
        None
    }
}

fn reply(chat_id: &ChatId, text: &str) -> Effect {
    Effect::SendChatMessage {
        chat_id: chat_id.clone(),
        text: text.to_string(),
        markdown: false,
    }
}

fn status_summary(state: &Mutex<MaterializedState>) -> String {
    let s = state.lock();
    format!(
        "workers: {} | pending: {} | running: {} | spent: ${:.2} / ${:.2} | evolve: {} | bg: {}",
        s.workers.len(),
        s.pending.len(),
        s.running.len(),
        s.spent_usd,
        s.budget_limit_usd,
        if s.evolution_mode_enabled { "on" } else { "off" },
        if s.consciousness_running { "running" } else { "stopped" },
    )
}

#[cfg(test)]
#[path = "chat_router_tests.rs"]
mod tests;
