//! Draft Session
//!
//! A two-player card draft driven by scripted answers. Shows the driver loop
//! around a suspendable workflow.
//!
//! Key concepts:
//! - Running until the workflow waits on a player
//! - Saving the session as JSON between turns and resuming from it
//! - Rewinding to a named checkpoint to take a pick back
//!
//! Run with: cargo run --example draft_session

use serde_json::{json, Value};
use turnkeeper::journal::{GameState, Journal};
use turnkeeper::machine::{Context, Flow, MachineError, MachineStatus, WaitRequest};
use turnkeeper::snapshot::Snapshot;
use turnkeeper::transitions;
use uuid::Uuid;

const PLAYERS: [&str; 2] = ["alice", "bob"];

fn draft(ctx: &mut Context<'_, ()>) -> Result<Flow, MachineError> {
    let tree = ctx.tree();
    let pool = tree
        .get(tree.root(), "pool")
        .ok_or_else(|| MachineError::rule("no pool"))?;
    if tree.len(pool).unwrap_or(0) == 0 {
        return Ok(ctx.push("END", json!({})));
    }

    let turn = ctx.get("turn").and_then(|v| v.as_u64()).unwrap_or(0);
    ctx.set("turn", turn + 1)?;
    let player = PLAYERS[(turn % 2) as usize];
    Ok(ctx.push("pick", json!({ "player": player })))
}

fn pick(ctx: &mut Context<'_, ()>) -> Result<Flow, MachineError> {
    let player = ctx
        .get("player")
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| MachineError::rule("pick without player"))?;

    let tree = ctx.tree();
    let root = tree.root();
    let pool = tree.get(root, "pool").ok_or_else(|| MachineError::rule("no pool"))?;
    let hand = tree
        .get(root, "hands")
        .and_then(|hands| tree.get(hands, &player))
        .ok_or_else(|| MachineError::rule("no hand"))?;
    let chosen = ctx.response().and_then(|choice| {
        tree.children(pool)
            .into_iter()
            .find(|card| tree.value(*card).as_ref() == Some(choice))
    });
    let options = tree
        .value(pool)
        .and_then(|v| v.as_array().cloned())
        .unwrap_or_default();

    if let Some(card) = chosen {
        let value = tree.value(card).unwrap_or(Value::Null);
        ctx.journal().move_item(card, hand, None)?;
        return Ok(ctx.return_value(value));
    }

    if ctx.response().is_none() {
        ctx.journal().checkpoint(format!("{player}-turn"))?;
    }
    Ok(ctx.wait(
        WaitRequest::new(player)
            .with_prompt("Choose a card")
            .with_options(options),
    ))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Draft Session ===\n");

    let machine = transitions! {
        "root" => draft,
        "pick" => pick,
    }
    .build()?;

    let state = GameState::from_value(json!({
        "pool": ["dragon", "knight", "wizard", "goblin"],
        "hands": {"alice": [], "bob": []},
    }))?;
    let mut journal = Journal::new(state);
    let session = Uuid::new_v4();

    let mut answers = ["dragon", "wizard", "knight", "goblin"].into_iter();
    let mut turns = 0;

    loop {
        match machine.run(&mut journal, &mut ())? {
            MachineStatus::Terminal => break,
            MachineStatus::Active => continue,
            MachineStatus::Suspended => {}
        }

        let request = machine.waiting(&journal)?.remove(0);
        let Some(answer) = answers.next() else { break };
        println!(
            "{} chooses {answer} from {}",
            request.actor,
            Value::Array(request.options)
        );
        machine.respond(&mut journal, answer)?;

        turns += 1;
        if turns == 2 {
            // Persist mid-draft, then carry on from the reloaded copy.
            let json = Snapshot::capture(session, &journal).to_json()?;
            println!("  saved {} bytes of session state", json.len());
            journal = Snapshot::from_json(&json)?.restore();
        }
    }

    let hands = journal.at(&".hands".parse()?)?;
    println!("\nFinal hands: {}", journal.tree().value(hands).unwrap_or(Value::Null));

    println!("\nBob takes back his last pick...");
    let undone = journal.undo_to("bob-turn")?;
    println!("  undid {undone} diffs");
    let status = machine.run(&mut journal, &mut ())?;
    println!("  status: {status:?}, waiting on {:?}", machine.waiting_actors(&journal)?);
    let hands = journal.at(&".hands".parse()?)?;
    println!("  hands now: {}", journal.tree().value(hands).unwrap_or(Value::Null));

    println!("\n=== Session Complete ===");
    Ok(())
}
