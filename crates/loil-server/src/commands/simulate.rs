use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use loil_core::creature::MAX_NEED;
use loil_simulation::{SimEventKind, Simulation};

use super::{RuleArgs, WorldArgs};

pub fn run(
    paths: &WorldArgs,
    rules: &RuleArgs,
    ticks: u64,
    dt: f64,
    verbose_events: bool,
    save: Option<&Path>,
) -> Result<(), String> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(format!("--dt must be a positive number of seconds, got {dt}"));
    }
    let mut sim = super::build_simulation(paths, rules.sim_config())?;

    let mut transitions = 0;
    let mut changed_ticks = 0;
    for _ in 0..ticks {
        let report = sim
            .tick(dt)
            .map_err(|e| format!("simulation error: {e}"))?;
        transitions += report.transitions.len();
        if report.changed {
            changed_ticks += 1;
        }
    }

    println!(
        "  {} '{}' {}",
        "Simulation".bold(),
        paths.world.display(),
        format!(
            "({ticks} ticks of {dt}s, seed={}, collision={}, foraging={})",
            rules.seed, rules.collision, rules.foraging
        )
        .dimmed()
    );
    println!(
        "  {:.1}s simulated, {changed_ticks} ticks with changes, {transitions} transitions, {} events logged",
        sim.clock().seconds(),
        sim.events().len()
    );
    println!();

    if verbose_events {
        print_events(&sim);
    } else {
        print_event_summary(&sim);
    }
    print_characters(&sim);
    print_creatures(&sim);

    if let Some(path) = save {
        super::save_world(&sim, path)?;
        println!("  World saved to {}", path.display());
    }

    Ok(())
}

fn print_events(sim: &Simulation) {
    println!("  {}", "Event Log".bold().underline());
    println!();
    for event in sim.events().events() {
        let tick_label = format!("[tick {:>5}]", event.tick).dimmed();
        let desc = colorize_event(&event.kind, &event.description);
        println!("  {tick_label} {desc}");
    }
    if sim.events().is_empty() {
        println!("  {}", "(no events)".dimmed());
    }
    println!();
}

fn print_event_summary(sim: &Simulation) {
    let mut rows: [(&str, usize); 6] = [
        ("transitions", 0),
        ("blocked moves", 0),
        ("edge stalls", 0),
        ("behavior changes", 0),
        ("meals", 0),
        ("objects destroyed", 0),
    ];
    for event in sim.events().events() {
        let slot = match event.kind {
            SimEventKind::Transitioned { .. } => 0,
            SimEventKind::Blocked { .. } => 1,
            SimEventKind::EdgeStall { .. } => 2,
            SimEventKind::BehaviorChanged { .. } => 3,
            SimEventKind::CreatureAte { .. } => 4,
            SimEventKind::ObjectDestroyed { .. } => 5,
            _ => continue,
        };
        rows[slot].1 += 1;
    }
    if rows.iter().all(|(_, n)| *n == 0) {
        return;
    }

    println!("  {}", "Notable Events".bold().underline());
    for (label, count) in rows.iter().filter(|(_, n)| *n > 0) {
        println!("  {count:>6}  {label}");
    }
    println!();
}

fn location_name(sim: &Simulation, id: loil_core::LocationId) -> String {
    sim.world()
        .location(id)
        .map_or_else(|| format!("#{id}"), |l| l.name.clone())
}

fn print_characters(sim: &Simulation) {
    let world = sim.world();
    if world.characters().next().is_none() {
        return;
    }
    println!("  {}", "Characters".bold().underline());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Character", "Location", "X", "Tile", "Heading", "Player"]);
    for ch in world.characters() {
        let heading = match (ch.direction, ch.vertical) {
            (0, _) => "idle".to_string(),
            (d, v) => {
                let side = if d > 0 { "right" } else { "left" };
                match v {
                    1 => format!("{side}, up"),
                    -1 => format!("{side}, down"),
                    _ => side.to_string(),
                }
            }
        };
        let player = if ch.is_npc() {
            "npc".dimmed().to_string()
        } else {
            ch.controlled.to_string()
        };
        table.add_row(vec![
            ch.name.clone(),
            location_name(sim, ch.location),
            format!("{:.2}", ch.x),
            ch.tile().to_string(),
            heading,
            player,
        ]);
    }
    println!("{table}");
    println!();
}

fn print_creatures(sim: &Simulation) {
    let world = sim.world();
    if world.creatures().next().is_none() {
        return;
    }
    println!("  {}", "Creatures".bold().underline());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Creature", "Location", "X", "Behavior", "Hunger", "Thirst", "Health",
    ]);
    for c in world.creatures() {
        let name = if c.name.is_empty() {
            sim.registry()
                .creature(c.type_id)
                .map_or_else(|| format!("creature {}", c.id), |t| format!("{} {}", t.name, c.id))
        } else {
            c.name.clone()
        };
        let behavior = c
            .behavior_kind()
            .map_or_else(|| "none".dimmed().to_string(), |k| k.to_string().cyan().to_string());
        table.add_row(vec![
            name,
            location_name(sim, c.location),
            format!("{:.2}", c.x),
            behavior,
            format_need_bar(c.hunger),
            format_need_bar(c.thirst),
            format!("{}/{}", c.health, c.max_health),
        ]);
    }
    println!("{table}");
    println!();
}

fn colorize_event(kind: &SimEventKind, description: &str) -> colored::ColoredString {
    match kind {
        SimEventKind::Transitioned { .. } => description.blue(),
        SimEventKind::Blocked { .. } | SimEventKind::EdgeStall { .. } => description.yellow(),
        SimEventKind::BehaviorChanged { .. } => description.cyan(),
        SimEventKind::CreatureAte { .. } | SimEventKind::PlayerJoined { .. } => description.green(),
        SimEventKind::ObjectTransformed { .. } => description.magenta(),
        SimEventKind::ObjectDestroyed { .. } => description.red(),
        SimEventKind::Interacted { .. } => description.normal(),
    }
}

/// A need in 0..=100, where higher is worse.
fn format_need_bar(val: f64) -> String {
    let frac = (val / MAX_NEED).clamp(0.0, 1.0);
    let filled = (frac * 10.0).round() as usize;
    let empty = 10_usize.saturating_sub(filled);
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(empty));

    if frac >= 0.9 {
        format!("[{}] {:>3.0}", bar.red(), val)
    } else if frac >= 0.6 {
        format!("[{}] {:>3.0}", bar.yellow(), val)
    } else {
        format!("[{}] {:>3.0}", bar.green(), val)
    }
}
