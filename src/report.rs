use std::cmp::Ordering;
use std::fmt::Write;

use crate::build_report::BuildReport;
use crate::calculator::{View, view_tables};
use crate::documents::RunState;

pub const DEFAULT_TOP_N: usize = 10;

pub fn render_report(state: &RunState, view: View, top: usize) -> String {
    let mut out = String::new();
    let tables = view_tables(&state.aggregates, view);

    let _ = writeln!(out, "View: {}", view.as_str());
    let _ = writeln!(
        out,
        "Players: {}  Goalkeepers: {}  Teams: {}  Games: {}",
        tables.players.len(),
        tables.goalkeepers.len(),
        tables.teams.len(),
        state.processed_game_ids().len()
    );

    let mut teams = tables.teams;
    teams.sort_by(|a, b| {
        rank_key(a.standing)
            .cmp(&rank_key(b.standing))
            .then_with(|| a.team_name.cmp(&b.team_name))
    });
    let _ = writeln!(out, "\nTeams");
    let _ = writeln!(
        out,
        "{:>3}  {:<24} {:>3} {:>4} {:>4} {:>6} {:>6} {:>6} {:>7}",
        "#", "team", "mp", "gf", "ga", "xg", "npxg", "xgc", "xg+/-"
    );
    for t in &teams {
        let rank = t.standing.map_or_else(|| "-".to_string(), |r| r.to_string());
        let _ = writeln!(
            out,
            "{:>3}  {:<24} {:>3} {:>4} {:>4} {:>6.2} {:>6.2} {:>6.2} {:>+7.2}",
            rank, t.team_name, t.mp, t.gf, t.ga, t.xg, t.npxg, t.xgc, t.xg_delta
        );
    }

    let mut players = tables.players;
    players.sort_by(|a, b| desc(a.g, b.g).then_with(|| desc(a.xg, b.xg)));
    let _ = writeln!(out, "\nTop scorers");
    let _ = writeln!(
        out,
        "{:<24} {:<20} {:>3} {:>4} {:>3} {:>6} {:>6} {:>5} {:>7}",
        "player", "team", "mp", "g", "ps", "xg", "npxg", "xa", "npxg+/-"
    );
    for p in players.iter().take(top) {
        let _ = writeln!(
            out,
            "{:<24} {:<20} {:>3} {:>4} {:>3} {:>6.2} {:>6.2} {:>5.2} {:>+7.2}",
            p.player_name, p.team_name, p.mp, p.g, p.ps, p.xg, p.npxg, p.xa, p.npxg_delta
        );
    }

    let mut keepers = tables.goalkeepers;
    keepers.sort_by(|a, b| desc(a.xgp, b.xgp));
    let _ = writeln!(out, "\nGoalkeepers by xG prevented");
    let _ = writeln!(
        out,
        "{:<24} {:<20} {:>3} {:>3} {:>4} {:>6} {:>5}",
        "player", "team", "mp", "cs", "s", "xgp", "pens"
    );
    for k in keepers.iter().take(top) {
        let pens = format!("{}/{}", k.ps, k.pf);
        let _ = writeln!(
            out,
            "{:<24} {:<20} {:>3} {:>3} {:>4} {:>6.2} {:>5}",
            k.player_name, k.team_name, k.mp, k.cs, k.s, k.xgp, pens
        );
    }

    render_build_report(&mut out, &state.report);
    out
}

fn render_build_report(out: &mut String, report: &BuildReport) {
    let lines = report.log_lines();
    let _ = writeln!(
        out,
        "\nBuild report: {} warnings, {} errors",
        report.warning_count(),
        report.error_count()
    );
    for line in &lines {
        let _ = writeln!(out, "  {line}");
    }

    let corrections: Vec<_> = report.corrections().collect();
    if corrections.is_empty() {
        return;
    }
    let _ = writeln!(out, "\nCorrections");
    for c in corrections {
        let _ = writeln!(
            out,
            "  R{:<3} {:<24} {:<17} {} -> {}",
            c.round_num, c.name, c.stat_name, c.old_value, c.new_value
        );
    }
}

fn rank_key(standing: Option<u32>) -> u32 {
    standing.unwrap_or(u32::MAX)
}

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_report::Correction;

    #[test]
    fn empty_state_renders_headers_and_report() {
        let mut state = RunState::fresh();
        state.report.warn("Player 'X' missing 'xA' vs Y. Defaulted to 0.");
        state.report.push_correction(Correction {
            name: "X".into(),
            stat_name: "GOALS".into(),
            old_value: 1.0,
            new_value: 2.0,
            round_num: 5,
        });

        let text = render_report(&state, View::Home, DEFAULT_TOP_N);
        assert!(text.starts_with("View: home"));
        assert!(text.contains("Build report: 1 warnings, 0 errors"));
        assert!(text.contains("[WARNING] Player 'X' missing 'xA'"));
        assert!(text.contains("GOALS"));
        assert!(text.contains("1 -> 2"));
    }
}
