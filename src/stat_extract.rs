use crate::build_report::BuildReport;
use crate::match_feed::RawStat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatType {
    Saves,
    Assists,
    Goals,
    MinutesPlayed,
    GoalsConceded,
    PenaltiesSaved,
    ExpectedGoals,
    ExpectedAssists,
    ExpectedGoalsPrevented,
}

impl StatType {
    pub const fn id(self) -> i64 {
        match self {
            StatType::Saves => 23,
            StatType::Assists => 26,
            StatType::Goals => 27,
            StatType::MinutesPlayed => 30,
            StatType::GoalsConceded => 35,
            StatType::PenaltiesSaved => 44,
            StatType::ExpectedGoals => 76,
            StatType::ExpectedAssists => 78,
            StatType::ExpectedGoalsPrevented => 83,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            StatType::Saves => "Saves",
            StatType::Assists => "Assists",
            StatType::Goals => "Goals",
            StatType::MinutesPlayed => "Minutes Played",
            StatType::GoalsConceded => "Goals Conceded",
            StatType::PenaltiesSaved => "Penalties Saved",
            StatType::ExpectedGoals => "xG",
            StatType::ExpectedAssists => "xA",
            StatType::ExpectedGoalsPrevented => "xG Prevented",
        }
    }
}

pub const PENALTY_KICK_SUBTYPE: i64 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    Log,
    Silent,
}

impl MissingPolicy {
    pub fn log_if(condition: bool) -> Self {
        if condition {
            MissingPolicy::Log
        } else {
            MissingPolicy::Silent
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paired {
    pub made: u32,
    pub attempted: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct StatExtractor<'a> {
    stats: &'a [RawStat],
    player: &'a str,
    opponent: &'a str,
}

impl<'a> StatExtractor<'a> {
    pub fn new(stats: &'a [RawStat], player: &'a str, opponent: &'a str) -> Self {
        Self {
            stats,
            player,
            opponent,
        }
    }

    fn find(&self, stat: StatType) -> Option<&'a RawStat> {
        self.stats
            .iter()
            .find(|s| s.kind == stat.id())
    }

    fn note_missing(&self, stat: StatType, policy: MissingPolicy, report: &mut BuildReport) {
        if policy == MissingPolicy::Log {
            report.warn(format!(
                "Player '{}' missing '{}' vs {}. Defaulted to 0.",
                self.player,
                stat.label(),
                self.opponent
            ));
        }
    }

    pub fn numeric(&self, stat: StatType, policy: MissingPolicy, report: &mut BuildReport) -> f64 {
        match self.find(stat) {
            Some(raw) => raw
                .text()
                .and_then(|text| parse_leading_f64(&text))
                .unwrap_or(0.0),
            None => {
                self.note_missing(stat, policy, report);
                0.0
            }
        }
    }

    pub fn paired(
        &self,
        stat: StatType,
        policy: MissingPolicy,
        report: &mut BuildReport,
    ) -> Paired {
        match self.find(stat) {
            Some(raw) => raw.text().map(|text| parse_paired(&text)).unwrap_or_default(),
            None => {
                self.note_missing(stat, policy, report);
                Paired::default()
            }
        }
    }

    pub fn penalty_goals(&self) -> u32 {
        self.find(StatType::Goals)
            .and_then(|raw| raw.text().map(|text| parse_penalty_annotation(&text)))
            .unwrap_or(0)
    }

    pub fn minutes_played(&self) -> i64 {
        self.find(StatType::MinutesPlayed)
            .and_then(|raw| raw.text().and_then(|text| parse_leading_i64(&text)))
            .unwrap_or(0)
    }
}

/// Longest numeric prefix, the way the provider's loose strings were read
/// upstream: `"1 (1Pk)"` is 1, `"0.43"` is 0.43, `"abc"` is `None`.
pub fn parse_leading_f64(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            has_digits = true;
            end = frac_end;
        } else if has_digits {
            end += 1;
        }
    }
    if !has_digits {
        return None;
    }
    s[..end].parse::<f64>().ok()
}

pub fn parse_leading_i64(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse::<i64>().ok()
}

pub fn parse_paired(raw: &str) -> Paired {
    let mut parts = raw.split('/');
    let side = |part: Option<&str>| {
        part.and_then(parse_leading_i64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    };
    let made = side(parts.next());
    let attempted = side(parts.next());
    Paired { made, attempted }
}

pub fn parse_penalty_annotation(raw: &str) -> u32 {
    let bytes = raw.as_bytes();
    let mut from = 0;
    while let Some(offset) = raw[from..].find("Pk") {
        let at = from + offset;
        let mut start = at;
        while start > 0 && bytes[start - 1].is_ascii_digit() {
            start -= 1;
        }
        if start < at {
            return raw[start..at].parse::<u32>().unwrap_or(0);
        }
        from = at + 2;
    }
    0
}
