/// Cumulative-count milestones and the badge each one unlocks.
pub const ACHIEVEMENTS: [(u64, &str); 3] = [
    (100, "初级跳绳达人"),
    (500, "中级跳绳达人"),
    (1000, "高级跳绳达人"),
];

/// Badges whose threshold lies in `(prev_total, new_total]`.
pub fn crossed(prev_total: u64, new_total: u64) -> Vec<&'static str> {
    ACHIEVEMENTS
        .iter()
        .filter(|(threshold, _)| prev_total < *threshold && *threshold <= new_total)
        .map(|(_, name)| *name)
        .collect()
}
