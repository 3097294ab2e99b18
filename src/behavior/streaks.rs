//! Win/loss streak detection over settled positions. Pushes neither extend
//! nor break a streak.

use serde::Serialize;

use crate::config::STREAK_FLAG_LEN;
use crate::types::{Position, PositionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakKind {
    Win,
    Loss,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreakAnalysis {
    pub current_kind: Option<StreakKind>,
    pub current_length: u32,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
    pub hot: bool,
    pub cold: bool,
}

/// `positions` sorted ascending by placement time; unsettled and pushed bets
/// are skipped. The current streak runs backward from the most recent settled
/// bet until the result type changes.
pub fn analyze(positions: &[Position]) -> StreakAnalysis {
    let settled: Vec<StreakKind> = positions
        .iter()
        .filter_map(|p| match p.status {
            PositionStatus::Won => Some(StreakKind::Win),
            PositionStatus::Lost => Some(StreakKind::Loss),
            PositionStatus::Pending | PositionStatus::Push => None,
        })
        .collect();

    let mut longest_win = 0u32;
    let mut longest_loss = 0u32;
    let mut run = 0u32;
    let mut run_kind: Option<StreakKind> = None;
    for kind in &settled {
        if Some(*kind) == run_kind {
            run += 1;
        } else {
            run_kind = Some(*kind);
            run = 1;
        }
        match kind {
            StreakKind::Win => longest_win = longest_win.max(run),
            StreakKind::Loss => longest_loss = longest_loss.max(run),
        }
    }

    let current_kind = settled.last().copied();
    let current_length = match current_kind {
        Some(kind) => settled.iter().rev().take_while(|k| **k == kind).count() as u32,
        None => 0,
    };

    StreakAnalysis {
        current_kind,
        current_length,
        longest_win_streak: longest_win,
        longest_loss_streak: longest_loss,
        hot: current_kind == Some(StreakKind::Win) && current_length >= STREAK_FLAG_LEN,
        cold: current_kind == Some(StreakKind::Loss) && current_length >= STREAK_FLAG_LEN,
    }
}
