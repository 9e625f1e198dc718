use std::fmt::Write;

use crate::board::{BALL_DIAMETER, PADDLE_HEIGHT};
use crate::session::BatchReport;
use crate::side::{Loser, Side};
use crate::state::BoardState;

/// Customize board rendering for CLI visualization.
#[derive(Clone, Copy, Debug)]
pub struct VisualOptions {
    pub columns: usize,
    pub rows: usize,
    pub show_motion: bool,
}

impl Default for VisualOptions {
    fn default() -> Self {
        Self {
            columns: 60,
            rows: 20,
            show_motion: true,
        }
    }
}

pub fn render_board(state: &BoardState) -> String {
    render_board_with_options(state, VisualOptions::default())
}

pub fn render_board_with_options(state: &BoardState, options: VisualOptions) -> String {
    let columns = options.columns.max(3);
    let rows = options.rows.max(1);
    let cell_height = state.height / rows as f64;

    let ball_center_x = state.ball.position.x + BALL_DIAMETER / 2.0;
    let ball_center_y = state.ball.position.y + BALL_DIAMETER / 2.0;
    let ball_column = grid_index(ball_center_x, state.width, columns);
    let ball_row = grid_index(ball_center_y, state.height, rows);

    let mut out = String::new();
    let border = format!("+{}+", "-".repeat(columns));
    let _ = writeln!(out, "{border}");
    for row in 0..rows {
        let top = row as f64 * cell_height;
        let bottom = top + cell_height;
        let mut line = vec![' '; columns];
        for (side, column) in [(Side::Left, 0), (Side::Right, columns - 1)] {
            let paddle = state.paddle(side);
            if paddle.present && paddle.y < bottom && paddle.y + PADDLE_HEIGHT > top {
                line[column] = '|';
            }
        }
        if row == ball_row {
            line[ball_column] = 'o';
        }
        let _ = writeln!(out, "|{}|", line.into_iter().collect::<String>());
    }
    let _ = writeln!(out, "{border}");

    let status = if !state.done {
        String::from("in play")
    } else {
        match state.who_lost {
            Loser::None => String::from("stopped"),
            Loser::Left => String::from("left missed"),
            Loser::Right => String::from("right missed"),
        }
    };
    let _ = writeln!(
        out,
        "Score {} : {}  |  {status}",
        state.left_score, state.right_score
    );
    if options.show_motion {
        let ball = &state.ball;
        let _ = writeln!(
            out,
            "Ball ({:.1}, {:.1}) v ({:.2}, {:.2})",
            ball.position.x, ball.position.y, ball.velocity.x, ball.velocity.y
        );
        for side in [Side::Left, Side::Right] {
            let paddle = state.paddle(side);
            if paddle.present {
                let _ = writeln!(
                    out,
                    "{side:?} paddle y {:.1} v {:.2} a {:.2}",
                    paddle.y, paddle.velocity, paddle.acceleration
                );
            }
        }
    }
    out
}

fn grid_index(position: f64, extent: f64, cells: usize) -> usize {
    let scaled = (position / extent * cells as f64).floor();
    if scaled.is_nan() || scaled < 0.0 {
        0
    } else {
        (scaled as usize).min(cells - 1)
    }
}

pub fn report_header() -> String {
    format!(
        "{:<7} {:<7} {:<8} {:<11} {:<9} {:<8} {:<8} {:<10} {:<18}",
        "Batch",
        "Epsilon",
        "NN Error",
        "Median Hits",
        "Mean Hits",
        "Min Hits",
        "Max Hits",
        "% Above",
        "Mean Miss Distance"
    )
}

pub fn format_report(report: &BatchReport) -> String {
    let summary = &report.summary;
    let marker = if report.improved { " *" } else { "" };
    format!(
        "{:<7} {:<7.3} {:<8.3} {:<11.1} {:<9.3} {:<8} {:<8} {:<10.2} {:<18.3}{marker}",
        report.batch,
        report.epsilon,
        report.error,
        summary.median_hits,
        summary.mean_hits,
        summary.min_hits,
        summary.max_hits,
        summary.pct_above_threshold,
        summary.mean_miss_distance
    )
}
