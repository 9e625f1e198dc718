use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::process;

use rand::SeedableRng;
use rand::rngs::StdRng;

use qpong::logging::init_logging;
use qpong::visualize::render_board_with_options;
use qpong::{
    Approximator, BALL_DIAMETER, Board, BoardState, DefaultApproximator, DefaultSnapshot,
    Direction, HumanController, Loser, PADDLE_HEIGHT, PolicyParameters, QPaddleController, Side,
    VisualOptions,
};

const DEFAULT_SEED: u64 = 0xDEC0_1DED_5EED_F00D;
/// Dead zone of the scripted right paddle, in pixels.
const TRACKER_SLACK: f64 = 6.0;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    init_logging();
    let mut args = env::args().skip(1);
    let mut visualize = false;
    let mut tracker = false;
    let mut seed = DEFAULT_SEED;
    let mut episodes = 3usize;
    let mut hit_cap = 30usize;
    let mut max_steps = 10_000usize;
    let mut frame_every = 1usize;
    let mut checkpoint: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--visualize" => visualize = true,
            "--tracker" => tracker = true,
            "--seed" => seed = parse_value(&mut args, "--seed")?,
            "--episodes" => episodes = parse_value(&mut args, "--episodes")?,
            "--hit-cap" => hit_cap = parse_value(&mut args, "--hit-cap")?,
            "--max-steps" => max_steps = parse_value(&mut args, "--max-steps")?,
            "--frame-every" => {
                frame_every = parse_value::<usize>(&mut args, "--frame-every")?.max(1);
            }
            "--help" => {
                print_usage();
                return Ok(());
            }
            other if other.starts_with("--") => {
                return Err(format!("unrecognized option: {other}").into());
            }
            other => checkpoint = Some(PathBuf::from(other)),
        }
    }

    let snapshot: DefaultSnapshot = match &checkpoint {
        Some(path) => DefaultSnapshot::load(path)?,
        None => {
            println!("No checkpoint given, playing with an untrained network.");
            DefaultApproximator::default().snapshot()
        }
    };

    let mut board = Board::builder(300.0, 200.0)
        .with_paddles(true, tracker)
        .with_seed(seed)
        .build()?;
    let params = PolicyParameters::evaluation(0.0).with_hit_cap(hit_cap);
    let mut agent = QPaddleController::new(
        board.state(),
        Side::Left,
        params,
        &snapshot,
        StdRng::seed_from_u64(seed ^ 0x9E37_79B9),
    )?;
    let mut right = HumanController::new(Side::Right);
    let options = VisualOptions::default();

    println!("Starting Pong simulation ({episodes} episodes).\n");
    for episode in 1..=episodes {
        let mut steps = 0usize;
        while !board.is_done() {
            if steps >= max_steps {
                println!("Max step limit {max_steps} reached. Stopping episode.");
                board.end_episode();
                break;
            }
            if tracker {
                steer_towards_ball(&mut right, board.state());
                board.step_with(&mut [&mut agent, &mut right]);
            } else {
                board.step_with(&mut [&mut agent]);
            }
            steps += 1;
            if visualize && steps % frame_every == 0 {
                println!("Step {steps}");
                println!("{}", render_board_with_options(board.state(), options));
            }
        }
        let result = match board.who_lost() {
            Loser::None => String::from("hit cap reached"),
            Loser::Left => String::from("left missed"),
            Loser::Right => String::from("right missed"),
        };
        println!(
            "Episode {episode}: {} hits in {steps} steps ({result})",
            agent.hit_count()
        );
        board.reset();
        agent.start_episode(board.state());
    }

    println!(
        "Final score {} : {}",
        board.score(Side::Left),
        board.score(Side::Right)
    );
    Ok(())
}

fn parse_value<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<T, Box<dyn Error>> {
    let value = args
        .next()
        .ok_or_else(|| format!("{flag} requires a value"))?;
    value
        .parse::<T>()
        .map_err(|_| format!("invalid {flag} value: {value}").into())
}

/// Scripted stand-in for a keyboard: holds the key that moves the paddle towards the ball.
fn steer_towards_ball(controller: &mut HumanController, state: &BoardState) {
    let paddle_center = state.paddle(Side::Right).y + PADDLE_HEIGHT / 2.0;
    let ball_center = state.ball.position.y + BALL_DIAMETER / 2.0;
    if ball_center < paddle_center - TRACKER_SLACK {
        controller.press(Direction::Up);
    } else if ball_center > paddle_center + TRACKER_SLACK {
        controller.press(Direction::Down);
    } else {
        controller.release();
    }
}

fn print_usage() {
    println!("Usage: simulate [OPTIONS] [CHECKPOINT]");
    println!("  --visualize           Print the board after every frame");
    println!("  --frame-every <n>     Only print every n-th frame (default: 1)");
    println!("  --tracker             Add a scripted right paddle that follows the ball");
    println!("  --episodes <usize>    Episodes to play (default: 3)");
    println!("  --hit-cap <usize>     End an episode after this many hits, 0 for none (default: 30)");
    println!("  --max-steps <usize>   Hard step limit per episode (default: 10000)");
    println!("  --seed <u64>          Seed for ball spawns (default: {DEFAULT_SEED:#x})");
    println!("  --help                Show this help message");
    println!("Without a checkpoint the left paddle plays with an untrained network.");
}
