use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use elevator_sim::simulation::{
    ActivityLog, ActivitySink, Direction, Dispatcher, DispatcherConfig, ElevatorActivity, Floor,
    PickupRequest, Steps,
};

#[derive(Parser)]
#[command(name = "elevator_sim")]
#[command(about = "Elevator bank dispatch simulation")]
struct Cli {
    /// Read commands from stdin instead of generating random traffic
    #[arg(long)]
    interactive: bool,

    /// Number of elevators in the bank
    #[arg(long, default_value = "3")]
    elevators: usize,

    /// Highest floor of the building, floors are numbered from 0
    #[arg(long, default_value = "10")]
    floors: Floor,

    /// An elevator whose door stays open longer than this is considered broken
    #[arg(long, default_value = "20")]
    critical_door_open_steps: Steps,

    /// Boarding steps the cost estimator assumes per pickup stop
    #[arg(long, default_value = "3")]
    boarding_estimate: Steps,

    /// Alighting steps the cost estimator assumes per delivery stop
    #[arg(long, default_value = "2")]
    alighting_estimate: Steps,

    /// Steps the door actually stays open at a delivery stop
    #[arg(long, default_value = "2")]
    real_alighting: Steps,

    /// Comma separated starting floor of each elevator (default: all at floor 0)
    #[arg(long, value_delimiter = ',')]
    starting_floors: Vec<Floor>,

    /// Number of simulation steps to run in headless mode
    #[arg(long, default_value = "200")]
    steps: u64,

    /// Seed for the random traffic generator
    #[arg(long)]
    seed: Option<u64>,

    /// Chance that a new floor call is made in a given step
    #[arg(long, default_value = "0.2")]
    call_probability: f64,

    /// Print a status summary every this many steps
    #[arg(long, default_value = "20")]
    report_every: u64,
}

impl Cli {
    fn dispatcher_config(&self) -> DispatcherConfig {
        let starting_floors = if self.starting_floors.is_empty() {
            vec![0; self.elevators]
        } else {
            self.starting_floors.clone()
        };
        DispatcherConfig {
            number_of_elevators: self.elevators,
            number_of_floors: self.floors,
            critical_door_open_steps: self.critical_door_open_steps,
            boarding_step_estimate: self.boarding_estimate,
            alighting_step_estimate: self.alighting_estimate,
            real_alighting_steps: self.real_alighting,
            starting_floors,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.dispatcher_config();

    if cli.interactive {
        let mut dispatcher = Dispatcher::new(config).context("invalid dispatcher configuration")?;
        run_interactive(&mut dispatcher)
    } else {
        run_headless(&cli, config)
    }
}

/// Run the simulation with randomly generated floor calls
fn run_headless(cli: &Cli, config: DispatcherConfig) -> Result<()> {
    if !(0.0..=1.0).contains(&cli.call_probability) {
        bail!(
            "call probability must be between 0 and 1, got {}",
            cli.call_probability
        );
    }
    if cli.report_every == 0 {
        bail!("report interval must be at least 1 step");
    }

    let mut dispatcher = Dispatcher::with_sink(config, ActivityLog::new())
        .context("invalid dispatcher configuration")?;

    let seed = cli.seed.unwrap_or_else(|| rand::rng().random());
    info!("Running {} steps with seed {}", cli.steps, seed);
    let mut rng = StdRng::seed_from_u64(seed);

    println!("Initial state:");
    print_status(&dispatcher);

    let mut submitted = 0usize;
    for _ in 0..cli.steps {
        if rng.random_bool(cli.call_probability) {
            let request = random_request(&mut rng, dispatcher.config().number_of_floors);
            match dispatcher.pickup(request) {
                Ok(_) => submitted += 1,
                Err(e) => warn!("Generated request rejected: {}", e),
            }
        }
        dispatcher.step();

        if dispatcher.clock() % cli.report_every == 0 {
            print_status(&dispatcher);
        }
    }

    println!("=== Final State ===");
    print_status(&dispatcher);
    println!("Requests submitted: {}", submitted);
    println!(
        "Requests boarded: {}",
        submitted - dispatcher.pending().len()
    );
    let log = dispatcher.sink();
    for status in dispatcher.status() {
        let mut moves = 0;
        let mut stops = 0;
        let mut breakdowns = 0;
        for record in log.for_elevator(status.id) {
            match record.activity {
                ElevatorActivity::Moved { .. } => moves += 1,
                ElevatorActivity::DoorOpened { .. } => stops += 1,
                ElevatorActivity::Broken => breakdowns += 1,
                _ => {}
            }
        }
        println!(
            "  Elevator {}: floors travelled={}, stops={}, breakdowns={}",
            status.id.0, moves, stops, breakdowns
        );
    }
    Ok(())
}

/// A floor call with one or two destinations in the requested direction
fn random_request(rng: &mut StdRng, number_of_floors: Floor) -> PickupRequest {
    let floor = rng.random_range(0..=number_of_floors);
    let direction = if floor == 0 {
        Direction::Up
    } else if floor == number_of_floors {
        Direction::Down
    } else if rng.random_bool(0.5) {
        Direction::Up
    } else {
        Direction::Down
    };
    let boarding_steps = rng.random_range(1..=3);
    let destination_count = rng.random_range(1..=2);
    let destinations: Vec<Floor> = (0..destination_count)
        .map(|_| match direction {
            Direction::Up => rng.random_range(floor + 1..=number_of_floors),
            Direction::Down => rng.random_range(0..floor),
        })
        .collect();
    PickupRequest::new(floor, direction, boarding_steps, destinations)
}

fn print_status<S: ActivitySink>(dispatcher: &Dispatcher<S>) {
    println!("--- After step {} ---", dispatcher.clock());
    for status in dispatcher.status() {
        println!("  {}", status);
    }
    println!("  Pending requests: {}", dispatcher.pending().len());
    println!();
}

enum Flow {
    Continue,
    Quit,
}

/// Run the simulation driven by commands typed on stdin
fn run_interactive<S: ActivitySink>(dispatcher: &mut Dispatcher<S>) -> Result<()> {
    println!("Commands:");
    println!("  pickup <floor> <up|down> <boarding steps> <destination>...");
    println!("  step [n]");
    println!("  status");
    println!("  quit");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush().context("failed to flush stdout")?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("failed to read command")?;
        if read == 0 {
            break;
        }

        match execute_command(dispatcher, line.trim()) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => println!("error: {:#}", e),
        }
    }
    Ok(())
}

fn execute_command<S: ActivitySink>(dispatcher: &mut Dispatcher<S>, line: &str) -> Result<Flow> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((command, args)) = words.split_first() else {
        return Ok(Flow::Continue);
    };

    match command.to_ascii_lowercase().as_str() {
        "pickup" => {
            let request = parse_pickup(args, dispatcher.config().number_of_floors)?;
            let id = dispatcher.pickup(request)?;
            println!("queued request {}", id.0);
        }
        "step" => {
            let count: u64 = match args.first() {
                Some(n) => n
                    .parse()
                    .with_context(|| format!("invalid step count '{}'", n))?,
                None => 1,
            };
            for _ in 0..count {
                dispatcher.step();
            }
            print_status(dispatcher);
        }
        "status" => print_status(dispatcher),
        "quit" | "exit" => return Ok(Flow::Quit),
        other => bail!("unknown command '{}'", other),
    }
    Ok(Flow::Continue)
}

fn parse_pickup(args: &[&str], number_of_floors: Floor) -> Result<PickupRequest> {
    let [floor, direction, boarding, destinations @ ..] = args else {
        bail!("usage: pickup <floor> <up|down> <boarding steps> <destination>...");
    };

    let floor: Floor = floor
        .parse()
        .with_context(|| format!("invalid floor '{}'", floor))?;
    let direction = match direction.to_ascii_lowercase().as_str() {
        "up" | "u" => Direction::Up,
        "down" | "d" => Direction::Down,
        other => bail!("invalid direction '{}', expected up or down", other),
    };
    let boarding_steps: Steps = boarding
        .parse()
        .with_context(|| format!("invalid boarding steps '{}'", boarding))?;
    let destinations = destinations
        .iter()
        .map(|d| {
            d.parse::<Floor>()
                .with_context(|| format!("invalid destination '{}'", d))
        })
        .collect::<Result<Vec<_>>>()?;

    let request = PickupRequest::new(floor, direction, boarding_steps, destinations);
    request
        .validate(number_of_floors)
        .context("rejected pickup request")?;
    Ok(request)
}
