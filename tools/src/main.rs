use std::path::{Path, PathBuf};

use character_body::{BodyProfile, CharacterBody, KinematicCharacter};
use clap::{Parser, Subcommand};
use physics_rapier::PhysicsWorld;
use player_camera::PlayerCamera;
use player_controller::{ControllerConfig, ControllerEvent, ControllerOrchestrator, InputPhase};
use rapier3d::math::Vector;
use rapier3d::prelude::{ColliderBuilder, Real};
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_USAGE: i32 = 2;
const EXIT_CONFIG: i32 = 10;

#[derive(Parser)]
#[command(name = "tools", version, about = "Locomotion controller tools CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller headless on a flat Rapier floor.
    Sim(SimArgs),
    Config(ConfigArgs),
}

#[derive(Parser)]
struct SimArgs {
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 300)]
    ticks: u32,

    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: Real,

    /// Forward axis value; negative values drive the back axis.
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    forward: Real,

    /// Strafe axis value; positive is right, negative is left.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    strafe: Real,

    /// Per-tick yaw input.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    yaw: Real,

    #[arg(long)]
    sprint: bool,

    /// Tick at which jump is pressed.
    #[arg(long)]
    jump_at: Option<u32>,

    /// Ticks the jump stays held.
    #[arg(long, default_value_t = 15)]
    jump_hold: u32,

    /// Print a telemetry line every N ticks.
    #[arg(long, default_value_t = 30)]
    every: u32,
}

#[derive(Parser)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Validate a controller config file.
    Check {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Print the effective config (defaults when no path is given).
    Dump {
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Sim(args) => run_sim(args),
        Commands::Config(args) => run_config(args),
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ControllerConfig, i32> {
    let Some(path) = path else {
        return Ok(ControllerConfig::default());
    };
    ControllerConfig::load(path).map_err(|err| {
        eprintln!("{err}");
        EXIT_CONFIG
    })
}

fn run_config(args: ConfigArgs) -> i32 {
    match args.command {
        ConfigCommand::Check { path } => config_check(&path),
        ConfigCommand::Dump { config } => config_dump(config.as_deref()),
    }
}

fn config_check(path: &Path) -> i32 {
    let config = match load_config(Some(path)) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let validation = config.validate();
    for warning in &validation.warnings {
        println!("warning: {warning}");
    }
    println!(
        "config ok: {} (jump hold {:.3}s)",
        path.display(),
        config.movement.jump_max_hold_time()
    );
    EXIT_SUCCESS
}

fn config_dump(path: Option<&Path>) -> i32 {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(code) => return code,
    };
    match config.to_toml() {
        Ok(text) => {
            print!("{text}");
            EXIT_SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            EXIT_CONFIG
        }
    }
}

fn run_sim(args: SimArgs) -> i32 {
    if !(args.dt > 0.0 && args.dt.is_finite()) {
        eprintln!("--dt must be a positive number of seconds");
        return EXIT_USAGE;
    }
    if args.every == 0 {
        eprintln!("--every must be at least 1");
        return EXIT_USAGE;
    }
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let mut world = PhysicsWorld::z_up();
    world.insert_static_collider(
        ColliderBuilder::cuboid(200.0, 200.0, 0.1)
            .translation(Vector::new(0.0, 0.0, -0.1))
            .build(),
    );
    let owner = world.allocate_entity();
    world.refresh_queries();

    let profile = BodyProfile::from_movement(&config.movement);
    let mut body = KinematicCharacter::new(owner, profile, Vector::zeros());
    let input = config.input.clone();
    let mut controller = ControllerOrchestrator::new(config, owner, PlayerCamera::new(1.6));
    controller.subscribe(|event| println!("event: {}", event_name(event)));

    let (drive_name, forward_value) = if args.forward < 0.0 {
        (&input.back, args.forward)
    } else {
        (&input.forward, args.forward)
    };
    let (strafe_name, strafe_value) = if args.strafe < 0.0 {
        (&input.left, args.strafe)
    } else {
        (&input.right, args.strafe)
    };
    controller.apply_input(drive_name, forward_value, InputPhase::Pressed);
    controller.apply_input(strafe_name, strafe_value, InputPhase::Pressed);
    controller.apply_input(&input.yaw, args.yaw, InputPhase::Pressed);
    if args.sprint {
        controller.apply_input(&input.sprint, 1.0, InputPhase::Pressed);
    }

    for tick in 0..args.ticks {
        if let Some(jump_at) = args.jump_at {
            if tick == jump_at {
                controller.apply_input(&input.jump, 1.0, InputPhase::Pressed);
            } else if tick == jump_at.saturating_add(args.jump_hold) {
                controller.apply_input(&input.jump, 0.0, InputPhase::Released);
            }
        }
        if args.sprint {
            controller.apply_input(&input.sprint, 1.0, InputPhase::Held);
        }

        let frame = controller.tick(&mut body, &world, args.dt);
        let moved = body.step(&world, args.dt);
        let pose = controller
            .camera_mut()
            .update_from_origin(body.position(), body.heading());
        tracing::trace!(
            tick,
            vx = frame.velocity.x,
            vy = frame.velocity.y,
            vz = frame.velocity.z,
            hit_wall = moved.hit_wall,
            hit_ceiling = moved.hit_ceiling,
            eye_z = pose.eye.z,
            yaw = pose.yaw,
            pitch = pose.pitch,
            "sim tick"
        );

        if tick % args.every == 0 || tick + 1 == args.ticks {
            let status = controller.status();
            let position = body.position();
            println!(
                "tick {:>5} pos ({:>7.3}, {:>7.3}, {:>6.3}) speed {:>6.3} vz {:>6.3} grounded {} stamina {:>5.1}%",
                tick,
                position.x,
                position.y,
                position.z,
                status.applied_xy.norm(),
                status.z_velocity,
                status.grounded,
                status.stamina_percentage,
            );
        }
    }
    EXIT_SUCCESS
}

fn event_name(event: ControllerEvent) -> &'static str {
    match event {
        ControllerEvent::GroundHit => "ground_hit",
        ControllerEvent::GroundApproaching => "ground_approaching",
        ControllerEvent::Ungrounded => "ungrounded",
        ControllerEvent::SprintCooldownStarted => "sprint_cooldown_started",
    }
}
